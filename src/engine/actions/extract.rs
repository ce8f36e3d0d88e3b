//! Reading values back from the page

use regex::Regex;
use serde_json::Value;

use super::ActionError;
use crate::bridge::Session;
use crate::workflow::template::{render, TemplateVars};
use crate::workflow::{ExtractSource, Extraction};

/// Apply an extraction rule; `None` when the page offers nothing to extract
pub async fn run_extraction(
    session: &dyn Session,
    extraction: &Extraction,
    vars: &TemplateVars,
) -> Result<Option<String>, ActionError> {
    let raw = match &extraction.from {
        ExtractSource::CurrentUrl => Some(session.current_url().await?),
        ExtractSource::Attribute { locator, name } => match session.find_element(locator).await? {
            Some(element) => session.attribute(&element, name).await?,
            None => None,
        },
        ExtractSource::Script(script) => {
            let script = render(script, vars)?;
            match session.run_script(&script, Vec::new()).await? {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            }
        }
    };

    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    match &extraction.pattern {
        Some(pattern) => apply_pattern(&raw, pattern, extraction.format.as_deref()),
        None => Ok(Some(raw)),
    }
}

fn apply_pattern(raw: &str, pattern: &str, format: Option<&str>) -> Result<Option<String>, ActionError> {
    let regex = Regex::new(pattern).map_err(|e| ActionError::InvalidPattern {
        pattern: pattern.to_string(),
        error: e.to_string(),
    })?;

    let Some(caps) = regex.captures(raw) else {
        return Ok(None);
    };

    let value = match format {
        Some(format) => {
            let mut out = String::new();
            caps.expand(format, &mut out);
            out
        }
        None => caps
            .get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    };

    Ok(Some(value).filter(|v| !v.is_empty()))
}
