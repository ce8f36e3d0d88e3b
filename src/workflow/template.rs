//! Text templates for composed post text, URLs and script arguments
//!
//! Supports:
//! - `{title}`, `{description}`, `{tags}`, `{file}` from the payload
//! - `{name}` for any value captured earlier in the run
//! - `{{` and `}}` for literal braces

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Template used when a workflow does not supply its own
pub const DEFAULT_POST_TEMPLATE: &str = "{title}\n\n{description}\n\n{tags}";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown placeholder: {{{0}}}")]
    UnknownPlaceholder(String),
}

/// Values available to templates during one run
pub type TemplateVars = HashMap<String, String>;

/// Post-processing applied to composed text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeSettings {
    /// Maximum length in characters, if the destination has one
    #[serde(default)]
    pub max_chars: Option<usize>,

    /// Drop characters outside the Basic Multilingual Plane
    #[serde(default)]
    pub strip_non_bmp: bool,
}

/// Substitute every placeholder in `template`
pub fn render(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut last = 0;

    for cap in PLACEHOLDER_REGEX.captures_iter(template) {
        let Some(whole) = cap.get(0) else {
            continue;
        };
        result.push_str(&template[last..whole.start()]);

        match cap.get(1) {
            Some(name) => {
                let value = vars
                    .get(name.as_str())
                    .ok_or_else(|| TemplateError::UnknownPlaceholder(name.as_str().to_string()))?;
                result.push_str(value);
            }
            None => result.push_str(&whole.as_str()[..1]),
        }

        last = whole.end();
    }

    result.push_str(&template[last..]);
    Ok(result)
}

/// Names referenced by `template`, in order of appearance
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Render and post-process text destined for a post body
pub fn compose(
    template: &str,
    vars: &TemplateVars,
    settings: &ComposeSettings,
) -> Result<String, TemplateError> {
    let mut text = render(template, vars)?;
    if settings.strip_non_bmp {
        text = strip_non_bmp(&text);
    }
    if let Some(limit) = settings.max_chars {
        text = truncate_chars(&text, limit);
    }
    Ok(text)
}

/// Keep at most `limit` characters, never splitting one
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Remove characters above U+FFFF
pub fn strip_non_bmp(text: &str) -> String {
    text.chars().filter(|c| (*c as u32) <= 0xFFFF).collect()
}
