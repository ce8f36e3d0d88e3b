//! Static checks on workflow definitions
//!
//! Catches mistakes that would otherwise only surface mid-run, after the
//! destination has already been touched: duplicate step ids, actions without
//! an element to act on, templates naming values nobody provides, and
//! patterns that do not compile.

use std::collections::HashSet;

use super::condition::Predicate;
use super::context::PAYLOAD_VARS;
use super::step::{Action, ExtractSource, Extraction, ScriptArg, Workflow, WorkflowStep};
use super::template::placeholders;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Workflow has no name")]
    MissingName,

    #[error("Workflow '{0}' has no steps")]
    NoSteps(String),

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),

    #[error("Step '{step}': {action} needs an element (set `target` or wait on an element)")]
    MissingElement { step: String, action: String },

    #[error("Step '{step}': template uses {{{name}}} which is not available at this point")]
    UnknownPlaceholder { step: String, name: String },

    #[error("Step '{step}': invalid pattern '{pattern}': {error}")]
    InvalidPattern {
        step: String,
        pattern: String,
        error: String,
    },
}

/// Validate a workflow, returning every problem found
pub fn validate(workflow: &Workflow) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if workflow.name.trim().is_empty() {
        errors.push(ValidationError::MissingName);
    }
    if workflow.steps.is_empty() {
        errors.push(ValidationError::NoSteps(workflow.name.clone()));
    }

    let mut ids = HashSet::new();
    let mut known: HashSet<String> = PAYLOAD_VARS.iter().map(|s| s.to_string()).collect();

    check_templates("post_template", &[workflow.post_template.as_str()], &known, &mut errors);

    for step in &workflow.steps {
        check_step(step, &mut ids, &mut known, &mut errors);
    }

    if let Some(extraction) = &workflow.result {
        check_extraction("result", extraction, &known, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// One-line rendering of a list of problems
pub fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_step(
    step: &WorkflowStep,
    ids: &mut HashSet<String>,
    known: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    if !ids.insert(step.id.clone()) {
        errors.push(ValidationError::DuplicateStep(step.id.clone()));
    }

    for condition in step.wait.iter().chain(step.verify.iter()) {
        if let Predicate::UrlMatches(pattern) = &condition.predicate {
            check_pattern(&step.id, pattern, errors);
        }
    }

    if let Some(action) = &step.action {
        let has_element = match step.element_locator() {
            Some(_) if step.target.is_some() => true,
            Some(_) => !matches!(
                step.wait.as_ref().map(|w| &w.predicate),
                Some(Predicate::ElementAbsent(_))
            ),
            None => false,
        };
        if action.needs_element() && !has_element {
            errors.push(ValidationError::MissingElement {
                step: step.id.clone(),
                action: action.kind().to_string(),
            });
        }

        match action {
            Action::Navigate { url } => check_templates(&step.id, &[url.as_str()], known, errors),
            Action::TypeText { text, .. } => check_templates(&step.id, &[text.as_str()], known, errors),
            Action::ComposeText { template } => {
                if let Some(template) = template {
                    check_templates(&step.id, &[template.as_str()], known, errors);
                }
            }
            Action::UploadFile { path } => {
                if let Some(path) = path {
                    check_templates(&step.id, &[path.as_str()], known, errors);
                }
            }
            Action::RunScript { args, .. } => {
                let texts: Vec<&str> = args
                    .iter()
                    .filter_map(|a| match a {
                        ScriptArg::Text(t) => Some(t.as_str()),
                        ScriptArg::Element => None,
                    })
                    .collect();
                check_templates(&step.id, &texts, known, errors);
            }
            Action::Capture { name, extract } => {
                check_extraction(&step.id, extract, known, errors);
                known.insert(name.clone());
            }
            Action::Click => {}
        }
    }

    if let Some(fallback) = step.fallback() {
        check_step(fallback, ids, known, errors);
    }
}

fn check_extraction(
    owner: &str,
    extraction: &Extraction,
    known: &HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(pattern) = &extraction.pattern {
        check_pattern(owner, pattern, errors);
    }
    if let ExtractSource::Script(script) = &extraction.from {
        check_templates(owner, &[script.as_str()], known, errors);
    }
}

fn check_templates(
    owner: &str,
    templates: &[&str],
    known: &HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    for template in templates {
        for name in placeholders(template) {
            if !known.contains(&name) {
                errors.push(ValidationError::UnknownPlaceholder {
                    step: owner.to_string(),
                    name,
                });
            }
        }
    }
}

fn check_pattern(owner: &str, pattern: &str, errors: &mut Vec<ValidationError>) {
    if let Err(e) = regex::Regex::new(pattern) {
        errors.push(ValidationError::InvalidPattern {
            step: owner.to_string(),
            pattern: pattern.to_string(),
            error: e.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Workflow {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_workflow() {
        let workflow = parse(
            r#"
name: demo
steps:
  - id: channel
    action:
      capture:
        name: channel_id
        extract: { from: current_url, pattern: "/channel/([^/]+)" }
  - id: open
    action: { navigate: { url: "https://studio.example/channel/{channel_id}" } }
  - id: text
    wait: { element_exists: { id: textbox } }
    action: { type_text: { text: "{title}", clear: true } }
success: { text_contains: Saved }
"#,
        );
        assert_eq!(validate(&workflow), Ok(()));
    }

    #[test]
    fn test_reports_every_problem() {
        let workflow = parse(
            r#"
name: broken
steps:
  - id: a
    action: click
  - id: a
    action: { navigate: { url: "https://example.com/{channel_id}" } }
  - id: b
    wait: { url_matches: "ok" }
    action:
      capture:
        name: later
        extract: { from: current_url, pattern: "(" }
success: { text_contains: Done }
"#,
        );
        let errors = validate(&workflow).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingElement {
            step: "a".to_string(),
            action: "click".to_string()
        }));
        assert!(errors.contains(&ValidationError::DuplicateStep("a".to_string())));
        assert!(errors.contains(&ValidationError::UnknownPlaceholder {
            step: "a".to_string(),
            name: "channel_id".to_string()
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidPattern { step, .. } if step == "b")));
    }

    #[test]
    fn test_absent_wait_is_not_an_element() {
        let workflow = parse(
            r#"
name: spinner
steps:
  - id: s
    wait: { element_absent: { css: ".spinner" } }
    action: click
success: { text_contains: Done }
"#,
        );
        let errors = validate(&workflow).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_capture_only_visible_to_later_steps() {
        let workflow = parse(
            r#"
name: order
steps:
  - id: early
    action: { navigate: { url: "https://example.com/{id}" } }
  - id: grab
    action: { capture: { name: id, extract: { from: current_url } } }
success: { text_contains: Done }
"#,
        );
        let errors = validate(&workflow).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnknownPlaceholder {
                step: "early".to_string(),
                name: "id".to_string()
            }]
        );
    }
}
