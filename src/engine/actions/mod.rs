//! Action implementations
//!
//! Turns a step's declarative action into session calls. Template text is
//! rendered against the run's variables at the moment the action runs, so
//! values captured by earlier steps are visible.

pub mod extract;

use std::path::PathBuf;
use tracing::debug;

use crate::bridge::{ElementHandle, ScriptValue, Session, SessionError};
use crate::workflow::template::{compose, render, TemplateError, TemplateVars};
use crate::workflow::{Action, Payload, ScriptArg, Workflow, WorkflowStep};

pub use extract::run_extraction;

/// Why an action could not be performed
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("{0} needs an element but the step names none")]
    NoElement(&'static str),

    #[error("Element {0} is gone")]
    ElementGone(String),

    #[error("Nothing captured for '{0}'")]
    NothingCaptured(String),

    #[error("Invalid pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },
}

/// Everything an action may read or capture into
pub struct ActionScope<'a> {
    pub session: &'a dyn Session,
    pub workflow: &'a Workflow,
    pub payload: &'a Payload,
    pub vars: &'a mut TemplateVars,
}

impl ActionScope<'_> {
    async fn element(&self, step: &WorkflowStep, kind: &'static str) -> Result<ElementHandle, ActionError> {
        let locator = step.element_locator().ok_or(ActionError::NoElement(kind))?;
        self.session
            .find_element(locator)
            .await?
            .ok_or_else(|| ActionError::ElementGone(locator.to_string()))
    }
}

/// Perform `action` for `step`
pub async fn perform(
    scope: &mut ActionScope<'_>,
    step: &WorkflowStep,
    action: &Action,
) -> Result<(), ActionError> {
    let session = scope.session;

    match action {
        Action::Navigate { url } => {
            let url = render(url, scope.vars)?;
            debug!("Navigating to {}", url);
            session.navigate(&url).await?;
        }
        Action::Click => {
            let element = scope.element(step, action.kind()).await?;
            session.click(&element).await?;
        }
        Action::TypeText { text, clear } => {
            let text = render(text, scope.vars)?;
            let element = scope.element(step, action.kind()).await?;
            if *clear {
                session.clear(&element).await?;
            }
            session.type_text(&element, &text).await?;
        }
        Action::ComposeText { template } => {
            let template = template
                .as_deref()
                .unwrap_or(scope.workflow.post_template.as_str());
            let text = compose(template, scope.vars, &scope.workflow.compose)?;
            let element = scope.element(step, action.kind()).await?;
            debug!("Typing {} composed characters", text.chars().count());
            session.type_text(&element, &text).await?;
        }
        Action::UploadFile { path } => {
            let path = match path {
                Some(path) => PathBuf::from(render(path, scope.vars)?),
                None => scope.payload.file.clone(),
            };
            let element = scope.element(step, action.kind()).await?;
            session.set_file_input(&element, &path).await?;
        }
        Action::RunScript { script, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(match arg {
                    ScriptArg::Element => {
                        ScriptValue::from(&scope.element(step, action.kind()).await?)
                    }
                    ScriptArg::Text(text) => ScriptValue::Text(render(text, scope.vars)?),
                });
            }
            session.run_script(script, values).await?;
        }
        Action::Capture { name, extract } => {
            let value = run_extraction(session, extract, scope.vars)
                .await?
                .ok_or_else(|| ActionError::NothingCaptured(name.clone()))?;
            debug!("Captured {} = {}", name, value);
            scope.vars.insert(name.clone(), value);
        }
    }

    Ok(())
}
