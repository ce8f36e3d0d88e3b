//! Executor error types
//!
//! These cover everything that can go wrong before a run starts. Once a run
//! is underway every failure ends up in its `UploadResult` instead.

use crate::bridge::SessionError;
use crate::workflow::validate::join_errors;
use crate::workflow::{LoadError, ValidationError};

/// Errors that can occur while preparing runs
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Invalid workflow '{workflow}': {}", join_errors(.errors))]
    InvalidWorkflow {
        workflow: String,
        errors: Vec<ValidationError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_workflow_message() {
        let err = ExecutorError::InvalidWorkflow {
            workflow: "x".to_string(),
            errors: vec![
                ValidationError::NoSteps("x".to_string()),
                ValidationError::DuplicateStep("post".to_string()),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Invalid workflow 'x': Workflow 'x' has no steps; Duplicate step id: post"
        );
    }
}
