//! Workflow directory loader
//!
//! Load workflow definitions from YAML files and directories. Every loaded
//! workflow is validated before it is handed out.

use std::path::Path;

use super::validate::{join_errors, validate, ValidationError};
use super::Workflow;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("Invalid workflow in {file}: {}", join_errors(.errors))]
    Invalid {
        file: String,
        errors: Vec<ValidationError>,
    },
}

pub struct WorkflowLoader;

impl WorkflowLoader {
    /// Load every workflow file in `dir`, ordered by file name
    pub fn load_directory(dir: &Path) -> Result<Vec<Workflow>, LoadError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if is_workflow_file(&path) {
                paths.push(path);
            }
        }

        paths.sort();
        paths.iter().map(|path| Self::load_file(path)).collect()
    }

    pub fn load_file(path: &Path) -> Result<Workflow, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_str(&path.display().to_string(), &content)
    }

    /// Parse and validate a workflow; `source` names it in errors
    pub fn load_str(source: &str, content: &str) -> Result<Workflow, LoadError> {
        let workflow: Workflow = serde_yaml::from_str(content).map_err(|e| LoadError::Yaml {
            file: source.to_string(),
            error: e,
        })?;
        validate(&workflow).map_err(|errors| LoadError::Invalid {
            file: source.to_string(),
            errors,
        })?;
        Ok(workflow)
    }
}

/// YAML files other than the runner configuration
fn is_workflow_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let stem = path.file_stem().and_then(|s| s.to_str());
    yaml && stem != Some("runner")
}
