//! Workflow catalog
//!
//! The set of destinations a run can publish to: the built-in workflows,
//! plus any workflow files from a `workflows_dir`. A file whose workflow
//! shares a built-in's name replaces it.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::builtin;
use super::loader::{LoadError, WorkflowLoader};
use super::Workflow;
use crate::engine::ExecutorError;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    workflows: Vec<Workflow>,
}

impl Catalog {
    /// Built-in workflows only
    pub fn builtin() -> Result<Self, LoadError> {
        Ok(Self {
            workflows: builtin::all()?,
        })
    }

    /// Built-in workflows extended by the files in `dir`
    pub fn load(dir: Option<&Path>) -> Result<Self, LoadError> {
        let mut catalog = Self::builtin()?;
        if let Some(dir) = dir {
            info!("Loading workflows from {}", dir.display());
            for workflow in WorkflowLoader::load_directory(dir)? {
                catalog.insert(workflow);
            }
        }
        Ok(catalog)
    }

    /// Add a workflow, replacing any with the same name
    pub fn insert(&mut self, workflow: Workflow) {
        match self.workflows.iter_mut().find(|w| w.name == workflow.name) {
            Some(existing) => {
                debug!("Workflow {} overrides the built-in definition", workflow.name);
                *existing = workflow;
            }
            None => self.workflows.push(workflow),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.workflows.iter().map(|w| w.name.as_str()).collect()
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    /// Workflows for `platforms`, in the given order
    ///
    /// An empty list selects every workflow in the catalog.
    pub fn select(&self, platforms: &[String]) -> Result<Vec<Arc<Workflow>>, ExecutorError> {
        if platforms.is_empty() {
            return Ok(self.workflows.iter().cloned().map(Arc::new).collect());
        }
        platforms
            .iter()
            .map(|name| {
                self.get(name)
                    .cloned()
                    .map(Arc::new)
                    .ok_or_else(|| ExecutorError::UnknownPlatform(name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(
            catalog.names(),
            vec!["x", "linkedin", "instagram", "tiktok", "snapchat", "youtube"]
        );
    }

    #[test]
    fn test_directory_overrides_and_extends() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("x.yaml"),
            r#"
name: x
steps:
  - id: open
    action: { navigate: { url: "https://x.example/compose" } }
success: { text_contains: "sent" }
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("mastodon.yaml"),
            r#"
name: mastodon
steps:
  - id: open
    action: { navigate: { url: "https://mastodon.example/publish" } }
success: { text_contains: "Published" }
"#,
        )
        .unwrap();

        let catalog = Catalog::load(Some(dir.path())).unwrap();
        assert_eq!(catalog.workflows().len(), 7);
        assert_eq!(catalog.get("x").unwrap().steps.len(), 1);
        assert!(catalog.get("mastodon").is_some());
    }

    #[test]
    fn test_select() {
        let catalog = Catalog::builtin().unwrap();

        let selected = catalog
            .select(&["youtube".to_string(), "x".to_string()])
            .unwrap();
        let names: Vec<_> = selected.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["youtube", "x"]);

        assert_eq!(catalog.select(&[]).unwrap().len(), 6);

        match catalog.select(&["myspace".to_string()]) {
            Err(ExecutorError::UnknownPlatform(name)) => assert_eq!(name, "myspace"),
            other => panic!("unexpected {:?}", other.map(|w| w.len())),
        }
    }
}
