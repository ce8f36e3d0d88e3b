//! Execution context for one platform run
//!
//! Bundles the content being published with the session it is published
//! through, the observer that hears about progress and the cancellation
//! signal. A context is built fresh for every platform and never shared.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::template::TemplateVars;
use crate::bridge::Session;
use crate::engine::observer::RunObserver;

/// Template names filled from the payload; `post` is the composed text
pub const PAYLOAD_VARS: &[&str] = &["title", "description", "tags", "file", "post"];

/// The content being published
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub title: String,
    pub description: String,
    pub tags: String,
    /// Local path of the video to upload
    pub file: PathBuf,
}

impl Payload {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        tags: impl Into<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tags: tags.into(),
            file: file.into(),
        }
    }

    /// Payload values as template variables (without `post`)
    pub fn vars(&self) -> TemplateVars {
        let mut vars = TemplateVars::new();
        vars.insert("title".to_string(), self.title.clone());
        vars.insert("description".to_string(), self.description.clone());
        vars.insert("tags".to_string(), self.tags.clone());
        vars.insert("file".to_string(), self.file.display().to_string());
        vars
    }
}

/// Immutable per-run bundle handed to the workflow runner
#[derive(Clone)]
pub struct ExecutionContext {
    pub payload: Arc<Payload>,
    pub session: Arc<dyn Session>,
    pub observer: Arc<dyn RunObserver>,
    pub cancel: CancellationToken,
    pub run_id: String,
}

impl ExecutionContext {
    /// Create a context with a generated run ID and a no-op observer
    pub fn new(payload: Arc<Payload>, session: Arc<dyn Session>) -> Self {
        Self {
            payload,
            session,
            observer: Arc::new(crate::engine::observer::NullObserver),
            cancel: CancellationToken::new(),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("payload", &self.payload)
            .field("run_id", &self.run_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
