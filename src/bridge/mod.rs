//! Bridge modules for UI automation sessions
//!
//! The engine drives pages through the [`Session`] trait. This module
//! provides:
//! - `playwright`: a browser page driven over JSON-RPC by a Playwright server
//! - `simulated`: an in-memory page with scripted behaviour and an action log
//! - `rpc`: the JSON-RPC transport shared by process-backed sessions

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::workflow::Locator;

pub mod playwright;
pub mod rpc;
pub mod simulated;

pub use playwright::{PlaywrightFactory, PlaywrightSession};
pub use simulated::{ActionRecord, Effect, SimElement, SimulatedSession};

/// Session-level failures, distinct from a step's logical failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to start session: {0}")]
    StartupFailed(String),

    #[error("Session disconnected")]
    Disconnected,

    #[error("Request timed out")]
    Timeout,

    #[error("Element is no longer attached to the page: {0}")]
    StaleElement(String),

    #[error("Element is not interactable: {0}")]
    NotInteractable(String),

    #[error("Navigation in progress")]
    NavigationInProgress,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl SessionError {
    /// Conditions a later poll may no longer see: a navigation in flight, a
    /// re-rendered element, a slow server-side operation
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionError::StaleElement(_)
                | SessionError::NotInteractable(_)
                | SessionError::NavigationInProgress
                | SessionError::Timeout
        )
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::IoError(e.to_string())
    }
}

/// Opaque reference to an element found on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ElementHandle {
    pub id: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Argument passed to a page script
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScriptValue {
    Element { handle: String },
    Text(String),
}

impl From<&ElementHandle> for ScriptValue {
    fn from(handle: &ElementHandle) -> Self {
        ScriptValue::Element {
            handle: handle.id.clone(),
        }
    }
}

/// A capability object bound to one page of an already-authenticated,
/// already-running browser.
///
/// Implementations must be safe to share across tasks, but a single page is
/// never driven concurrently: the engine awaits every call before issuing
/// the next one.
#[async_trait]
pub trait Session: Send + Sync {
    /// Label used in logs
    fn label(&self) -> &str;

    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// All elements currently matching the locator, ignoring its index
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError>;

    /// The element the locator designates (its index, or the first match)
    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>, SessionError> {
        let mut elements = self.find_elements(locator).await?;
        let position = locator.position();
        if position < elements.len() {
            Ok(Some(elements.swap_remove(position)))
        } else {
            Ok(None)
        }
    }

    /// Visible and enabled
    async fn is_interactable(&self, element: &ElementHandle) -> Result<bool, SessionError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError>;

    async fn clear(&self, element: &ElementHandle) -> Result<(), SessionError>;

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), SessionError>;

    async fn set_file_input(&self, element: &ElementHandle, path: &Path)
        -> Result<(), SessionError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    async fn run_script(&self, script: &str, args: Vec<ScriptValue>)
        -> Result<Value, SessionError>;

    async fn current_url(&self) -> Result<String, SessionError>;

    async fn page_text(&self) -> Result<String, SessionError>;

    /// Release the page and whatever backs it
    async fn close(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Opens an isolated session per platform run
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, platform: &str) -> Result<std::sync::Arc<dyn Session>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_value_serialization() {
        let handle = ElementHandle::new("el-3");
        let args = vec![ScriptValue::from(&handle), ScriptValue::Text("hi".to_string())];
        assert_eq!(
            serde_json::to_value(&args).unwrap(),
            serde_json::json!([{ "handle": "el-3" }, "hi"])
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(SessionError::NavigationInProgress.is_transient());
        assert!(SessionError::StaleElement("el-1".to_string()).is_transient());
        assert!(!SessionError::Disconnected.is_transient());
        assert!(!SessionError::ServerError("[-32000] boom".to_string()).is_transient());
    }

    #[test]
    fn test_find_element_uses_index() {
        let session = SimulatedSession::new();
        session.add_element(Locator::id("textbox"), SimElement::new().attr("role", "title"));
        session.add_element(
            Locator::id("textbox"),
            SimElement::new().attr("role", "description"),
        );

        tokio_test::block_on(async {
            let second = session
                .find_element(&Locator::id("textbox").nth(1))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(
                session.attribute(&second, "role").await.unwrap(),
                Some("description".to_string())
            );

            let missing = session.find_element(&Locator::id("textbox").nth(2)).await.unwrap();
            assert!(missing.is_none());
        });
    }
}
