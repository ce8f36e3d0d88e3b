//! Playwright session - a browser page driven via JSON-RPC
//!
//! Spawns the Playwright page server under node and drives one page of a
//! persistent browser context, so the profile's logins are reused.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::rpc::RpcClient;
use super::{ElementHandle, ScriptValue, Session, SessionError, SessionFactory};
use crate::workflow::{Locator, PlaywrightConfig};

pub struct PlaywrightSession {
    label: String,
    rpc: RpcClient,
    page_id: String,
    context_id: String,
    child: Mutex<Child>,
}

impl PlaywrightSession {
    /// Start the page server and open a page in a persistent browser context
    pub async fn start(config: &PlaywrightConfig) -> Result<Self, SessionError> {
        Self::start_with_profile(config, config.profile_dir.as_deref()).await
    }

    /// Start with an explicit browser profile directory
    pub async fn start_with_profile(
        config: &PlaywrightConfig,
        profile_dir: Option<&Path>,
    ) -> Result<Self, SessionError> {
        let node = which::which(&config.node).map_err(|e| {
            SessionError::StartupFailed(format!("cannot find '{}': {}", config.node, e))
        })?;

        info!(
            "Starting Playwright server {} ({:?}, headless={})",
            config.server_script.display(),
            config.browser,
            config.headless
        );

        let mut child = Command::new(node)
            .arg(&config.server_script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SessionError::StartupFailed(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::StartupFailed("server stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::StartupFailed("server stdout unavailable".to_string()))?;

        let rpc = RpcClient::connect(stdin, stdout);

        let result = rpc
            .call(
                "browser.launchPersistent",
                json!({
                    "browserType": config.browser.as_str(),
                    "headless": config.headless,
                    "userDataDir": profile_dir,
                }),
            )
            .await?;

        let context_id = string_field(&result, "contextId")?;
        let page_id = string_field(&result, "pageId")?;
        debug!("Opened page {} in context {}", page_id, context_id);

        Ok(Self {
            label: format!("playwright:{}", config.browser.as_str()),
            rpc,
            page_id,
            context_id,
            child: Mutex::new(child),
        })
    }

    async fn request(&self, method: &str, mut params: Value) -> Result<Value, SessionError> {
        if let Value::Object(map) = &mut params {
            map.insert("pageId".to_string(), Value::String(self.page_id.clone()));
        }
        self.rpc.call(method, params).await
    }
}

/// Starts one Playwright session per platform, each on its own profile
pub struct PlaywrightFactory {
    config: PlaywrightConfig,
}

impl PlaywrightFactory {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightFactory {
    async fn open(&self, platform: &str) -> Result<Arc<dyn Session>, SessionError> {
        let profile = self.config.profile_for(platform);
        let session = PlaywrightSession::start_with_profile(&self.config, profile).await?;
        Ok(Arc::new(session))
    }
}

fn string_field(value: &Value, field: &str) -> Result<String, SessionError> {
    value[field]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| SessionError::ServerError(format!("No {} returned", field)))
}

#[async_trait]
impl Session for PlaywrightSession {
    fn label(&self) -> &str {
        &self.label
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.request("page.goto", json!({ "url": url })).await?;
        Ok(())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        let result = self
            .request("page.queryAll", query_params(locator, None))
            .await?;
        handles_of(&result)
    }

    // the server keeps only the picked match, the rest are released at once
    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>, SessionError> {
        let result = self
            .request("page.queryAll", query_params(locator, Some(locator.position())))
            .await?;
        Ok(handles_of(&result)?.into_iter().next())
    }

    async fn is_interactable(&self, element: &ElementHandle) -> Result<bool, SessionError> {
        let result = self
            .request("element.isInteractable", json!({ "handle": element.id }))
            .await?;
        Ok(result["interactable"].as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.request("element.click", json!({ "handle": element.id }))
            .await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.request("element.fill", json!({ "handle": element.id, "value": "" }))
            .await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), SessionError> {
        self.request("element.type", json!({ "handle": element.id, "text": text }))
            .await?;
        Ok(())
    }

    async fn set_file_input(
        &self,
        element: &ElementHandle,
        path: &Path,
    ) -> Result<(), SessionError> {
        self.request(
            "element.setInputFiles",
            json!({ "handle": element.id, "path": path }),
        )
        .await?;
        Ok(())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let result = self
            .request(
                "element.getAttribute",
                json!({ "handle": element.id, "attribute": name }),
            )
            .await?;
        Ok(result["value"].as_str().map(|s| s.to_string()))
    }

    async fn run_script(
        &self,
        script: &str,
        args: Vec<ScriptValue>,
    ) -> Result<Value, SessionError> {
        let result = self
            .request("page.evaluate", json!({ "script": script, "args": args }))
            .await?;
        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        let result = self.request("page.url", json!({})).await?;
        string_field(&result, "url")
    }

    async fn page_text(&self) -> Result<String, SessionError> {
        let result = self.request("page.text", json!({})).await?;
        string_field(&result, "text")
    }

    /// Close the browser context and stop the server
    async fn close(&self) -> Result<(), SessionError> {
        let closed = self
            .rpc
            .call("browser.close", json!({ "contextId": self.context_id }))
            .await;
        let mut child = self.child.lock().await;
        let _ = child.kill().await;
        closed.map(|_| ())
    }
}

fn query_params(locator: &Locator, only: Option<usize>) -> Value {
    let mut params = json!({ "selector": locator.to_playwright_selector() });
    if let Some(index) = only {
        params["index"] = json!(index);
    }
    params
}

fn handles_of(result: &Value) -> Result<Vec<ElementHandle>, SessionError> {
    let handles = result["handles"]
        .as_array()
        .ok_or_else(|| SessionError::ServerError("No handles returned".to_string()))?;
    Ok(handles
        .iter()
        .filter_map(|h| h.as_str())
        .map(ElementHandle::new)
        .collect())
}
