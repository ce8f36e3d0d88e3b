//! Simulated session - an in-memory page with scripted behaviour
//!
//! Elements are registered against a locator's strategy and selector and can
//! be scripted to appear late, stay hidden, reject interactions or change the
//! page when clicked. Every interaction is recorded in order so callers can
//! assert on exactly what was done to the page.
//!
//! ```ignore
//! let session = SimulatedSession::new();
//! session.add_element(
//!     Locator::text("Post"),
//!     SimElement::new()
//!         .appears_after(3)
//!         .on_click(Effect::AppendText("Posted".into())),
//! );
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{ElementHandle, ScriptValue, Session, SessionError};
use crate::workflow::{Locator, Strategy};

/// Page change triggered by interacting with an element
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AppendText(String),
    SetText(String),
    SetUrl(String),
    AddElement(Locator, SimElement),
    RemoveElement(Locator),
}

/// A scripted element
#[derive(Debug, Clone, PartialEq)]
pub struct SimElement {
    attributes: HashMap<String, String>,
    visible: bool,
    enabled: bool,
    hidden_lookups: usize,
    failing_actions: usize,
    on_click: Vec<Effect>,
    on_input: Vec<Effect>,
}

impl Default for SimElement {
    fn default() -> Self {
        Self {
            attributes: HashMap::new(),
            visible: true,
            enabled: true,
            hidden_lookups: 0,
            failing_actions: 0,
            on_click: Vec::new(),
            on_input: Vec::new(),
        }
    }
}

impl SimElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Present but not visible
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Not found by the first `lookups` queries for its locator
    pub fn appears_after(mut self, lookups: usize) -> Self {
        self.hidden_lookups = lookups;
        self
    }

    /// The next `count` interactions fail as stale
    pub fn fail_next(mut self, count: usize) -> Self {
        self.failing_actions = count;
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.on_click.push(effect);
        self
    }

    /// Applied after text is typed or a file is set
    pub fn on_input(mut self, effect: Effect) -> Self {
        self.on_input.push(effect);
        self
    }

    fn interactable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// One recorded interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub kind: String,
    /// Locator of the element acted on
    pub target: Option<String>,
    pub value: Option<String>,
}

struct Slot {
    key: (Strategy, String),
    locator: Locator,
    element: SimElement,
    removed: bool,
}

struct SimState {
    url: String,
    text: String,
    slots: Vec<Slot>,
    redirects: Vec<(String, String)>,
    failing_reads: usize,
    stall_after: Option<usize>,
    disconnected: bool,
    script_result: Value,
    reads: usize,
    closes: usize,
    log: Vec<ActionRecord>,
}

/// In-memory [`Session`] with an ordered action log
pub struct SimulatedSession {
    label: String,
    state: Mutex<SimState>,
}

impl Default for SimulatedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSession {
    pub fn new() -> Self {
        Self::with_label("simulated")
    }

    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(SimState {
                url: "about:blank".to_string(),
                text: String::new(),
                slots: Vec::new(),
                redirects: Vec::new(),
                failing_reads: 0,
                stall_after: None,
                disconnected: false,
                script_result: Value::Null,
                reads: 0,
                closes: 0,
                log: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_element(&self, locator: Locator, element: SimElement) {
        self.state().add(locator, element);
    }

    pub fn remove_elements(&self, locator: &Locator) {
        self.state().remove(locator);
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.state().url = url.into();
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.state().text = text.into();
    }

    /// Navigating to exactly `from` lands on `target`
    pub fn redirect(&self, from: impl Into<String>, target: impl Into<String>) {
        self.state().redirects.push((from.into(), target.into()));
    }

    /// The next `count` page reads fail as if a navigation were in flight
    pub fn fail_reads(&self, count: usize) {
        self.state().failing_reads = count;
    }

    /// Page reads after the first `count` never answer
    pub fn stall_reads_after(&self, count: usize) {
        self.state().stall_after = Some(count);
    }

    /// Every later page read fails as if the browser had gone away
    pub fn disconnect(&self) {
        self.state().disconnected = true;
    }

    /// Number of times the session was closed
    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    /// Value returned by every script run
    pub fn set_script_result(&self, value: Value) {
        self.state().script_result = value;
    }

    pub fn url(&self) -> String {
        self.state().url.clone()
    }

    pub fn text(&self) -> String {
        self.state().text.clone()
    }

    /// Number of page reads (queries, url and text reads) served so far
    pub fn reads(&self) -> usize {
        self.state().reads
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.state().log.clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.state().log.iter().filter(|r| r.kind == kind).count()
    }

    /// Interactions performed on elements matching the locator
    pub fn actions_on(&self, locator: &Locator) -> Vec<ActionRecord> {
        let target = key_of(locator);
        self.state()
            .log
            .iter()
            .filter(|r| r.target.as_deref() == Some(target.1.as_str()))
            .cloned()
            .collect()
    }

    /// Every string typed into the page, in order
    pub fn typed_text(&self) -> Vec<String> {
        self.state()
            .log
            .iter()
            .filter(|r| r.kind == "type_text")
            .filter_map(|r| r.value.clone())
            .collect()
    }

    /// Holds back reads that are scripted to hang or fail outright
    async fn gate(&self) -> Result<(), SessionError> {
        let stalled = {
            let state = self.state();
            if state.disconnected {
                return Err(SessionError::Disconnected);
            }
            state.stall_after.is_some_and(|n| state.reads >= n)
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn read(&self) -> Result<MutexGuard<'_, SimState>, SessionError> {
        let mut state = self.state();
        state.reads += 1;
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(SessionError::NavigationInProgress);
        }
        Ok(state)
    }

    /// Record an interaction on a live element, applying its scripted failures
    fn interact(
        &self,
        element: &ElementHandle,
        kind: &str,
        value: Option<String>,
        require_interactable: bool,
    ) -> Result<(), SessionError> {
        let mut state = self.state();
        let slot = state.slot_mut(element)?;
        if slot.element.failing_actions > 0 {
            slot.element.failing_actions -= 1;
            return Err(SessionError::StaleElement(element.id.clone()));
        }
        if require_interactable && !slot.element.interactable() {
            return Err(SessionError::NotInteractable(slot.locator.to_string()));
        }
        let effects = match kind {
            "click" => slot.element.on_click.clone(),
            "type_text" | "set_file_input" => slot.element.on_input.clone(),
            _ => Vec::new(),
        };
        let target = Some(slot.key.1.clone());
        state.log.push(ActionRecord {
            kind: kind.to_string(),
            target,
            value,
        });
        for effect in effects {
            state.apply(effect);
        }
        Ok(())
    }
}

fn key_of(locator: &Locator) -> (Strategy, String) {
    (locator.strategy, locator.selector.clone())
}

impl SimState {
    fn add(&mut self, locator: Locator, element: SimElement) {
        self.slots.push(Slot {
            key: key_of(&locator),
            locator,
            element,
            removed: false,
        });
    }

    fn remove(&mut self, locator: &Locator) {
        let key = key_of(locator);
        for slot in self.slots.iter_mut().filter(|s| s.key == key) {
            slot.removed = true;
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::AppendText(text) => self.text.push_str(&text),
            Effect::SetText(text) => self.text = text,
            Effect::SetUrl(url) => self.url = url,
            Effect::AddElement(locator, element) => self.add(locator, element),
            Effect::RemoveElement(locator) => self.remove(&locator),
        }
    }

    fn slot_mut(&mut self, element: &ElementHandle) -> Result<&mut Slot, SessionError> {
        let index = element
            .id
            .strip_prefix("sim-")
            .and_then(|i| i.parse::<usize>().ok())
            .ok_or_else(|| SessionError::StaleElement(element.id.clone()))?;
        match self.slots.get_mut(index) {
            Some(slot) if !slot.removed => Ok(slot),
            _ => Err(SessionError::StaleElement(element.id.clone())),
        }
    }
}

#[async_trait]
impl Session for SimulatedSession {
    fn label(&self) -> &str {
        &self.label
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let mut state = self.state();
        let landed = state
            .redirects
            .iter()
            .find(|(from, _)| from == url)
            .map(|(_, target)| target.clone())
            .unwrap_or_else(|| url.to_string());
        state.url = landed;
        state.log.push(ActionRecord {
            kind: "navigate".to_string(),
            target: None,
            value: Some(url.to_string()),
        });
        Ok(())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        self.gate().await?;
        let mut state = self.read()?;
        let key = key_of(locator);
        let mut found = Vec::new();
        for (index, slot) in state.slots.iter_mut().enumerate() {
            if slot.removed || slot.key != key {
                continue;
            }
            if slot.element.hidden_lookups > 0 {
                slot.element.hidden_lookups -= 1;
                continue;
            }
            found.push(ElementHandle::new(format!("sim-{}", index)));
        }
        Ok(found)
    }

    async fn is_interactable(&self, element: &ElementHandle) -> Result<bool, SessionError> {
        self.gate().await?;
        let mut state = self.read()?;
        Ok(state.slot_mut(element)?.element.interactable())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.interact(element, "click", None, true)?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.interact(element, "clear", None, true)?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), SessionError> {
        self.interact(element, "type_text", Some(text.to_string()), true)?;
        Ok(())
    }

    async fn set_file_input(
        &self,
        element: &ElementHandle,
        path: &Path,
    ) -> Result<(), SessionError> {
        // file inputs are usually hidden
        self.interact(
            element,
            "set_file_input",
            Some(path.display().to_string()),
            false,
        )?;
        Ok(())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let mut state = self.state();
        Ok(state.slot_mut(element)?.element.attributes.get(name).cloned())
    }

    async fn run_script(
        &self,
        script: &str,
        args: Vec<ScriptValue>,
    ) -> Result<Value, SessionError> {
        let mut state = self.state();
        let mut target = None;
        for arg in &args {
            if let ScriptValue::Element { handle } = arg {
                let slot = state.slot_mut(&ElementHandle::new(handle.clone()))?;
                target = Some(slot.key.1.clone());
            }
        }
        state.log.push(ActionRecord {
            kind: "run_script".to_string(),
            target,
            value: Some(script.to_string()),
        });
        Ok(state.script_result.clone())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        self.gate().await?;
        Ok(self.read()?.url.clone())
    }

    async fn page_text(&self) -> Result<String, SessionError> {
        self.gate().await?;
        Ok(self.read()?.text.clone())
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.state().closes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appears_after_lookups() {
        let session = SimulatedSession::new();
        session.add_element(Locator::id("next-button"), SimElement::new().appears_after(2));

        let locator = Locator::id("next-button");
        assert!(session.find_element(&locator).await.unwrap().is_none());
        assert!(session.find_element(&locator).await.unwrap().is_none());
        assert!(session.find_element(&locator).await.unwrap().is_some());
        assert_eq!(session.reads(), 3);
    }

    #[tokio::test]
    async fn test_click_applies_effects_and_logs() {
        let session = SimulatedSession::new();
        session.add_element(
            Locator::text("Post"),
            SimElement::new()
                .on_click(Effect::AppendText("Posted".to_string()))
                .on_click(Effect::SetUrl("https://x.com/home".to_string())),
        );

        let post = session
            .find_element(&Locator::text("Post"))
            .await
            .unwrap()
            .unwrap();
        session.click(&post).await.unwrap();

        assert_eq!(session.text(), "Posted");
        assert_eq!(session.current_url().await.unwrap(), "https://x.com/home");
        assert_eq!(
            session.actions(),
            vec![ActionRecord {
                kind: "click".to_string(),
                target: Some("Post".to_string()),
                value: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_hidden_element_rejects_click_but_accepts_file() {
        let session = SimulatedSession::new();
        session.add_element(Locator::css("input[type=file]"), SimElement::new().hidden());

        let input = session
            .find_element(&Locator::css("input[type=file]"))
            .await
            .unwrap()
            .unwrap();
        assert!(!session.is_interactable(&input).await.unwrap());
        assert!(matches!(
            session.click(&input).await,
            Err(SessionError::NotInteractable(_))
        ));
        session
            .set_file_input(&input, Path::new("/tmp/clip.mp4"))
            .await
            .unwrap();
        assert_eq!(session.count("set_file_input"), 1);
        assert_eq!(session.count("click"), 0);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let session = SimulatedSession::new();
        session.add_element(Locator::id("done-button"), SimElement::new().fail_next(1));
        session.fail_reads(1);

        let locator = Locator::id("done-button");
        assert_eq!(
            session.find_elements(&locator).await,
            Err(SessionError::NavigationInProgress)
        );
        let done = session.find_element(&locator).await.unwrap().unwrap();
        assert!(matches!(
            session.click(&done).await,
            Err(SessionError::StaleElement(_))
        ));
        session.click(&done).await.unwrap();
        assert_eq!(session.count("click"), 1);
    }

    #[tokio::test]
    async fn test_redirect_on_navigate() {
        let session = SimulatedSession::new();
        session.redirect("https://studio.youtube.com", "https://studio.youtube.com/channel/UC1");

        session.navigate("https://studio.youtube.com").await.unwrap();
        assert_eq!(session.url(), "https://studio.youtube.com/channel/UC1");

        session
            .navigate("https://studio.youtube.com/channel/UC1/videos/short")
            .await
            .unwrap();
        assert_eq!(session.url(), "https://studio.youtube.com/channel/UC1/videos/short");
        assert_eq!(session.count("navigate"), 2);
    }

    #[tokio::test]
    async fn test_removed_element_is_stale() {
        let session = SimulatedSession::new();
        session.add_element(Locator::css(".spinner"), SimElement::new());
        let spinner = session
            .find_element(&Locator::css(".spinner"))
            .await
            .unwrap()
            .unwrap();

        session.remove_elements(&Locator::css(".spinner"));
        assert!(session
            .find_elements(&Locator::css(".spinner"))
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            session.attribute(&spinner, "class").await,
            Err(SessionError::StaleElement(_))
        ));
    }
}
