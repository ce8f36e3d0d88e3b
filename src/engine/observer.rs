//! Run observers
//!
//! An observer hears about the progress of exactly one platform run. It is
//! carried by the `ExecutionContext`, created when the run starts and
//! dropped with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::{info, warn};

use super::result::{StepOutcome, UploadResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RunStarted,
    RunCompleted,
    StepStarted,
    StepCompleted,
    StepRetrying,
    FallbackStarted,
    AwaitingConfirmation,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RunStarted => "RUN_STARTED",
            EventType::RunCompleted => "RUN_COMPLETED",
            EventType::StepStarted => "STEP_STARTED",
            EventType::StepCompleted => "STEP_COMPLETED",
            EventType::StepRetrying => "STEP_RETRYING",
            EventType::FallbackStarted => "FALLBACK_STARTED",
            EventType::AwaitingConfirmation => "AWAITING_CONFIRMATION",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub event_type: EventType,
    pub run_id: String,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RunEvent {
    fn new(event_type: EventType, run_id: &str, platform: &str) -> Self {
        Self {
            event_type,
            run_id: run_id.to_string(),
            platform: platform.to_string(),
            timestamp: Utc::now(),
            step_id: None,
            attempt: None,
            success: None,
            detail: None,
        }
    }

    pub fn run_started(run_id: &str, platform: &str) -> Self {
        Self::new(EventType::RunStarted, run_id, platform)
    }

    pub fn run_completed(result: &UploadResult) -> Self {
        let mut event = Self::new(EventType::RunCompleted, &result.run_id, &result.platform);
        event.success = Some(result.succeeded);
        event.step_id = result.failed_at_step_id.clone();
        event.detail = result
            .failure_kind
            .map(|kind| kind.to_string())
            .or_else(|| result.result_identifier.clone());
        event
    }

    pub fn step_started(run_id: &str, platform: &str, step_id: &str, attempt: u32) -> Self {
        let mut event = Self::new(EventType::StepStarted, run_id, platform);
        event.step_id = Some(step_id.to_string());
        event.attempt = Some(attempt);
        event
    }

    pub fn step_completed(run_id: &str, platform: &str, step_id: &str, outcome: &StepOutcome) -> Self {
        let mut event = Self::new(EventType::StepCompleted, run_id, platform);
        event.step_id = Some(step_id.to_string());
        event.success = Some(outcome.is_success());
        event.detail = outcome.failure_kind().map(|kind| kind.to_string());
        event
    }

    pub fn step_retrying(
        run_id: &str,
        platform: &str,
        step_id: &str,
        attempt: u32,
        reason: &str,
    ) -> Self {
        let mut event = Self::new(EventType::StepRetrying, run_id, platform);
        event.step_id = Some(step_id.to_string());
        event.attempt = Some(attempt);
        event.detail = Some(reason.to_string());
        event
    }

    pub fn fallback_started(run_id: &str, platform: &str, step_id: &str, fallback_id: &str) -> Self {
        let mut event = Self::new(EventType::FallbackStarted, run_id, platform);
        event.step_id = Some(step_id.to_string());
        event.detail = Some(fallback_id.to_string());
        event
    }

    pub fn awaiting_confirmation(run_id: &str, platform: &str, condition: &str) -> Self {
        let mut event = Self::new(EventType::AwaitingConfirmation, run_id, platform);
        event.detail = Some(condition.to_string());
        event
    }
}

/// Receives progress events for one run
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent);
}

/// Discards every event
pub struct NullObserver;

impl RunObserver for NullObserver {
    fn on_event(&self, _event: &RunEvent) {}
}

/// Logs every event through `tracing`
#[derive(Debug, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_event(&self, event: &RunEvent) {
        let step = event.step_id.as_deref().unwrap_or("-");
        let detail = event.detail.as_deref().unwrap_or("");
        match (event.event_type, event.success) {
            (EventType::StepCompleted, Some(false)) | (EventType::RunCompleted, Some(false)) => {
                warn!(
                    platform = %event.platform,
                    run_id = %event.run_id,
                    "{} step={} {}",
                    event.event_type,
                    step,
                    detail
                )
            }
            (EventType::StepRetrying, _) => warn!(
                platform = %event.platform,
                run_id = %event.run_id,
                "{} step={} attempt={} {}",
                event.event_type,
                step,
                event.attempt.unwrap_or(0),
                detail
            ),
            _ => info!(
                platform = %event.platform,
                run_id = %event.run_id,
                "{} step={} {}",
                event.event_type,
                step,
                detail
            ),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn event_types(&self) -> Vec<EventType> {
        self.events().iter().map(|e| e.event_type).collect()
    }
}

impl RunObserver for RecordingObserver {
    fn on_event(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::result::ErrorKind;

    #[test]
    fn test_recording_observer() {
        let observer = RecordingObserver::new();
        observer.on_event(&RunEvent::run_started("r1", "x"));
        observer.on_event(&RunEvent::step_completed(
            "r1",
            "x",
            "post",
            &StepOutcome::Failed(ErrorKind::ActionFailed),
        ));

        let events = observer.events();
        assert_eq!(
            observer.event_types(),
            vec![EventType::RunStarted, EventType::StepCompleted]
        );
        assert_eq!(events[1].success, Some(false));
        assert_eq!(events[1].detail.as_deref(), Some("ActionFailed"));
    }

    #[test]
    fn test_event_serialization() {
        let event = RunEvent::step_started("r1", "youtube", "next-1", 2);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["eventType"], "STEP_STARTED");
        assert_eq!(value["stepId"], "next-1");
        assert_eq!(value["attempt"], 2);
        assert!(value.get("success").is_none());
    }
}
