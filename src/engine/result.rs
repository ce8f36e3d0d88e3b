//! Execution result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a step or run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A wait condition never held
    ElementNotReady,
    /// An interaction threw or was rejected
    ActionFailed,
    /// Every step completed but the success marker was never observed;
    /// publication may or may not have happened
    SuccessNotConfirmed,
    /// A predicate could not be checked (stale page, navigation race)
    EvaluationError,
    /// The run was cancelled from outside
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ElementNotReady => "ElementNotReady",
            ErrorKind::ActionFailed => "ActionFailed",
            ErrorKind::SuccessNotConfirmed => "SuccessNotConfirmed",
            ErrorKind::EvaluationError => "EvaluationError",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Outcome of one step after its failure policy has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    /// Failed, absorbed by `continue`; counts as success
    Degraded(ErrorKind),
    /// The success marker was observed while the step was failing
    MarkerObserved,
    Failed(ErrorKind),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, StepOutcome::Failed(_))
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            StepOutcome::Failed(kind) | StepOutcome::Degraded(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// What happened to one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_id: String,
    pub outcome: StepOutcome,
    /// Executions of the step itself, retries included
    pub attempts: u32,
    /// Id of the alternate step that ran in place of this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Last error message seen, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StepRecord {
    pub fn new(step_id: impl Into<String>, outcome: StepOutcome) -> Self {
        Self {
            step_id: step_id.into(),
            outcome,
            attempts: 1,
            fallback: None,
            message: None,
        }
    }
}

/// The one result of one platform run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub platform: String,
    pub succeeded: bool,
    /// Published-content identifier read back after success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at_step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl UploadResult {
    /// The content may have been published even though it was not confirmed
    pub fn is_ambiguous(&self) -> bool {
        !self.succeeded
            && matches!(
                self.failure_kind,
                Some(ErrorKind::SuccessNotConfirmed) | Some(ErrorKind::EvaluationError)
            )
            && self.failed_at_step_id.is_none()
    }

    pub fn status(&self) -> &'static str {
        if self.succeeded {
            "succeeded"
        } else if self.is_ambiguous() {
            "ambiguous"
        } else {
            "failed"
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(failure_kind: Option<ErrorKind>, failed_at: Option<&str>) -> UploadResult {
        let now = Utc::now();
        UploadResult {
            platform: "x".to_string(),
            succeeded: failure_kind.is_none(),
            result_identifier: None,
            failure_kind,
            failed_at_step_id: failed_at.map(|s| s.to_string()),
            message: None,
            steps: Vec::new(),
            run_id: "run".to_string(),
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_ambiguity() {
        assert!(!result(None, None).is_ambiguous());
        assert!(result(Some(ErrorKind::SuccessNotConfirmed), None).is_ambiguous());
        assert!(result(Some(ErrorKind::EvaluationError), None).is_ambiguous());
        assert!(!result(Some(ErrorKind::EvaluationError), Some("submit")).is_ambiguous());
        assert!(!result(Some(ErrorKind::ActionFailed), Some("submit")).is_ambiguous());

        assert_eq!(result(None, None).status(), "succeeded");
        assert_eq!(
            result(Some(ErrorKind::SuccessNotConfirmed), None).status(),
            "ambiguous"
        );
        assert_eq!(
            result(Some(ErrorKind::Cancelled), Some("open")).status(),
            "failed"
        );
    }

    #[test]
    fn test_step_outcome() {
        assert!(StepOutcome::Success.is_success());
        assert!(StepOutcome::Degraded(ErrorKind::ElementNotReady).is_success());
        assert!(StepOutcome::MarkerObserved.is_success());
        assert!(!StepOutcome::Failed(ErrorKind::ActionFailed).is_success());
        assert_eq!(
            StepOutcome::Degraded(ErrorKind::ElementNotReady).failure_kind(),
            Some(ErrorKind::ElementNotReady)
        );
    }

    #[test]
    fn test_serialize_result() {
        let value = serde_json::to_value(result(Some(ErrorKind::ActionFailed), Some("post"))).unwrap();
        assert_eq!(value["failure_kind"], "ActionFailed");
        assert_eq!(value["failed_at_step_id"], "post");
        assert!(value.get("result_identifier").is_none());

        let record = serde_json::to_value(StepRecord::new(
            "caption",
            StepOutcome::Degraded(ErrorKind::ElementNotReady),
        ))
        .unwrap();
        assert_eq!(record["outcome"]["status"], "degraded");
        assert_eq!(record["outcome"]["kind"], "ElementNotReady");
    }
}
