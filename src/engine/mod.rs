//! Workflow execution engine module
//!
//! This module contains:
//! - `wait` - Condition evaluator polling predicates against a session
//! - `executor` - Step executor applying per-step failure policies
//! - `runner` - Workflow runner producing one result per platform run
//! - `orchestrator` - Runs the configured platforms and collects results
//! - `actions` - Action implementations and result extraction
//! - `observer` - Per-run progress observers
//! - `plan` - Dry-run descriptions of what a workflow would do
//! - `error` - Executor error types
//! - `result` - Step and upload result types

pub mod actions;
pub mod error;
pub mod executor;
pub mod observer;
pub mod orchestrator;
pub mod plan;
pub mod result;
pub mod runner;
pub mod wait;

pub use error::ExecutorError;
pub use executor::{StepExecutor, StepFailure};
pub use observer::{
    EventType, NullObserver, RecordingObserver, RunEvent, RunObserver, TracingObserver,
};
pub use orchestrator::{ObserverFactory, Orchestrator};
pub use plan::{plan, Plan, PlannedStep};
pub use result::{ErrorKind, StepOutcome, StepRecord, UploadResult};
pub use runner::{run_workflow, WorkflowRunner};
pub use wait::{ConditionEvaluator, WaitOutcome};
