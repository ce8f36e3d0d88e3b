//! Workflow types and definitions
//!
//! This module contains all types for defining and parsing workflows:
//! - `step` - Workflow, WorkflowStep, Action, FailurePolicy and Extraction
//! - `condition` - WaitCondition and the predicates it checks
//! - `locator` - Element locators
//! - `template` - Post text composition and `{name}` substitution
//! - `context` - Payload and ExecutionContext for runtime state
//! - `validate` - Static checks on workflow definitions
//! - `loader` - Load workflows from files and directories
//! - `builtin` - Embedded destination workflows
//! - `catalog` - Built-in and user workflows by destination name
//! - `runner_config` - runner.yaml

pub mod builtin;
pub mod catalog;
pub mod condition;
pub mod context;
pub mod duration;
pub mod loader;
pub mod locator;
pub mod runner_config;
pub mod step;
pub mod template;
pub mod validate;

// Re-export all public types for convenience
pub use catalog::Catalog;
pub use condition::{Predicate, WaitCondition, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
pub use context::{ExecutionContext, Payload, PAYLOAD_VARS};
pub use duration::{parse_duration, DurationError};
pub use loader::{LoadError, WorkflowLoader};
pub use locator::{Locator, Strategy};
pub use runner_config::{BrowserType, PayloadConfig, PlaywrightConfig, RunnerConfig, SessionConfig};
pub use step::{
    Action, ExtractSource, Extraction, FailurePolicy, RetryPolicy, ScriptArg, Workflow,
    WorkflowStep,
};
pub use template::{ComposeSettings, TemplateError, TemplateVars, DEFAULT_POST_TEMPLATE};
pub use validate::{validate, ValidationError};
