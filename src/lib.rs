//! # Upload Actions
//!
//! A declarative browser workflow engine that publishes one video post
//! (title, description, tags and a video file) to several destinations.
//!
//! ## Features
//!
//! - **Declarative YAML workflows** - Each destination is an ordered list of
//!   wait/act/verify steps plus a success marker
//! - **Observable waits** - Every wait is a predicate over page state with a
//!   timeout, never a fixed sleep
//! - **Per-step failure policies** - abort, continue, retry with backoff, or
//!   run a fallback step
//! - **Platform isolation** - One destination's failure never stops the others
//!
//! ## Sessions
//!
//! - **Playwright** (default): a browser page driven over JSON-RPC
//! - **Simulated**: an in-memory page with scripted behaviour, for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use upload_actions::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = Catalog::builtin()?;
//!     let workflows = catalog.select(&["x".to_string(), "linkedin".to_string()])?;
//!
//!     let session = PlaywrightSession::start(&PlaywrightConfig::default()).await?;
//!     let orchestrator = Orchestrator::new(workflows, Arc::new(session));
//!
//!     let payload = Payload::new("Title", "Description", "#tags", "/videos/clip.mp4");
//!     for result in orchestrator.run(Arc::new(payload)).await {
//!         println!("{}: {}", result.platform, result.status());
//!     }
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod engine;
pub mod metadata;
pub mod workflow;

// Re-export main types
pub use bridge::{
    ElementHandle, PlaywrightFactory, PlaywrightSession, ScriptValue, Session, SessionError,
    SessionFactory, SimulatedSession,
};
pub use engine::{
    run_workflow, ErrorKind, ExecutorError, Orchestrator, RunEvent, RunObserver, StepOutcome,
    StepRecord, UploadResult, WorkflowRunner,
};
pub use metadata::{MetadataError, MetadataProvider, PostMetadata, TextFileMetadata};
pub use workflow::{
    Action, BrowserType, Catalog, ExecutionContext, FailurePolicy, LoadError, Locator, Payload,
    PlaywrightConfig, Predicate, RunnerConfig, WaitCondition, Workflow, WorkflowLoader,
    WorkflowStep,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bridge::{
        PlaywrightFactory, PlaywrightSession, Session, SessionError, SessionFactory,
        SimulatedSession,
    };
    pub use crate::engine::{
        plan, run_workflow, ErrorKind, ExecutorError, Orchestrator, RunObserver, StepOutcome,
        TracingObserver, UploadResult, WorkflowRunner,
    };
    pub use crate::metadata::{MetadataProvider, PostMetadata, TextFileMetadata};
    pub use crate::workflow::{
        BrowserType, Catalog, ExecutionContext, LoadError, Payload, PlaywrightConfig,
        RunnerConfig, Workflow, WorkflowLoader,
    };
}
