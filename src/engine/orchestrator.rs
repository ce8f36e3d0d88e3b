//! Orchestrator - runs the configured platforms and collects their results
//!
//! Two modes:
//! - shared: platforms run one after another on a single session
//! - isolated: each platform gets its own session from a [`SessionFactory`]
//!   and up to `parallel` platforms run at once
//!
//! Either way every platform yields exactly one `UploadResult`, in the order
//! the platforms were given, and no platform's failure stops the others.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::observer::{RunObserver, TracingObserver};
use super::result::{ErrorKind, UploadResult};
use super::runner::run_workflow;
use crate::bridge::{Session, SessionFactory};
use crate::workflow::{ExecutionContext, Payload, Workflow};

/// Creates the observer for one platform run
pub type ObserverFactory = Arc<dyn Fn(&str) -> Arc<dyn RunObserver> + Send + Sync>;

enum Sessions {
    Shared(Arc<dyn Session>),
    Isolated {
        factory: Arc<dyn SessionFactory>,
        parallel: usize,
    },
}

pub struct Orchestrator {
    workflows: Vec<Arc<Workflow>>,
    sessions: Sessions,
    observers: ObserverFactory,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Run platforms sequentially on one shared session
    pub fn new(workflows: Vec<Arc<Workflow>>, session: Arc<dyn Session>) -> Self {
        Self::with_sessions(workflows, Sessions::Shared(session))
    }

    /// Run platforms on isolated sessions, at most `parallel` at a time
    pub fn isolated(
        workflows: Vec<Arc<Workflow>>,
        factory: Arc<dyn SessionFactory>,
        parallel: usize,
    ) -> Self {
        Self::with_sessions(
            workflows,
            Sessions::Isolated {
                factory,
                parallel: parallel.max(1),
            },
        )
    }

    fn with_sessions(workflows: Vec<Arc<Workflow>>, sessions: Sessions) -> Self {
        Self {
            workflows,
            sessions,
            observers: Arc::new(|_: &str| Arc::new(TracingObserver) as Arc<dyn RunObserver>),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observers(mut self, observers: ObserverFactory) -> Self {
        self.observers = observers;
        self
    }

    /// Token that cancels every run started by this orchestrator
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn platforms(&self) -> Vec<&str> {
        self.workflows.iter().map(|w| w.name.as_str()).collect()
    }

    /// Run every platform once with the same payload
    pub async fn run(&self, payload: Arc<Payload>) -> Vec<UploadResult> {
        info!("Publishing to {} platform(s)", self.workflows.len());

        let results = match &self.sessions {
            Sessions::Shared(session) => {
                let mut results = Vec::with_capacity(self.workflows.len());
                for workflow in &self.workflows {
                    let ctx = self.context(&payload, session.clone(), &workflow.name);
                    results.push(run_workflow(workflow.clone(), ctx).await);
                }
                results
            }
            Sessions::Isolated { factory, parallel } => {
                let semaphore = Arc::new(Semaphore::new(*parallel));
                let runs = self.workflows.iter().map(|workflow| {
                    let semaphore = semaphore.clone();
                    let payload = payload.clone();
                    async move {
                        // the semaphore is never closed
                        let _permit = semaphore.acquire_owned().await.ok();
                        self.run_isolated(factory.as_ref(), workflow.clone(), payload)
                            .await
                    }
                });
                join_all(runs).await
            }
        };

        let succeeded = results.iter().filter(|r| r.succeeded).count();
        info!(
            "Finished: {}/{} platform(s) succeeded",
            succeeded,
            results.len()
        );
        results
    }

    async fn run_isolated(
        &self,
        factory: &dyn SessionFactory,
        workflow: Arc<Workflow>,
        payload: Arc<Payload>,
    ) -> UploadResult {
        let session = match factory.open(&workflow.name).await {
            Ok(session) => session,
            Err(e) => {
                error!("Could not open a session for {}: {}", workflow.name, e);
                let now = Utc::now();
                return UploadResult {
                    platform: workflow.name.clone(),
                    succeeded: false,
                    result_identifier: None,
                    failure_kind: Some(ErrorKind::ActionFailed),
                    failed_at_step_id: None,
                    message: Some(format!("session could not be opened: {}", e)),
                    steps: Vec::new(),
                    run_id: uuid::Uuid::new_v4().to_string(),
                    started_at: now,
                    finished_at: now,
                };
            }
        };
        let ctx = self.context(&payload, session.clone(), &workflow.name);
        let result = run_workflow(workflow, ctx).await;
        if let Err(e) = session.close().await {
            warn!("Session for {} did not close cleanly: {}", result.platform, e);
        }
        result
    }

    fn context(
        &self,
        payload: &Arc<Payload>,
        session: Arc<dyn Session>,
        platform: &str,
    ) -> ExecutionContext {
        ExecutionContext::new(payload.clone(), session)
            .with_observer((self.observers)(platform))
            .with_cancel(self.cancel.child_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{SessionError, SimulatedSession};
    use async_trait::async_trait;

    fn workflow(name: &str, marker: &str) -> Arc<Workflow> {
        let yaml = format!(
            r#"
name: {name}
steps:
  - id: open
    action: {{ navigate: {{ url: "https://{name}.example/upload" }} }}
success: {{ text_contains: "{marker}", timeout: 1s }}
"#
        );
        Arc::new(serde_yaml::from_str(&yaml).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_later_platforms() {
        let session = Arc::new(SimulatedSession::new());
        session.set_text("Uploaded");
        let orchestrator = Orchestrator::new(
            vec![workflow("a", "Missing"), workflow("b", "Uploaded")],
            session.clone(),
        );

        let results = orchestrator.run(Arc::new(Payload::default())).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].platform, "a");
        assert_eq!(results[0].failure_kind, Some(ErrorKind::SuccessNotConfirmed));
        assert!(results[1].succeeded);
        assert_ne!(results[0].run_id, results[1].run_id);
        assert_eq!(session.count("navigate"), 2);
    }

    #[derive(Default)]
    struct Factory {
        opened: std::sync::Mutex<Vec<Arc<SimulatedSession>>>,
    }

    #[async_trait]
    impl SessionFactory for Factory {
        async fn open(&self, platform: &str) -> Result<Arc<dyn Session>, SessionError> {
            if platform == "broken" {
                return Err(SessionError::StartupFailed("no profile".to_string()));
            }
            let session = Arc::new(SimulatedSession::with_label(platform));
            session.set_text("Done");
            self.opened.lock().unwrap().push(session.clone());
            Ok(session)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_sessions() {
        let factory = Arc::new(Factory::default());
        let orchestrator = Orchestrator::isolated(
            vec![
                workflow("a", "Done"),
                workflow("broken", "Done"),
                workflow("c", "Done"),
            ],
            factory.clone(),
            2,
        );
        assert_eq!(orchestrator.platforms(), vec!["a", "broken", "c"]);

        let results = orchestrator.run(Arc::new(Payload::default())).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].succeeded);
        assert!(!results[1].succeeded);
        assert_eq!(results[1].failure_kind, Some(ErrorKind::ActionFailed));
        assert!(results[1].message.as_deref().unwrap().contains("no profile"));
        assert!(results[2].succeeded);

        let opened = factory.opened.lock().unwrap();
        assert_eq!(opened.len(), 2);
        for session in opened.iter() {
            assert_eq!(session.close_count(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reaches_every_platform() {
        let session = Arc::new(SimulatedSession::new());
        let orchestrator = Orchestrator::new(
            vec![workflow("a", "Done"), workflow("b", "Done")],
            session.clone(),
        );
        orchestrator.cancel_token().cancel();

        let results = orchestrator.run(Arc::new(Payload::default())).await;
        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.failure_kind, Some(ErrorKind::Cancelled));
        }
        assert!(session.actions().is_empty());
    }
}
