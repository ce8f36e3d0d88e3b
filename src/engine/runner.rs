//! Workflow Runner - executes one platform's workflow to a single result
//!
//! Steps run strictly in order. The first propagated step failure ends the
//! run; otherwise the run waits for the workflow's success marker and then
//! tries to read back the published identifier. Whatever happens, the run
//! ends in exactly one `UploadResult`.
//!
//! A runner is consumed by [`WorkflowRunner::run`], so a finished run can
//! never be re-entered.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::actions::run_extraction;
use crate::engine::executor::StepExecutor;
use crate::engine::observer::RunEvent;
use crate::engine::result::{ErrorKind, StepOutcome, StepRecord, UploadResult};
use crate::engine::wait::{ConditionEvaluator, WaitOutcome};
use crate::workflow::{ExecutionContext, Workflow};

pub struct WorkflowRunner {
    workflow: Arc<Workflow>,
    ctx: ExecutionContext,
}

/// How the steps of a run ended, before confirmation
enum Ending {
    Completed,
    MarkerObserved,
    Failed {
        kind: ErrorKind,
        step_id: Option<String>,
        message: String,
    },
}

impl WorkflowRunner {
    pub fn new(workflow: Arc<Workflow>, ctx: ExecutionContext) -> Self {
        Self { workflow, ctx }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Execute the workflow to its single result
    #[instrument(skip(self), fields(platform = %self.workflow.name, run_id = %self.ctx.run_id))]
    pub async fn run(self) -> UploadResult {
        let workflow = self.workflow.as_ref();
        let ctx = &self.ctx;
        let started_at = Utc::now();

        info!("Running workflow: {} ({} steps)", workflow.name, workflow.steps.len());
        ctx.observer
            .on_event(&RunEvent::run_started(&ctx.run_id, &workflow.name));

        let mut executor = StepExecutor::new(ctx, workflow);
        let mut records: Vec<StepRecord> = Vec::with_capacity(workflow.steps.len());
        let mut ending = Ending::Completed;

        for step in &workflow.steps {
            let record = executor.execute(step).await;
            let outcome = record.outcome;
            let message = record.message.clone();
            records.push(record);

            match outcome {
                StepOutcome::Success | StepOutcome::Degraded(_) => {}
                StepOutcome::MarkerObserved => {
                    ending = Ending::MarkerObserved;
                    break;
                }
                StepOutcome::Failed(kind) => {
                    ending = if kind != ErrorKind::Cancelled && executor.marker_holds().await {
                        info!("Step '{}' failed but the success marker holds", step.id);
                        Ending::MarkerObserved
                    } else {
                        Ending::Failed {
                            kind,
                            step_id: Some(step.id.clone()),
                            message: message.unwrap_or_else(|| kind.to_string()),
                        }
                    };
                    break;
                }
            }
        }

        if let Ending::Completed = ending {
            ending = self.confirm().await;
        }

        let mut result = UploadResult {
            platform: workflow.name.clone(),
            succeeded: false,
            result_identifier: None,
            failure_kind: None,
            failed_at_step_id: None,
            message: None,
            steps: records,
            run_id: ctx.run_id.clone(),
            started_at,
            finished_at: started_at,
        };

        match ending {
            Ending::Completed | Ending::MarkerObserved => {
                result.succeeded = true;
                if let Some(rule) = &workflow.result {
                    match run_extraction(ctx.session.as_ref(), rule, executor.vars()).await {
                        Ok(Some(identifier)) => result.result_identifier = Some(identifier),
                        Ok(None) => debug!("No result identifier found"),
                        Err(e) => warn!("Result extraction failed: {}", e),
                    }
                }
                info!(
                    "Workflow {} succeeded{}",
                    workflow.name,
                    result
                        .result_identifier
                        .as_deref()
                        .map(|id| format!(": {}", id))
                        .unwrap_or_default()
                );
            }
            Ending::Failed {
                kind,
                step_id,
                message,
            } => {
                error!(
                    "Workflow {} failed at {}: {} ({})",
                    workflow.name,
                    step_id.as_deref().unwrap_or("confirmation"),
                    kind,
                    message
                );
                result.failure_kind = Some(kind);
                result.failed_at_step_id = step_id;
                result.message = Some(message);
            }
        }

        result.finished_at = Utc::now();
        ctx.observer.on_event(&RunEvent::run_completed(&result));
        result
    }

    /// Wait for the success marker after every step completed
    async fn confirm(&self) -> Ending {
        let marker = &self.workflow.success;
        self.ctx.observer.on_event(&RunEvent::awaiting_confirmation(
            &self.ctx.run_id,
            &self.workflow.name,
            &marker.describe(),
        ));

        let evaluator = ConditionEvaluator::new(self.ctx.session.as_ref(), &self.ctx.cancel);
        match evaluator.await_condition(marker).await {
            WaitOutcome::Satisfied => Ending::Completed,
            WaitOutcome::TimedOut => Ending::Failed {
                kind: ErrorKind::SuccessNotConfirmed,
                step_id: None,
                message: format!(
                    "{} was not observed; publication may still have happened",
                    marker.describe()
                ),
            },
            // every step ran, so publication is as likely as after a timeout
            WaitOutcome::EvaluationError(e) => Ending::Failed {
                kind: ErrorKind::SuccessNotConfirmed,
                step_id: None,
                message: format!(
                    "{} could not be checked ({}); publication may still have happened",
                    marker.describe(),
                    e
                ),
            },
            WaitOutcome::Cancelled => Ending::Failed {
                kind: ErrorKind::Cancelled,
                step_id: None,
                message: "run cancelled while awaiting confirmation".to_string(),
            },
        }
    }
}

/// Run `workflow` once against `ctx`
pub async fn run_workflow(workflow: Arc<Workflow>, ctx: ExecutionContext) -> UploadResult {
    WorkflowRunner::new(workflow, ctx).run().await
}
