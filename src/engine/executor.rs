//! Step Executor - runs one workflow step under its failure policy
//!
//! A step is executed as:
//! 1. Wait for the step's readiness condition
//! 2. Perform its action
//! 3. Verify the post-action condition
//!
//! A failure in any phase is then handed to the step's `on_failure` policy,
//! which may absorb it (`continue`), re-run the step (`retry`) or run an
//! alternate step in its place (`fallback`). Cancellation is never absorbed.

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::engine::actions::{perform, ActionScope};
use crate::engine::observer::RunEvent;
use crate::engine::result::{ErrorKind, StepOutcome, StepRecord};
use crate::engine::wait::{ConditionEvaluator, WaitOutcome};
use crate::workflow::template::{compose, TemplateVars};
use crate::workflow::{ExecutionContext, FailurePolicy, WaitCondition, Workflow, WorkflowStep};

/// A failed attempt of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepFailure {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "run cancelled")
    }
}

/// Executes the steps of one workflow against one context
///
/// Holds the run's template variables: the payload values, the composed
/// `post` text and every value captured so far.
pub struct StepExecutor<'a> {
    ctx: &'a ExecutionContext,
    workflow: &'a Workflow,
    vars: TemplateVars,
}

impl<'a> StepExecutor<'a> {
    pub fn new(ctx: &'a ExecutionContext, workflow: &'a Workflow) -> Self {
        let mut vars = ctx.payload.vars();
        match compose(&workflow.post_template, &vars, &workflow.compose) {
            Ok(post) => {
                vars.insert("post".to_string(), post);
            }
            Err(e) => warn!("Post text for {} could not be composed: {}", workflow.name, e),
        }
        Self { ctx, workflow, vars }
    }

    /// Variables visible to templates at this point of the run
    pub fn vars(&self) -> &TemplateVars {
        &self.vars
    }

    fn evaluator(&self) -> ConditionEvaluator<'_> {
        ConditionEvaluator::new(self.ctx.session.as_ref(), &self.ctx.cancel)
    }

    fn emit(&self, event: RunEvent) {
        self.ctx.observer.on_event(&event);
    }

    /// Execute `step`, applying its failure policy
    pub fn execute<'s>(&'s mut self, step: &'s WorkflowStep) -> BoxFuture<'s, StepRecord> {
        let span = info_span!("step", step_id = %step.id);
        async move {
            let platform = self.workflow.name.clone();
            let run_id = self.ctx.run_id.clone();
            let mut record = StepRecord::new(&step.id, StepOutcome::Success);
            record.attempts = 0;

            loop {
                if self.ctx.is_cancelled() {
                    record.outcome = StepOutcome::Failed(ErrorKind::Cancelled);
                    record.message = Some(StepFailure::cancelled().message);
                    return record;
                }

                record.attempts += 1;
                info!("Executing step: {} (attempt {})", step.display_name(), record.attempts);
                self.emit(RunEvent::step_started(&run_id, &platform, &step.id, record.attempts));

                let failure = match self.attempt(step).await {
                    Ok(()) => {
                        record.outcome = StepOutcome::Success;
                        break;
                    }
                    Err(failure) => failure,
                };
                record.message = Some(failure.message.clone());

                if failure.kind == ErrorKind::Cancelled {
                    record.outcome = StepOutcome::Failed(ErrorKind::Cancelled);
                    break;
                }

                match &step.on_failure {
                    FailurePolicy::Abort => {
                        record.outcome = StepOutcome::Failed(failure.kind);
                        break;
                    }
                    FailurePolicy::ContinueDegraded => {
                        warn!("Step '{}' failed, continuing: {}", step.id, failure.message);
                        record.outcome = StepOutcome::Degraded(failure.kind);
                        break;
                    }
                    FailurePolicy::Retry(policy) => {
                        if record.attempts > policy.max_retries {
                            warn!(
                                "Step '{}' failed after {} attempts: {}",
                                step.id, record.attempts, failure.message
                            );
                            record.outcome = StepOutcome::Failed(failure.kind);
                            break;
                        }

                        if self.marker_holds().await {
                            info!("Success marker observed while retrying '{}'", step.id);
                            record.outcome = StepOutcome::MarkerObserved;
                            break;
                        }

                        let delay = policy.delay_for(record.attempts);
                        debug!("Retrying step '{}' in {:?}", step.id, delay);
                        self.emit(RunEvent::step_retrying(
                            &run_id,
                            &platform,
                            &step.id,
                            record.attempts + 1,
                            &failure.message,
                        ));
                        tokio::select! {
                            biased;
                            _ = self.ctx.cancel.cancelled() => {
                                record.outcome = StepOutcome::Failed(ErrorKind::Cancelled);
                                record.message = Some(StepFailure::cancelled().message);
                                break;
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    FailurePolicy::Fallback(alternate) => {
                        warn!(
                            "Step '{}' failed ({}), trying fallback '{}'",
                            step.id, failure.message, alternate.id
                        );
                        self.emit(RunEvent::fallback_started(
                            &run_id,
                            &platform,
                            &step.id,
                            &alternate.id,
                        ));
                        let alt = self.execute(alternate).await;
                        record.outcome = alt.outcome;
                        record.fallback = Some(alt.step_id);
                        if alt.message.is_some() {
                            record.message = alt.message;
                        }
                        break;
                    }
                }
            }

            self.emit(RunEvent::step_completed(&run_id, &platform, &step.id, &record.outcome));
            record
        }
        .instrument(span)
        .boxed()
    }

    /// One pass of wait, act, verify
    async fn attempt(&mut self, step: &WorkflowStep) -> Result<(), StepFailure> {
        if let Some(wait) = &step.wait {
            self.await_phase(wait, ErrorKind::ElementNotReady).await?;
        }

        if self.ctx.is_cancelled() {
            return Err(StepFailure::cancelled());
        }

        if let Some(action) = &step.action {
            let mut scope = ActionScope {
                session: self.ctx.session.as_ref(),
                workflow: self.workflow,
                payload: self.ctx.payload.as_ref(),
                vars: &mut self.vars,
            };
            perform(&mut scope, step, action).await.map_err(|e| {
                StepFailure::new(
                    ErrorKind::ActionFailed,
                    format!("{} failed: {}", action.kind(), e),
                )
            })?;
        }

        if let Some(verify) = &step.verify {
            self.await_phase(verify, ErrorKind::ActionFailed).await?;
        }

        Ok(())
    }

    async fn await_phase(&self, condition: &WaitCondition, kind: ErrorKind) -> Result<(), StepFailure> {
        match self.evaluator().await_condition(condition).await {
            WaitOutcome::Satisfied => Ok(()),
            WaitOutcome::TimedOut => Err(StepFailure::new(
                kind,
                format!("{} did not hold within {:?}", condition.predicate.describe(), condition.timeout),
            )),
            WaitOutcome::EvaluationError(e) => Err(StepFailure::new(
                kind,
                format!("{} could not be checked: {}", condition.predicate.describe(), e),
            )),
            WaitOutcome::Cancelled => Err(StepFailure::cancelled()),
        }
    }

    /// Check the workflow's success marker once, without waiting
    pub async fn marker_holds(&self) -> bool {
        self.evaluator().check_once(&self.workflow.success).await.is_satisfied()
    }
}
