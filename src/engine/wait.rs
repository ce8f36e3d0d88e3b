//! Wait/condition evaluation
//!
//! Polls a predicate against the session until it holds, the condition's
//! timeout passes, the predicate cannot be checked, or the run is cancelled.
//! Transient session errors (navigation in flight, stale element) are
//! polled through; the wait reports an evaluation error only when the last
//! observation before the deadline was one, or the session failed outright.
//! Every wait is bounded: a wait returns no later than `timeout` plus one
//! poll interval after it starts, even when a session call hangs.

use regex::Regex;
use tokio::time::{sleep, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bridge::{Session, SessionError};
use crate::workflow::{Predicate, WaitCondition};

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied,
    /// The predicate never held within the timeout
    TimedOut,
    /// The predicate could not be checked
    EvaluationError(SessionError),
    Cancelled,
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied)
    }
}

/// Evaluates wait conditions against one session
pub struct ConditionEvaluator<'a> {
    session: &'a dyn Session,
    cancel: &'a CancellationToken,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(session: &'a dyn Session, cancel: &'a CancellationToken) -> Self {
        Self { session, cancel }
    }

    /// Poll `condition` until it is satisfied or its time budget runs out
    pub async fn await_condition(&self, condition: &WaitCondition) -> WaitOutcome {
        let started = Instant::now();
        let deadline = started + condition.timeout;
        let hard_deadline = deadline + condition.poll_interval;
        let pattern = match compile(&condition.predicate) {
            Ok(pattern) => pattern,
            Err(e) => return WaitOutcome::EvaluationError(e),
        };
        let mut polls = 0u32;
        let mut last_error: Option<SessionError> = None;

        loop {
            if self.cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }

            polls += 1;
            let check = timeout_at(
                hard_deadline,
                self.evaluate(&condition.predicate, pattern.as_ref(), started),
            );
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return WaitOutcome::Cancelled,
                result = check => result,
            };

            match result {
                Ok(Ok(true)) => {
                    debug!("{} held after {} poll(s)", condition.predicate.describe(), polls);
                    return WaitOutcome::Satisfied;
                }
                Ok(Ok(false)) => last_error = None,
                Ok(Err(e)) if e.is_transient() => {
                    debug!("{} not checkable yet: {}", condition.predicate.describe(), e);
                    last_error = Some(e);
                }
                Ok(Err(e)) => {
                    debug!("{} could not be checked: {}", condition.predicate.describe(), e);
                    return WaitOutcome::EvaluationError(e);
                }
                // cut off past the deadline: the call never answered in time
                Err(_) => return Self::expired(condition, polls, last_error),
            }

            let now = Instant::now();
            if now >= deadline {
                return Self::expired(condition, polls, last_error);
            }

            let pause = condition.poll_interval.min(deadline - now);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return WaitOutcome::Cancelled,
                _ = sleep(pause) => {}
            }
        }
    }

    /// Outcome once the time budget is spent: the last observation decides
    fn expired(
        condition: &WaitCondition,
        polls: u32,
        last_error: Option<SessionError>,
    ) -> WaitOutcome {
        match last_error {
            Some(e) => {
                debug!(
                    "{} still not checkable after {:?}: {}",
                    condition.predicate.describe(),
                    condition.timeout,
                    e
                );
                WaitOutcome::EvaluationError(e)
            }
            None => {
                debug!(
                    "{} did not hold within {:?} ({} polls)",
                    condition.predicate.describe(),
                    condition.timeout,
                    polls
                );
                WaitOutcome::TimedOut
            }
        }
    }

    /// Evaluate `condition` once, without waiting
    pub async fn check_once(&self, condition: &WaitCondition) -> WaitOutcome {
        if self.cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        let pattern = match compile(&condition.predicate) {
            Ok(pattern) => pattern,
            Err(e) => return WaitOutcome::EvaluationError(e),
        };
        let check = timeout_at(
            Instant::now() + condition.poll_interval,
            self.evaluate(&condition.predicate, pattern.as_ref(), Instant::now()),
        );
        match check.await {
            Ok(Ok(true)) => WaitOutcome::Satisfied,
            Ok(Ok(false)) => WaitOutcome::TimedOut,
            Ok(Err(e)) => WaitOutcome::EvaluationError(e),
            Err(_) => WaitOutcome::EvaluationError(SessionError::Timeout),
        }
    }

    async fn evaluate(
        &self,
        predicate: &Predicate,
        pattern: Option<&Regex>,
        started: Instant,
    ) -> Result<bool, SessionError> {
        match predicate {
            Predicate::ElementExists(locator) => {
                Ok(self.session.find_element(locator).await?.is_some())
            }
            Predicate::ElementInteractable(locator) => {
                let Some(element) = self.session.find_element(locator).await? else {
                    return Ok(false);
                };
                match self.session.is_interactable(&element).await {
                    Ok(interactable) => Ok(interactable),
                    // re-rendered between lookup and check
                    Err(SessionError::StaleElement(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            }
            Predicate::ElementAbsent(locator) => {
                Ok(self.session.find_element(locator).await?.is_none())
            }
            Predicate::TextContains(text) => Ok(self.session.page_text().await?.contains(text)),
            Predicate::UrlMatches(_) => {
                let url = self.session.current_url().await?;
                Ok(pattern.is_some_and(|p| p.is_match(&url)))
            }
            Predicate::UrlContains(text) => Ok(self.session.current_url().await?.contains(text)),
            Predicate::Elapsed(duration) => Ok(started.elapsed() >= *duration),
        }
    }
}

fn compile(predicate: &Predicate) -> Result<Option<Regex>, SessionError> {
    match predicate {
        Predicate::UrlMatches(pattern) => Regex::new(pattern)
            .map(Some)
            .map_err(|e| SessionError::Unsupported(format!("url pattern '{}': {}", pattern, e))),
        _ => Ok(None),
    }
}
