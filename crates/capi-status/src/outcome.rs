//! Reconcile outcomes
//!
//! A controller finishes every reconcile by choosing exactly one outcome.
//! The outcome fixes both the conditions reported on the ClusterOperator and
//! what the kube-rs scheduler does next:
//!
//! | outcome             | Progressing            | Degraded                 | schedule       |
//! |---------------------|------------------------|--------------------------|----------------|
//! | success             | False/AsExpected       | False/AsExpected         | await change   |
//! | progressing         | True/Progressing       | False/AsExpected         | await change   |
//! | waiting on external | True/WaitingOnExternal | False/AsExpected         | await change   |
//! | error               | True/EphemeralError    | False/Progressing        | backoff        |
//! | non-retryable error | False/NonRetryableError| True/NonRetryableError   | stop           |
//!
//! Non-error outcomes may carry an explicit requeue delay. Error outcomes
//! never do: the error itself drives the backoff, and a second timer would
//! race it.

use std::time::Duration;

use capi_common::crd::ConditionStatus;
use capi_common::Error;
use kube::runtime::controller::Action;
use tracing::{debug, warn};

use crate::conditions::{
    ConditionSet, REASON_AS_EXPECTED, REASON_EPHEMERAL_ERROR, REASON_NON_RETRYABLE_ERROR,
    REASON_PROGRESSING, REASON_WAITING_ON_EXTERNAL,
};
use crate::writer::ConditionWriter;

/// Terminal disposition of one reconcile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Desired state reached
    Success,
    /// State changed; a watch event will re-invoke the controller
    Progressing,
    /// Blocked on something another component owns
    WaitingOnExternal,
    /// Transient failure, retried with backoff
    RetryableError,
    /// Failure that cannot resolve on its own
    NonRetryableError,
}

/// What the scheduler does after the reconcile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Wait for the next watch event
    AwaitChange,
    /// Requeue after a fixed delay
    RequeueAfter(Duration),
    /// Return the error so the error policy applies exponential backoff
    Backoff,
    /// Return a terminal error; no automatic retry
    Stop,
}

/// Builds outcomes for one controller.
///
/// The controller name is the qualifier for the condition types it reports.
#[derive(Clone, Debug)]
pub struct OutcomeGenerator {
    controller: String,
}

impl OutcomeGenerator {
    /// Create a generator for `controller`
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
        }
    }

    /// Controller qualifier
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Desired state reached; rely on watches for the next reconcile
    pub fn success(&self) -> ReconcileOutcome {
        self.build(
            OutcomeKind::Success,
            String::new(),
            None,
            ConditionSet::new(
                &self.controller,
                (ConditionStatus::False, REASON_AS_EXPECTED, String::new()),
                (ConditionStatus::False, REASON_AS_EXPECTED, String::new()),
            ),
        )
    }

    /// The controller changed a watched resource and expects to be re-invoked
    /// by the resulting event. Not a substitute for "retry later".
    pub fn progressing(&self, message: impl Into<String>) -> ReconcileOutcome {
        let message = message.into();
        let conditions = ConditionSet::new(
            &self.controller,
            (ConditionStatus::True, REASON_PROGRESSING, message.clone()),
            (ConditionStatus::False, REASON_AS_EXPECTED, String::new()),
        );
        self.build(OutcomeKind::Progressing, message, None, conditions)
    }

    /// Blocked on an external condition. No timer is scheduled: a watch on
    /// the external resource must fire when it resolves.
    pub fn waiting_on_external(&self, description: impl AsRef<str>) -> ReconcileOutcome {
        let message = format!("Waiting on {}", description.as_ref());
        let conditions = ConditionSet::new(
            &self.controller,
            (ConditionStatus::True, REASON_WAITING_ON_EXTERNAL, message.clone()),
            (ConditionStatus::False, REASON_AS_EXPECTED, String::new()),
        );
        self.build(OutcomeKind::WaitingOnExternal, message, None, conditions)
    }

    /// A failed reconcile.
    ///
    /// Terminal errors are delegated to [`Self::non_retryable_error`];
    /// anything else is reported as ephemeral and retried with backoff.
    pub fn error(&self, err: Error) -> ReconcileOutcome {
        if err.is_terminal() {
            return self.non_retryable_error(err);
        }
        let message = err.to_string();
        let conditions = ConditionSet::new(
            &self.controller,
            (ConditionStatus::True, REASON_EPHEMERAL_ERROR, message.clone()),
            (ConditionStatus::False, REASON_PROGRESSING, String::new()),
        );
        self.build(OutcomeKind::RetryableError, message, Some(err), conditions)
    }

    /// A failure that needs intervention. The error is wrapped as terminal
    /// if it is not already.
    pub fn non_retryable_error(&self, err: Error) -> ReconcileOutcome {
        let err = Error::terminal(err);
        let message = match &err {
            Error::Terminal { source } => source.to_string(),
            other => other.to_string(),
        };
        let conditions = ConditionSet::new(
            &self.controller,
            (
                ConditionStatus::False,
                REASON_NON_RETRYABLE_ERROR,
                message.clone(),
            ),
            (
                ConditionStatus::True,
                REASON_NON_RETRYABLE_ERROR,
                message.clone(),
            ),
        );
        self.build(OutcomeKind::NonRetryableError, message, Some(err), conditions)
    }

    fn build(
        &self,
        kind: OutcomeKind,
        message: String,
        error: Option<Error>,
        conditions: ConditionSet,
    ) -> ReconcileOutcome {
        ReconcileOutcome {
            controller: self.controller.clone(),
            kind,
            message,
            error,
            requeue_after: None,
            conditions,
        }
    }
}

/// Result of one reconcile: conditions to report plus a scheduling directive
#[derive(Debug)]
pub struct ReconcileOutcome {
    controller: String,
    kind: OutcomeKind,
    message: String,
    error: Option<Error>,
    requeue_after: Option<Duration>,
    conditions: ConditionSet,
}

impl ReconcileOutcome {
    /// Request an explicit requeue. Ignored for error outcomes.
    pub fn with_requeue_after(mut self, delay: Duration) -> Self {
        match self.kind {
            OutcomeKind::RetryableError | OutcomeKind::NonRetryableError => {
                debug!(
                    controller = %self.controller,
                    delay_ms = delay.as_millis(),
                    "Ignoring explicit requeue on error outcome"
                );
            }
            _ => self.requeue_after = Some(delay),
        }
        self
    }

    /// Controller qualifier
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Which outcome this is
    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying error, present for error outcomes only
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Conditions to report
    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    /// Scheduling directive
    pub fn schedule(&self) -> Schedule {
        match self.kind {
            OutcomeKind::RetryableError => Schedule::Backoff,
            OutcomeKind::NonRetryableError => Schedule::Stop,
            _ => self
                .requeue_after
                .map(Schedule::RequeueAfter)
                .unwrap_or(Schedule::AwaitChange),
        }
    }

    /// Convert into what a kube-rs reconcile function returns
    pub fn into_result(self) -> Result<Action, Error> {
        match self.schedule() {
            Schedule::AwaitChange => Ok(Action::await_change()),
            Schedule::RequeueAfter(delay) => Ok(Action::requeue(delay)),
            Schedule::Backoff | Schedule::Stop => Err(self.error.unwrap_or_else(|| {
                Error::internal_with_context("outcome", self.message.clone())
            })),
        }
    }

    /// Persist the conditions, then convert into a reconcile result.
    ///
    /// A failed write is always returned as an error so the scheduler retries
    /// until status converges, even when the reconcile itself succeeded. An
    /// error from the reconcile is aggregated with the write error, and the
    /// aggregate is retryable regardless of the original error.
    pub async fn finish(self, writer: &ConditionWriter) -> Result<Action, Error> {
        let written = writer.write(&self.conditions).await;
        let controller = self.controller.clone();
        let result = self.into_result();

        match written {
            Ok(_) => result,
            Err(write_err) => {
                warn!(
                    controller = %controller,
                    error = %write_err,
                    "Failed to write ClusterOperator conditions"
                );
                match result {
                    Ok(_) => Err(write_err),
                    Err(original) => Err(Error::aggregate(vec![original, write_err])),
                }
            }
        }
    }
}
