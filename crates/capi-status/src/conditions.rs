//! Per-controller condition pairs and the timestamp-preserving merge
//!
//! Every controller reports exactly two conditions on the shared
//! ClusterOperator, named `<Controller>Progressing` and `<Controller>Degraded`.

use capi_common::crd::{find_condition, Condition, ConditionStatus};
use chrono::{DateTime, Utc};

/// Suffix of the per-controller Progressing condition type
pub const PROGRESSING_SUFFIX: &str = "Progressing";
/// Suffix of the per-controller Degraded condition type
pub const DEGRADED_SUFFIX: &str = "Degraded";

/// Reason when the controller has nothing left to do
pub const REASON_AS_EXPECTED: &str = "AsExpected";
/// Reason while the controller is actively changing state
pub const REASON_PROGRESSING: &str = "Progressing";
/// Reason while the controller waits for something it does not own
pub const REASON_WAITING_ON_EXTERNAL: &str = "WaitingOnExternal";
/// Reason after an error that will be retried
pub const REASON_EPHEMERAL_ERROR: &str = "EphemeralError";
/// Reason after an error that needs human intervention
pub const REASON_NON_RETRYABLE_ERROR: &str = "NonRetryableError";

/// Build a condition type namespaced by the controller qualifier
pub fn condition_type(controller: &str, suffix: &str) -> String {
    format!("{}{}", controller, suffix)
}

/// The Progressing/Degraded pair produced by one reconcile
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionSet {
    /// `<Controller>Progressing`
    pub progressing: Condition,
    /// `<Controller>Degraded`
    pub degraded: Condition,
}

impl ConditionSet {
    /// Build both conditions for `controller`
    pub fn new(
        controller: &str,
        progressing: (ConditionStatus, &str, String),
        degraded: (ConditionStatus, &str, String),
    ) -> Self {
        let (p_status, p_reason, p_message) = progressing;
        let (d_status, d_reason, d_message) = degraded;
        Self {
            progressing: Condition::new(
                condition_type(controller, PROGRESSING_SUFFIX),
                p_status,
                p_reason,
                p_message,
            ),
            degraded: Condition::new(
                condition_type(controller, DEGRADED_SUFFIX),
                d_status,
                d_reason,
                d_message,
            ),
        }
    }

    /// Both conditions, Progressing first
    pub fn to_vec(&self) -> Vec<Condition> {
        vec![self.progressing.clone(), self.degraded.clone()]
    }
}

/// Merge candidate conditions against the persisted ones, using the current time.
///
/// See [`merge_conditions_at`].
pub fn merge_conditions(candidates: &mut [Condition], existing: &[Condition]) -> bool {
    merge_conditions_at(candidates, existing, Utc::now())
}

/// Merge candidate conditions against the persisted ones.
///
/// Only the candidates' `last_transition_time` is modified; `existing` is
/// read-only. A candidate whose status, reason and message all match the
/// persisted condition of the same type keeps the persisted transition time.
/// Any other candidate is stamped with `now`.
///
/// Returns `true` when at least one candidate differs from what is persisted
/// and a write is needed.
///
/// # Panics
///
/// Panics if a candidate has an empty type. Candidates are always built by
/// [`ConditionSet::new`] or the aggregation code, so this is a programming
/// error and cannot be triggered by cluster state.
pub fn merge_conditions_at(
    candidates: &mut [Condition],
    existing: &[Condition],
    now: DateTime<Utc>,
) -> bool {
    let mut needs_write = false;

    for candidate in candidates.iter_mut() {
        assert!(
            !candidate.type_.is_empty(),
            "condition type must be set before merging"
        );

        match find_condition(existing, &candidate.type_) {
            Some(previous) if previous.same_state(candidate) => {
                candidate.last_transition_time = previous.last_transition_time;
            }
            _ => {
                candidate.last_transition_time = now;
                needs_write = true;
            }
        }
    }

    needs_write
}
