//! Reconcile outcomes and ClusterOperator status reporting
//!
//! Controllers end each reconcile with a [`ReconcileOutcome`] built by an
//! [`OutcomeGenerator`]. [`ReconcileOutcome::finish`] writes the controller's
//! `<Controller>Progressing`/`<Controller>Degraded` conditions through a
//! [`ConditionWriter`] and returns what kube-rs expects from a reconcile
//! function. The error policy side is handled by [`ErrorBackoff`].

#![deny(missing_docs)]

pub mod backoff;
pub mod conditions;
pub mod outcome;
pub mod store;
pub mod writer;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backoff::ErrorBackoff;
pub use conditions::{merge_conditions, ConditionSet};
pub use outcome::{OutcomeGenerator, OutcomeKind, ReconcileOutcome, Schedule};
pub use store::{ConditionStore, KubeConditionStore};
pub use writer::{cancellable, ConditionWriter};
