//! Condition writer
//!
//! Writes a controller's conditions to the shared ClusterOperator with
//! server-side apply. Each controller uses its own field manager, so the apply
//! body carries only that controller's conditions and ownership of other
//! condition types is never touched.

use std::future::Future;
use std::sync::Arc;

use capi_common::crd::{ClusterOperator, ClusterOperatorStatus, Condition, OperandVersion};
use capi_common::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::conditions::{merge_conditions, ConditionSet};
use crate::store::ConditionStore;

/// Writes conditions for one controller to one ClusterOperator
#[derive(Clone)]
pub struct ConditionWriter {
    store: Arc<dyn ConditionStore>,
    cluster_operator: String,
    field_manager: String,
    shutdown: CancellationToken,
}

impl ConditionWriter {
    /// Create a writer applying as `field_manager` to the named ClusterOperator
    pub fn new(
        store: Arc<dyn ConditionStore>,
        cluster_operator: impl Into<String>,
        field_manager: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cluster_operator: cluster_operator.into(),
            field_manager: field_manager.into(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Abandon in-flight writes when `token` is cancelled
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Token that abandons in-flight writes
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Write the pair of per-controller conditions.
    ///
    /// Returns `Ok(true)` if an apply was issued, `Ok(false)` if everything
    /// was already persisted with the same status, reason and message.
    pub async fn write(&self, set: &ConditionSet) -> Result<bool, Error> {
        self.write_status(set.to_vec(), Vec::new()).await
    }

    /// Write arbitrary conditions plus optional versions.
    ///
    /// Versions are compared as a whole and only included in the apply when
    /// non-empty, so a writer that never reports versions never claims them.
    pub async fn write_status(
        &self,
        mut conditions: Vec<Condition>,
        versions: Vec<OperandVersion>,
    ) -> Result<bool, Error> {
        let current = self.fetch().await?;

        let existing = current.conditions();
        let mut needs_write = merge_conditions(&mut conditions, existing);

        if !versions.is_empty() {
            let persisted = current
                .status
                .as_ref()
                .map(|s| s.versions.as_slice())
                .unwrap_or_default();
            needs_write |= !same_versions(persisted, &versions);
        }

        if !needs_write {
            debug!(
                cluster_operator = %self.cluster_operator,
                field_manager = %self.field_manager,
                "Conditions unchanged, skipping write"
            );
            return Ok(false);
        }

        let status = ClusterOperatorStatus {
            conditions,
            versions,
            related_objects: Vec::new(),
        };

        cancellable(
            &self.shutdown,
            "apply ClusterOperator status",
            self.store
                .apply_status(&self.cluster_operator, &self.field_manager, &status),
        )
        .await?;

        info!(
            cluster_operator = %self.cluster_operator,
            field_manager = %self.field_manager,
            conditions = ?status.conditions.iter().map(|c| (&c.type_, c.status)).collect::<Vec<_>>(),
            "Updated ClusterOperator conditions"
        );
        Ok(true)
    }

    async fn fetch(&self) -> Result<ClusterOperator, Error> {
        let found = cancellable(
            &self.shutdown,
            "get ClusterOperator",
            self.store.get_cluster_operator(&self.cluster_operator),
        )
        .await?;

        found.ok_or_else(|| {
            Error::internal_with_context(
                "writer",
                format!("ClusterOperator {} not found", self.cluster_operator),
            )
        })
    }
}

/// Run a persistence step, giving up with [`Error::Cancelled`] once `token` fires.
///
/// Cancellation is checked before `fut` is first polled, so a step started
/// after shutdown never reaches the API server.
pub async fn cancellable<T>(
    token: &CancellationToken,
    operation: &str,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::cancelled(operation)),
        result = fut => result,
    }
}

fn same_versions(persisted: &[OperandVersion], desired: &[OperandVersion]) -> bool {
    persisted.len() == desired.len() && desired.iter().all(|v| persisted.contains(v))
}
