//! ClusterOperator aggregation controller
//!
//! Each controller reports its own `<Controller>Progressing` and
//! `<Controller>Degraded` conditions. This controller folds them into the
//! top-level conditions the cluster version operator reads, and reports the
//! operator version once nothing is progressing or degraded.

use std::sync::Arc;

use capi_common::crd::{
    ClusterOperator, Condition, ConditionStatus, OperandVersion, CONDITION_AVAILABLE,
    CONDITION_DEGRADED, CONDITION_PROGRESSING, CONDITION_UPGRADEABLE,
};
use capi_common::{Error, OPERATOR_VERSION_NAME};
use capi_status::conditions::{DEGRADED_SUFFIX, PROGRESSING_SUFFIX, REASON_AS_EXPECTED};
use capi_status::{ConditionWriter, ErrorBackoff};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, error};

/// Field manager owning the top-level conditions and versions
pub const FIELD_MANAGER: &str = "capi-cluster-operator";

/// Shared state for the aggregation controller
pub struct ClusterOperatorContext {
    /// Writes the top-level conditions
    pub writer: ConditionWriter,
    /// Version reported once the operator has settled
    pub release_version: String,
    /// Failure tracking for the error policy
    pub backoff: ErrorBackoff,
}

impl ClusterOperatorContext {
    /// Create a context writing through `writer`
    pub fn new(writer: ConditionWriter, release_version: impl Into<String>) -> Self {
        Self {
            writer,
            release_version: release_version.into(),
            backoff: ErrorBackoff::default(),
        }
    }
}

/// Aggregated top-level status
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatedStatus {
    /// Available, Progressing, Degraded, Upgradeable
    pub conditions: Vec<Condition>,
    /// Whether any controller is progressing
    pub progressing: bool,
    /// Whether any controller is degraded
    pub degraded: bool,
}

/// Fold per-controller conditions into the top-level ones
pub fn aggregate_conditions(conditions: &[Condition]) -> AggregatedStatus {
    let progressing = summarize(conditions, CONDITION_PROGRESSING, PROGRESSING_SUFFIX);
    let degraded = summarize(conditions, CONDITION_DEGRADED, DEGRADED_SUFFIX);

    AggregatedStatus {
        progressing: progressing.status == ConditionStatus::True,
        degraded: degraded.status == ConditionStatus::True,
        conditions: vec![
            Condition::new(
                CONDITION_AVAILABLE,
                ConditionStatus::True,
                REASON_AS_EXPECTED,
                "",
            ),
            progressing,
            degraded,
            Condition::new(
                CONDITION_UPGRADEABLE,
                ConditionStatus::True,
                REASON_AS_EXPECTED,
                "",
            ),
        ],
    }
}

/// Build one top-level condition from every `*<suffix>` condition that is True
fn summarize(conditions: &[Condition], top_level: &str, suffix: &str) -> Condition {
    let mut active: Vec<&Condition> = conditions
        .iter()
        .filter(|c| c.type_ != top_level && c.type_.ends_with(suffix))
        .filter(|c| c.status == ConditionStatus::True)
        .collect();
    active.sort_by(|a, b| a.type_.cmp(&b.type_));

    let Some(first) = active.first() else {
        return Condition::new(top_level, ConditionStatus::False, REASON_AS_EXPECTED, "");
    };

    let message = active
        .iter()
        .map(|c| {
            let controller = c.type_.trim_end_matches(suffix);
            if c.message.is_empty() {
                format!("{}: {}", controller, c.reason)
            } else {
                format!("{}: {}", controller, c.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    let reason = if active.len() == 1 {
        format!("{}{}", first.type_.trim_end_matches(suffix), first.reason)
    } else {
        format!("Multiple{}", suffix)
    };

    Condition::new(top_level, ConditionStatus::True, reason, message)
}

/// Versions to apply: the release once settled, otherwise whatever is persisted
fn versions_for(
    co: &ClusterOperator,
    settled: bool,
    release_version: &str,
) -> Vec<OperandVersion> {
    if settled {
        return vec![OperandVersion::new(OPERATOR_VERSION_NAME, release_version)];
    }
    co.status
        .as_ref()
        .map(|s| s.versions.clone())
        .unwrap_or_default()
}

/// Reconcile the top-level ClusterOperator status
pub async fn reconcile(
    co: Arc<ClusterOperator>,
    ctx: Arc<ClusterOperatorContext>,
) -> Result<Action, Error> {
    let name = co.name_any();
    let aggregated = aggregate_conditions(co.conditions());
    let settled = !aggregated.progressing && !aggregated.degraded;
    let versions = versions_for(&co, settled, &ctx.release_version);

    debug!(
        cluster_operator = %name,
        progressing = aggregated.progressing,
        degraded = aggregated.degraded,
        "Aggregated controller conditions"
    );

    ctx.writer
        .write_status(aggregated.conditions, versions)
        .await?;
    ctx.backoff.reset(&name);
    Ok(Action::await_change())
}

/// Error policy for the aggregation controller
pub fn error_policy(
    co: Arc<ClusterOperator>,
    error: &Error,
    ctx: Arc<ClusterOperatorContext>,
) -> Action {
    let name = co.name_any();
    error!(?error, cluster_operator = %name, "ClusterOperator aggregation failed");
    ctx.backoff.action_for(&name, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capi_common::crd::{find_condition, ClusterOperatorSpec, ClusterOperatorStatus};
    use capi_status::testing::InMemoryConditionStore;

    const RELEASE: &str = "4.18.0";

    fn cond(type_: &str, status: ConditionStatus, reason: &str, message: &str) -> Condition {
        Condition::new(type_, status, reason, message)
    }

    fn healthy() -> Vec<Condition> {
        vec![
            cond("InstallerRevisionProgressing", ConditionStatus::False, "AsExpected", ""),
            cond("InstallerRevisionDegraded", ConditionStatus::False, "AsExpected", ""),
        ]
    }

    fn top(status: &AggregatedStatus, type_: &str) -> Condition {
        find_condition(&status.conditions, type_)
            .cloned()
            .expect("top-level condition present")
    }

    #[test]
    fn healthy_controllers_aggregate_to_settled() {
        let status = aggregate_conditions(&healthy());
        assert!(!status.progressing);
        assert!(!status.degraded);
        assert_eq!(top(&status, CONDITION_AVAILABLE).status, ConditionStatus::True);
        assert_eq!(top(&status, CONDITION_UPGRADEABLE).status, ConditionStatus::True);
        assert_eq!(top(&status, CONDITION_PROGRESSING).status, ConditionStatus::False);
        assert_eq!(top(&status, CONDITION_DEGRADED).reason, REASON_AS_EXPECTED);
    }

    #[test]
    fn single_progressing_controller_names_itself() {
        let mut conditions = healthy();
        conditions[0] = cond(
            "InstallerRevisionProgressing",
            ConditionStatus::True,
            "WaitingOnExternal",
            "Waiting on revision 4.18.0-1-abcd to be installed",
        );

        let status = aggregate_conditions(&conditions);
        let progressing = top(&status, CONDITION_PROGRESSING);
        assert!(status.progressing);
        assert_eq!(progressing.reason, "InstallerRevisionWaitingOnExternal");
        assert_eq!(
            progressing.message,
            "InstallerRevision: Waiting on revision 4.18.0-1-abcd to be installed"
        );
    }

    #[test]
    fn multiple_degraded_controllers_are_listed() {
        let conditions = vec![
            cond("SyncDegraded", ConditionStatus::True, "NonRetryableError", "bad input"),
            cond("InstallerRevisionDegraded", ConditionStatus::True, "NonRetryableError", ""),
            cond("OtherDegraded", ConditionStatus::False, "AsExpected", ""),
        ];
        let status = aggregate_conditions(&conditions);
        let degraded = top(&status, CONDITION_DEGRADED);
        assert!(status.degraded);
        assert_eq!(degraded.reason, "MultipleDegraded");
        assert_eq!(
            degraded.message,
            "InstallerRevision: NonRetryableError; Sync: bad input"
        );
    }

    #[test]
    fn top_level_conditions_are_not_counted() {
        let conditions = vec![cond(CONDITION_PROGRESSING, ConditionStatus::True, "Stale", "")];
        assert!(!aggregate_conditions(&conditions).progressing);
    }

    fn store_with(
        conditions: Vec<Condition>,
        versions: Vec<OperandVersion>,
    ) -> Arc<InMemoryConditionStore> {
        let store = Arc::new(InMemoryConditionStore::default());
        let mut co = ClusterOperator::new("cluster-api", ClusterOperatorSpec::default());
        co.status = Some(ClusterOperatorStatus {
            conditions,
            versions,
            related_objects: Vec::new(),
        });
        store.set(co);
        store
    }

    fn context(store: Arc<InMemoryConditionStore>) -> Arc<ClusterOperatorContext> {
        let writer = ConditionWriter::new(store, "cluster-api", FIELD_MANAGER);
        Arc::new(ClusterOperatorContext::new(writer, RELEASE))
    }

    async fn reconcile_stored(store: &Arc<InMemoryConditionStore>) -> Result<Action, Error> {
        let mut co = ClusterOperator::new("cluster-api", ClusterOperatorSpec::default());
        co.status = store.status();
        reconcile(Arc::new(co), context(store.clone())).await
    }

    #[tokio::test]
    async fn settled_operator_reports_version() {
        let store = store_with(healthy(), vec![]);
        reconcile_stored(&store).await.unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.versions, vec![OperandVersion::new("operator", RELEASE)]);
        let applies = store.applies();
        assert_eq!(applies.len(), 1);
        assert_eq!(applies[0].0, FIELD_MANAGER);
        // Only top-level types are applied by this field manager
        assert!(applies[0]
            .1
            .conditions
            .iter()
            .all(|c| !c.type_.starts_with("InstallerRevision")));
    }

    #[tokio::test]
    async fn progressing_operator_keeps_previous_version() {
        let mut conditions = healthy();
        conditions[0].status = ConditionStatus::True;
        conditions[0].reason = "Progressing".to_string();
        let store = store_with(conditions, vec![OperandVersion::new("operator", "4.17.0")]);

        reconcile_stored(&store).await.unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.versions, vec![OperandVersion::new("operator", "4.17.0")]);
        let progressing = find_condition(&status.conditions, CONDITION_PROGRESSING).unwrap();
        assert_eq!(progressing.status, ConditionStatus::True);
    }

    #[tokio::test]
    async fn second_reconcile_is_a_no_op() {
        let store = store_with(healthy(), vec![]);
        reconcile_stored(&store).await.unwrap();
        reconcile_stored(&store).await.unwrap();
        assert_eq!(store.applies().len(), 1);
    }

    #[tokio::test]
    async fn missing_cluster_operator_is_retried() {
        let store = Arc::new(InMemoryConditionStore::default());
        let ctx = context(store);
        let co = Arc::new(ClusterOperator::new(
            "cluster-api",
            ClusterOperatorSpec::default(),
        ));

        let err = reconcile(co.clone(), ctx.clone()).await.unwrap_err();
        assert!(!err.is_terminal());
        assert_eq!(
            error_policy(co, &err, ctx),
            Action::requeue(std::time::Duration::from_secs(5))
        );
    }
}
