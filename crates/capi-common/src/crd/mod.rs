//! Kubernetes resource types read and written by the operator

mod cluster_api;
mod cluster_operator;
mod infrastructure;
mod types;

pub use cluster_api::{
    revision_name, ClusterAPI, ClusterAPISpec, ClusterAPIStatus, InstallerComponent,
    InstallerRevision, CLUSTER_API_SINGLETON,
};
pub use cluster_operator::{
    ClusterOperator, ClusterOperatorSpec, ClusterOperatorStatus, OperandVersion, RelatedObject,
    CONDITION_AVAILABLE, CONDITION_DEGRADED, CONDITION_PROGRESSING, CONDITION_UPGRADEABLE,
};
pub use infrastructure::{
    Infrastructure, InfrastructureSpec, InfrastructureStatus, PlatformStatus,
    INFRASTRUCTURE_SINGLETON,
};
pub use types::{find_condition, Condition, ConditionStatus};
