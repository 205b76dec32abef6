//! ClusterOperator resource (config.openshift.io/v1)
//!
//! The ClusterOperator is owned by the cluster version operator; this crate
//! only reads it and applies the status fields each controller owns. Its CRD
//! is never installed from here.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::Condition;

/// Top-level condition types reported on the ClusterOperator
pub const CONDITION_AVAILABLE: &str = "Available";
/// Aggregate Progressing condition type
pub const CONDITION_PROGRESSING: &str = "Progressing";
/// Aggregate Degraded condition type
pub const CONDITION_DEGRADED: &str = "Degraded";
/// Aggregate Upgradeable condition type
pub const CONDITION_UPGRADEABLE: &str = "Upgradeable";

/// ClusterOperator reports the health of one cluster operator.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "ClusterOperator",
    status = "ClusterOperatorStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOperatorSpec {}

/// Observed state of a ClusterOperator
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOperatorStatus {
    /// Conditions, keyed by type. Each controller owns a disjoint set of types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Versions of the operator and its operands
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<OperandVersion>,

    /// Objects useful when debugging this operator
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_objects: Vec<RelatedObject>,
}

/// Name/version pair reported in `status.versions`
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct OperandVersion {
    /// Operand name (e.g., "operator")
    pub name: String,
    /// Version string, normally the release version
    pub version: String,
}

impl OperandVersion {
    /// Create a version entry
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Reference to an object related to this operator
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct RelatedObject {
    /// API group of the object ("" for core)
    pub group: String,
    /// Plural resource name
    pub resource: String,
    /// Object name
    pub name: String,
    /// Namespace, empty for cluster-scoped objects
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl ClusterOperator {
    /// Conditions currently persisted on this object
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}
