//! ClusterAPI singleton resource (operator.openshift.io/v1alpha1)
//!
//! Holds the installer revision history. The revision controller owns
//! `status.revisions` and `status.desiredRevision`; `status.currentRevision`
//! is advanced by the installer once a revision has been rolled out.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the ClusterAPI singleton
pub const CLUSTER_API_SINGLETON: &str = "cluster";

/// ClusterAPI configures Cluster API provider installation for the cluster.
///
/// Example:
/// ```yaml
/// apiVersion: operator.openshift.io/v1alpha1
/// kind: ClusterAPI
/// metadata:
///   name: cluster
/// spec: {}
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "operator.openshift.io",
    version = "v1alpha1",
    kind = "ClusterAPI",
    plural = "clusterapis",
    status = "ClusterAPIStatus",
    printcolumn = r#"{"name":"Desired","type":"string","jsonPath":".status.desiredRevision"}"#,
    printcolumn = r#"{"name":"Current","type":"string","jsonPath":".status.currentRevision"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAPISpec {}

/// Observed state of the ClusterAPI singleton
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAPIStatus {
    /// Name of the revision the operator wants installed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_revision: Option<String>,

    /// Name of the revision that is actually installed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_revision: Option<String>,

    /// Revision history, newest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revisions: Vec<InstallerRevision>,
}

/// Persisted form of a rendered set of provider components
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallerRevision {
    /// Unique revision name
    pub name: String,

    /// Revision index, starting at 1 and strictly increasing
    pub revision: i64,

    /// Aggregate content identifier of all components
    #[serde(rename = "contentID")]
    pub content_id: String,

    /// Release version that created this revision
    pub release_version: String,

    /// Components in install order
    #[serde(default)]
    pub components: Vec<InstallerComponent>,
}

/// One installable provider component of a revision
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallerComponent {
    /// Component name (e.g., "cluster-api", "infrastructure-aws")
    pub name: String,

    /// Image reference carrying the component manifests
    pub image: String,

    /// Manifest profile within the image
    pub profile: String,

    /// Content identifier of the component manifests
    #[serde(rename = "contentID")]
    pub content_id: String,
}

/// Build the name of a revision from its release, index and content
pub fn revision_name(release_version: &str, revision: i64, content_id: &str) -> String {
    let short: String = content_id.chars().take(8).collect();
    format!("{}-{}-{}", release_version, revision, short)
}
