//! Access to the ClusterOperator the controllers report through

use async_trait::async_trait;
use capi_common::crd::{ClusterOperator, ClusterOperatorStatus};
use capi_common::kube_utils::{apply_cluster_status, get_cluster_object};
use capi_common::Error;
use kube::Client;

#[cfg(test)]
use mockall::automock;

/// Trait abstracting ClusterOperator reads and status applies
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConditionStore: Send + Sync {
    /// Get the ClusterOperator by name, `None` if it does not exist
    async fn get_cluster_operator(&self, name: &str) -> Result<Option<ClusterOperator>, Error>;

    /// Server-side apply `status` under `field_manager`, forcing ownership of
    /// exactly the fields present in `status`
    async fn apply_status(
        &self,
        name: &str,
        field_manager: &str,
        status: &ClusterOperatorStatus,
    ) -> Result<(), Error>;
}

/// [`ConditionStore`] backed by the Kubernetes API
pub struct KubeConditionStore {
    client: Client,
}

impl KubeConditionStore {
    /// Create a store using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConditionStore for KubeConditionStore {
    async fn get_cluster_operator(&self, name: &str) -> Result<Option<ClusterOperator>, Error> {
        get_cluster_object::<ClusterOperator>(&self.client, name).await
    }

    async fn apply_status(
        &self,
        name: &str,
        field_manager: &str,
        status: &ClusterOperatorStatus,
    ) -> Result<(), Error> {
        let status = serde_json::to_value(status)
            .map_err(|e| Error::serialization_for_kind("ClusterOperator", e.to_string()))?;
        apply_cluster_status::<ClusterOperator>(&self.client, name, status, field_manager).await
    }
}
