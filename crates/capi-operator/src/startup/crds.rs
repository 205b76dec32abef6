//! CRD installation
//!
//! The operator owns only the ClusterAPI CRD. ClusterOperator and
//! Infrastructure belong to the platform and are never installed here.

use capi_common::crd::ClusterAPI;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

/// Name of the ClusterAPI CRD
pub const CLUSTER_API_CRD_NAME: &str = "clusterapis.operator.openshift.io";

const CRD_FIELD_MANAGER: &str = "capi-operator";

/// Install or update the CRDs this operator owns using server-side apply
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(CRD_FIELD_MANAGER).force();

    tracing::info!(crd = CLUSTER_API_CRD_NAME, "Installing CRD...");
    crds.patch(
        CLUSTER_API_CRD_NAME,
        &params,
        &Patch::Apply(&ClusterAPI::crd()),
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", CLUSTER_API_CRD_NAME, e))?;

    tracing::info!("CRDs installed/updated");
    Ok(())
}
