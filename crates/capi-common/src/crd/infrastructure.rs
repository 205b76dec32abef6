//! Infrastructure resource (config.openshift.io/v1), read-only
//!
//! Only the platform type is consumed; everything else is left to the
//! cluster's own installer.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::platform::Platform;
use crate::Error;

/// Name of the Infrastructure singleton
pub const INFRASTRUCTURE_SINGLETON: &str = "cluster";

/// Cluster-wide infrastructure configuration
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "Infrastructure",
    status = "InfrastructureStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {}

/// Observed infrastructure state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    /// Deprecated platform type, used when platformStatus is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Platform-specific status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_status: Option<PlatformStatus>,
}

/// Platform status block
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PlatformStatus {
    /// Platform type string (e.g., "AWS", "VSphere")
    #[serde(rename = "type", default)]
    pub type_: String,
}

impl Infrastructure {
    /// Resolve the platform this cluster runs on.
    ///
    /// Returns `Ok(None)` while the installer has not reported a platform yet.
    pub fn platform(&self) -> Result<Option<Platform>, Error> {
        let Some(status) = self.status.as_ref() else {
            return Ok(None);
        };
        let reported = status
            .platform_status
            .as_ref()
            .map(|ps| ps.type_.as_str())
            .filter(|t| !t.is_empty())
            .or(status.platform.as_deref())
            .filter(|t| !t.is_empty());

        reported.map(str::parse).transpose()
    }
}
