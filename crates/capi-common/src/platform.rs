//! Platforms the operator knows about
//!
//! Mirrors the platform types the Infrastructure resource can report. Each
//! variant maps to at most one CAPI infrastructure provider; platforms without
//! one still receive the components that are not scoped to any platform.

use std::str::FromStr;

use crate::Error;

/// Cluster platform, as reported by the Infrastructure resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    /// Amazon Web Services
    Aws,
    /// Microsoft Azure
    Azure,
    /// Google Cloud
    Gcp,
    /// OpenStack
    OpenStack,
    /// VMware vSphere
    VSphere,
    /// IBM Power Virtual Server
    PowerVs,
    /// IBM Cloud VPC
    IbmCloud,
    /// Nutanix AHV
    Nutanix,
    /// Bare metal hosts
    BareMetal,
    /// libvirt, development clusters only
    Libvirt,
    /// oVirt / Red Hat Virtualization
    Ovirt,
    /// Alibaba Cloud
    AlibabaCloud,
    /// Equinix Metal
    EquinixMetal,
    /// KubeVirt hosted control planes
    Kubevirt,
    /// Externally managed infrastructure
    External,
    /// No platform integration
    None,
}

impl Platform {
    /// Every known platform
    pub const ALL: [Platform; 16] = [
        Platform::Aws,
        Platform::Azure,
        Platform::Gcp,
        Platform::OpenStack,
        Platform::VSphere,
        Platform::PowerVs,
        Platform::IbmCloud,
        Platform::Nutanix,
        Platform::BareMetal,
        Platform::Libvirt,
        Platform::Ovirt,
        Platform::AlibabaCloud,
        Platform::EquinixMetal,
        Platform::Kubevirt,
        Platform::External,
        Platform::None,
    ];

    /// Platform string as used by the Infrastructure resource
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Aws => "AWS",
            Platform::Azure => "Azure",
            Platform::Gcp => "GCP",
            Platform::OpenStack => "OpenStack",
            Platform::VSphere => "VSphere",
            Platform::PowerVs => "PowerVS",
            Platform::IbmCloud => "IBMCloud",
            Platform::Nutanix => "Nutanix",
            Platform::BareMetal => "BareMetal",
            Platform::Libvirt => "Libvirt",
            Platform::Ovirt => "oVirt",
            Platform::AlibabaCloud => "AlibabaCloud",
            Platform::EquinixMetal => "EquinixMetal",
            Platform::Kubevirt => "KubeVirt",
            Platform::External => "External",
            Platform::None => "None",
        }
    }

    /// CAPI infrastructure provider name for this platform, if one exists
    pub fn infrastructure_provider(&self) -> Option<&'static str> {
        match self {
            Platform::Aws => Some("aws"),
            Platform::Azure => Some("azure"),
            Platform::Gcp => Some("gcp"),
            Platform::OpenStack => Some("openstack"),
            Platform::VSphere => Some("vsphere"),
            Platform::PowerVs | Platform::IbmCloud => Some("ibmcloud"),
            Platform::Nutanix => Some("nutanix"),
            Platform::BareMetal => Some("metal3"),
            Platform::Libvirt
            | Platform::Ovirt
            | Platform::AlibabaCloud
            | Platform::EquinixMetal
            | Platform::Kubevirt
            | Platform::External
            | Platform::None => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::validation_for_field(
                    "infrastructure",
                    "status.platformStatus.type",
                    format!("unsupported platform '{}'", s),
                )
            })
    }
}
