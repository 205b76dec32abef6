//! Provider component loading
//!
//! Each provider is a directory holding `metadata.yaml` and the manifests the
//! installer applies:
//!
//! ```text
//! <providers-dir>/
//!   cluster-api/
//!     metadata.yaml
//!     manifests.yaml
//!   infrastructure-aws/
//!     metadata.yaml
//!     manifests.yaml
//! ```
//!
//! The component content id is the SHA-256 of `manifests.yaml`.

use std::fs;
use std::path::Path;

use capi_common::digest::sha256_hex;
use capi_common::{Error, Platform};
use serde::Deserialize;
use tracing::{debug, info};

use crate::component::{ProviderComponent, DEFAULT_PROFILE};

/// Metadata file name inside each provider directory
pub const METADATA_FILE: &str = "metadata.yaml";
/// Manifests file name inside each provider directory
pub const MANIFESTS_FILE: &str = "manifests.yaml";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ProviderMetadata {
    name: String,
    image: String,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    install_order: i32,
    #[serde(default)]
    platform: Option<String>,
}

/// Load every provider under `dir`, sorted by directory name.
///
/// Files at the top level are ignored. Any unreadable or malformed provider
/// fails the whole load with a validation error.
pub fn load_provider_components(dir: &Path) -> Result<Vec<ProviderComponent>, Error> {
    let entries = fs::read_dir(dir).map_err(|e| {
        Error::validation_for(
            dir.display().to_string(),
            format!("failed to read providers directory: {}", e),
        )
    })?;

    let mut provider_dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::validation_for(dir.display().to_string(), format!("failed to list: {}", e))
        })?;
        if entry.path().is_dir() {
            provider_dirs.push(entry.path());
        }
    }
    provider_dirs.sort();

    let mut components = Vec::with_capacity(provider_dirs.len());
    for path in provider_dirs {
        let component = load_provider(&path)?;
        debug!(
            provider = %component.name,
            scope = %component.scope(),
            install_order = component.install_order,
            content_id = %component.content_id,
            "Loaded provider"
        );
        components.push(component);
    }

    info!(dir = %dir.display(), count = components.len(), "Loaded provider components");
    Ok(components)
}

/// Load a single provider directory
pub fn load_provider(path: &Path) -> Result<ProviderComponent, Error> {
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let raw_metadata = fs::read_to_string(path.join(METADATA_FILE)).map_err(|e| {
        Error::validation_for_field(&label, METADATA_FILE, format!("unreadable: {}", e))
    })?;
    let metadata: ProviderMetadata = serde_yaml::from_str(&raw_metadata).map_err(|e| {
        Error::validation_for_field(&label, METADATA_FILE, format!("invalid metadata: {}", e))
    })?;

    let manifests = fs::read(path.join(MANIFESTS_FILE)).map_err(|e| {
        Error::validation_for_field(&label, MANIFESTS_FILE, format!("unreadable: {}", e))
    })?;

    let platform = match metadata.platform.as_deref() {
        None | Some("") => None,
        Some(p) => Some(p.parse::<Platform>().map_err(|_| {
            Error::validation_for_field(
                &metadata.name,
                "platform",
                format!("unsupported platform '{}'", p),
            )
        })?),
    };

    let component = ProviderComponent {
        name: metadata.name,
        image_ref: metadata.image,
        profile: metadata
            .profile
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
        platform,
        install_order: metadata.install_order,
        content_id: sha256_hex(&manifests),
    };
    component.validate()?;
    Ok(component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_provider(root: &Path, dir: &str, metadata: &str, manifests: &str) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(METADATA_FILE), metadata).unwrap();
        fs::write(path.join(MANIFESTS_FILE), manifests).unwrap();
    }

    #[test]
    fn loads_providers_with_defaults() {
        let tmp = TempDir::new().unwrap();
        write_provider(
            tmp.path(),
            "core",
            "name: cluster-api\nimage: quay.io/openshift/capi:v1\ninstallOrder: 10\n",
            "kind: Deployment\n",
        );
        write_provider(
            tmp.path(),
            "aws",
            "name: infrastructure-aws\nimage: quay.io/openshift/capa:v1\nprofile: aws\ninstallOrder: 20\nplatform: AWS\n",
            "kind: Deployment\nname: capa\n",
        );
        fs::write(tmp.path().join("README"), "ignored").unwrap();

        let components = load_provider_components(tmp.path()).unwrap();
        assert_eq!(components.len(), 2);

        // Sorted by directory name
        assert_eq!(components[0].name, "infrastructure-aws");
        assert_eq!(components[0].platform, Some(Platform::Aws));
        assert_eq!(components[0].profile, "aws");

        assert_eq!(components[1].name, "cluster-api");
        assert_eq!(components[1].platform, None);
        assert_eq!(components[1].profile, DEFAULT_PROFILE);
        assert_eq!(components[1].install_order, 10);
        assert_eq!(components[1].content_id, sha256_hex(b"kind: Deployment\n"));
    }

    #[test]
    fn platform_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        write_provider(
            tmp.path(),
            "gcp",
            "name: infrastructure-gcp\nimage: img\nplatform: gcp\n",
            "",
        );
        let components = load_provider_components(tmp.path()).unwrap();
        assert_eq!(components[0].platform, Some(Platform::Gcp));
    }

    #[test]
    fn loads_providers_scoped_to_newer_platforms() {
        let tmp = TempDir::new().unwrap();
        write_provider(
            tmp.path(),
            "nutanix",
            "name: infrastructure-nutanix\nimage: img\nplatform: Nutanix\n",
            "",
        );
        write_provider(
            tmp.path(),
            "ovirt",
            "name: infrastructure-ovirt\nimage: img\nplatform: oVirt\n",
            "",
        );
        let components = load_provider_components(tmp.path()).unwrap();
        assert_eq!(components[0].platform, Some(Platform::Nutanix));
        assert_eq!(components[1].platform, Some(Platform::Ovirt));
    }

    #[test]
    fn missing_manifests_is_validation_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("core");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(METADATA_FILE), "name: cluster-api\nimage: img\n").unwrap();

        let err = load_provider_components(tmp.path()).unwrap_err();
        match err {
            Error::Validation { field, .. } => assert_eq!(field.as_deref(), Some(MANIFESTS_FILE)),
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn malformed_metadata_is_validation_error() {
        let tmp = TempDir::new().unwrap();
        write_provider(tmp.path(), "core", "name: [unterminated", "");
        assert!(matches!(
            load_provider_components(tmp.path()),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn unknown_platform_is_validation_error() {
        let tmp = TempDir::new().unwrap();
        write_provider(
            tmp.path(),
            "x",
            "name: infrastructure-x\nimage: img\nplatform: Mars\n",
            "",
        );
        let err = load_provider_components(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("Mars"));
    }

    #[test]
    fn empty_image_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write_provider(tmp.path(), "core", "name: cluster-api\nimage: \"\"\n", "");
        assert!(load_provider_components(tmp.path()).is_err());
    }

    #[test]
    fn missing_directory_is_validation_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_provider_components(&tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}
