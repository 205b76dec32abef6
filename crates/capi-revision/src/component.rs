//! Installable provider components

use capi_common::crd::InstallerComponent;
use capi_common::{Error, Platform};

/// Profile used when a provider does not name one
pub const DEFAULT_PROFILE: &str = "default";

/// One provider the installer can roll out.
///
/// `content_id` identifies the manifests the component installs; two
/// components with the same content id install the same objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderComponent {
    /// Component name, unique within a revision
    pub name: String,
    /// Image reference carrying the manifests
    pub image_ref: String,
    /// Manifest profile within the image
    pub profile: String,
    /// Platform this component is restricted to; `None` installs everywhere
    pub platform: Option<Platform>,
    /// Relative install order, lower first
    pub install_order: i32,
    /// Content identifier of the manifests
    pub content_id: String,
}

impl ProviderComponent {
    /// Scope string used for ordering: empty for global components
    pub fn scope(&self) -> &'static str {
        self.platform.map(|p| p.as_str()).unwrap_or("")
    }

    /// Whether this component installs on `platform`
    pub fn applies_to(&self, platform: Platform) -> bool {
        self.platform.map_or(true, |p| p == platform)
    }

    /// Check that the component can be rendered into a revision
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::validation_for_field(
                "provider",
                "name",
                "component name must not be empty",
            ));
        }
        if self.image_ref.is_empty() {
            return Err(Error::validation_for_field(
                &self.name,
                "image",
                "image reference must not be empty",
            ));
        }
        if self.content_id.is_empty() {
            return Err(Error::validation_for_field(
                &self.name,
                "contentID",
                "content identifier must not be empty",
            ));
        }
        Ok(())
    }

    /// Persisted form of this component
    pub fn to_installer_component(&self) -> InstallerComponent {
        InstallerComponent {
            name: self.name.clone(),
            image: self.image_ref.clone(),
            profile: self.profile.clone(),
            content_id: self.content_id.clone(),
        }
    }
}
