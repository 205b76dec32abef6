//! Rendered revisions and their aggregate content identifier

use std::collections::HashSet;

use capi_common::crd::{revision_name, InstallerRevision};
use capi_common::digest::ContentHasher;
use capi_common::{Error, Platform};

use crate::component::ProviderComponent;

/// The ordered set of components to install on one platform.
///
/// Components are filtered to the platform and sorted by install order, then
/// scope (global first), then name. The order is part of the identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedRevision {
    components: Vec<ProviderComponent>,
}

impl RenderedRevision {
    /// Render `components` for `platform`.
    ///
    /// Fails with a validation error if a matching component is incomplete or
    /// two matching components share a name.
    pub fn new<'a>(
        components: impl IntoIterator<Item = &'a ProviderComponent>,
        platform: Platform,
    ) -> Result<Self, Error> {
        let mut selected: Vec<ProviderComponent> = components
            .into_iter()
            .filter(|c| c.applies_to(platform))
            .cloned()
            .collect();

        let mut seen = HashSet::new();
        for component in &selected {
            component.validate()?;
            if !seen.insert(component.name.as_str()) {
                return Err(Error::validation_for(
                    &component.name,
                    format!("duplicate component on platform {}", platform),
                ));
            }
        }

        selected.sort_by(|a, b| {
            a.install_order
                .cmp(&b.install_order)
                .then_with(|| a.scope().cmp(b.scope()))
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(Self {
            components: selected,
        })
    }

    /// Components in install order
    pub fn components(&self) -> &[ProviderComponent] {
        &self.components
    }

    /// Whether no component matched the platform
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Aggregate content identifier over the ordered components.
    ///
    /// Every field is length-prefixed so no two distinct component lists
    /// feed the same byte stream to the hash.
    pub fn content_id(&self) -> String {
        let mut hasher = ContentHasher::new();
        hasher.update_field(&self.components.len().to_string());
        for c in &self.components {
            hasher.update_field(&c.name);
            hasher.update_field(&c.image_ref);
            hasher.update_field(&c.profile);
            hasher.update_field(&c.content_id);
        }
        hasher.finish_hex()
    }

    /// Persisted form with the given index and release stamp
    pub fn to_installer_revision(&self, revision: i64, release_version: &str) -> InstallerRevision {
        let content_id = self.content_id();
        InstallerRevision {
            name: revision_name(release_version, revision, &content_id),
            revision,
            content_id,
            release_version: release_version.to_string(),
            components: self
                .components
                .iter()
                .map(ProviderComponent::to_installer_component)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, platform: Option<Platform>, order: i32) -> ProviderComponent {
        ProviderComponent {
            name: name.to_string(),
            image_ref: format!("registry.example/{name}:v1"),
            profile: "default".to_string(),
            platform,
            install_order: order,
            content_id: format!("{name}-content"),
        }
    }

    fn names(rev: &RenderedRevision) -> Vec<&str> {
        rev.components().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn sorts_by_order_then_scope_then_name() {
        let input = vec![
            component("infrastructure-aws", Some(Platform::Aws), 20),
            component("ipam", None, 20),
            component("cluster-api", None, 10),
            component("addons", None, 20),
        ];
        let rev = RenderedRevision::new(&input, Platform::Aws).unwrap();
        assert_eq!(
            names(&rev),
            vec!["cluster-api", "addons", "ipam", "infrastructure-aws"]
        );
    }

    #[test]
    fn filters_out_other_platforms() {
        let input = vec![
            component("cluster-api", None, 10),
            component("infrastructure-aws", Some(Platform::Aws), 20),
            component("infrastructure-gcp", Some(Platform::Gcp), 20),
        ];
        let rev = RenderedRevision::new(&input, Platform::Gcp).unwrap();
        assert_eq!(names(&rev), vec!["cluster-api", "infrastructure-gcp"]);
    }

    #[test]
    fn input_order_does_not_change_content_id() {
        let a = vec![
            component("cluster-api", None, 10),
            component("infrastructure-aws", Some(Platform::Aws), 20),
            component("ipam", None, 20),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(
            RenderedRevision::new(&a, Platform::Aws).unwrap().content_id(),
            RenderedRevision::new(&b, Platform::Aws).unwrap().content_id()
        );
    }

    #[test]
    fn any_component_change_changes_content_id() {
        let base = vec![
            component("cluster-api", None, 10),
            component("infrastructure-aws", Some(Platform::Aws), 20),
        ];
        let original = RenderedRevision::new(&base, Platform::Aws)
            .unwrap()
            .content_id();

        let mut content = base.clone();
        content[1].content_id = "other".to_string();
        let mut image = base.clone();
        image[0].image_ref = "registry.example/cluster-api:v2".to_string();
        let mut order = base.clone();
        order[0].install_order = 30;

        for changed in [content, image, order] {
            assert_ne!(
                RenderedRevision::new(&changed, Platform::Aws)
                    .unwrap()
                    .content_id(),
                original
            );
        }
    }

    #[test]
    fn empty_revision_has_distinct_content_id() {
        let input = vec![component("infrastructure-gcp", Some(Platform::Gcp), 20)];
        let empty = RenderedRevision::new(&input, Platform::Aws).unwrap();
        assert!(empty.is_empty());

        let non_empty = RenderedRevision::new(&input, Platform::Gcp).unwrap();
        assert_ne!(empty.content_id(), non_empty.content_id());
        assert_eq!(empty.content_id().len(), 64);
    }

    #[test]
    fn invalid_matching_component_is_rejected() {
        let mut broken = component("infrastructure-aws", Some(Platform::Aws), 20);
        broken.content_id.clear();
        let err = RenderedRevision::new(&[broken.clone()], Platform::Aws).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        // A broken component for another platform is never rendered
        assert!(RenderedRevision::new(&[broken], Platform::Gcp).is_ok());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let input = vec![
            component("cluster-api", None, 10),
            component("cluster-api", None, 20),
        ];
        assert!(RenderedRevision::new(&input, Platform::Aws).is_err());
    }

    #[test]
    fn installer_revision_is_named_after_content() {
        let input = vec![component("cluster-api", None, 10)];
        let rendered = RenderedRevision::new(&input, Platform::Aws).unwrap();
        let rev = rendered.to_installer_revision(3, "4.18.0");

        assert_eq!(rev.revision, 3);
        assert_eq!(rev.content_id, rendered.content_id());
        assert_eq!(rev.name, format!("4.18.0-3-{}", &rev.content_id[..8]));
        assert_eq!(rev.components.len(), 1);
        assert_eq!(rev.components[0].image, "registry.example/cluster-api:v1");
    }
}
