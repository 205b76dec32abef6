//! Content-addressed installer revisions
//!
//! Provider components are rendered per platform into a [`RenderedRevision`]
//! whose content id identifies exactly what would be installed. The revision
//! history on the ClusterAPI singleton only grows when that content changes.

#![deny(missing_docs)]

pub mod component;
pub mod controller;
pub mod history;
pub mod provider_images;
pub mod rendered;

pub use component::ProviderComponent;
pub use controller::{error_policy, reconcile, KubeRevisionStore, RevisionContext, RevisionStore};
pub use history::{enforce_max_revisions, merge_revisions, trim_revisions, MAX_REVISIONS};
pub use provider_images::load_provider_components;
pub use rendered::RenderedRevision;
