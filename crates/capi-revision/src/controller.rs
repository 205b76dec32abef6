//! Installer revision controller
//!
//! Watches the ClusterAPI singleton and keeps its revision history in step
//! with the provider components shipped in this release:
//!
//! 1. Read the platform from the Infrastructure singleton
//! 2. Render the components for that platform
//! 3. Merge the rendered revision into the history and enforce the ceiling
//! 4. Trim superseded revisions once the newest one is current
//! 5. Apply `status.revisions` and `status.desiredRevision` if they changed
//!
//! Both API calls give up with a retryable error once the writer's shutdown
//! token is cancelled.
//!
//! `status.currentRevision` belongs to the installer and is only read here.

use std::sync::Arc;

use async_trait::async_trait;
use capi_common::crd::{
    ClusterAPI, ClusterAPIStatus, Infrastructure, InstallerRevision, INFRASTRUCTURE_SINGLETON,
};
use capi_common::kube_utils::{apply_cluster_status, get_cluster_object};
use capi_common::{Error, Platform};
use capi_status::{
    cancellable, ConditionWriter, ErrorBackoff, OutcomeGenerator, ReconcileOutcome,
};
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::component::ProviderComponent;
use crate::history::{enforce_max_revisions, merge_revisions, trim_revisions};
use crate::rendered::RenderedRevision;

/// Condition qualifier for this controller
pub const CONTROLLER_NAME: &str = "InstallerRevision";

/// Field manager owning the revision status fields
pub const FIELD_MANAGER: &str = "capi-installer-revision";

/// Trait abstracting the Kubernetes reads and writes of this controller
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RevisionStore: Send + Sync {
    /// Platform of the cluster, `None` while Infrastructure does not report one
    async fn get_platform(&self) -> Result<Option<Platform>, Error>;

    /// Apply revision status fields to the named ClusterAPI.
    ///
    /// `status.current_revision` is never sent.
    async fn apply_revision_status(
        &self,
        name: &str,
        field_manager: &str,
        status: &ClusterAPIStatus,
    ) -> Result<(), Error>;
}

/// [`RevisionStore`] backed by the Kubernetes API
pub struct KubeRevisionStore {
    client: Client,
}

impl KubeRevisionStore {
    /// Create a store using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RevisionStore for KubeRevisionStore {
    async fn get_platform(&self) -> Result<Option<Platform>, Error> {
        let infra =
            get_cluster_object::<Infrastructure>(&self.client, INFRASTRUCTURE_SINGLETON).await?;
        match infra {
            Some(infra) => infra.platform(),
            None => Ok(None),
        }
    }

    async fn apply_revision_status(
        &self,
        name: &str,
        field_manager: &str,
        status: &ClusterAPIStatus,
    ) -> Result<(), Error> {
        let status = serde_json::to_value(status)
            .map_err(|e| Error::serialization_for_kind("ClusterAPI", e.to_string()))?;
        apply_cluster_status::<ClusterAPI>(&self.client, name, status, field_manager).await
    }
}

/// Shared state for the revision controller
pub struct RevisionContext {
    /// Kubernetes access (trait object for testability)
    pub store: Arc<dyn RevisionStore>,
    /// Writes this controller's ClusterOperator conditions
    pub writer: ConditionWriter,
    /// Builds outcomes under the `InstallerRevision` qualifier
    pub outcomes: OutcomeGenerator,
    /// Failure tracking for the error policy
    pub backoff: ErrorBackoff,
    /// Provider components shipped with this release; `None` means nothing to install
    pub components: Option<Vec<ProviderComponent>>,
    /// Release version stamped on new revisions
    pub release_version: String,
}

impl RevisionContext {
    /// Create a builder for constructing a RevisionContext
    pub fn builder(
        store: Arc<dyn RevisionStore>,
        writer: ConditionWriter,
        release_version: impl Into<String>,
    ) -> RevisionContextBuilder {
        RevisionContextBuilder {
            store,
            writer,
            release_version: release_version.into(),
            components: None,
            backoff: None,
        }
    }
}

/// Builder for [`RevisionContext`]
pub struct RevisionContextBuilder {
    store: Arc<dyn RevisionStore>,
    writer: ConditionWriter,
    release_version: String,
    components: Option<Vec<ProviderComponent>>,
    backoff: Option<ErrorBackoff>,
}

impl RevisionContextBuilder {
    /// Provider components to render into revisions
    pub fn components(mut self, components: Vec<ProviderComponent>) -> Self {
        self.components = Some(components);
        self
    }

    /// Override the error backoff (primarily for testing)
    pub fn backoff(mut self, backoff: ErrorBackoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Build the context
    pub fn build(self) -> RevisionContext {
        RevisionContext {
            store: self.store,
            writer: self.writer,
            outcomes: OutcomeGenerator::new(CONTROLLER_NAME),
            backoff: self.backoff.unwrap_or_default(),
            components: self.components,
            release_version: self.release_version,
        }
    }
}

/// Reconcile the ClusterAPI revision history
pub async fn reconcile(
    cluster_api: Arc<ClusterAPI>,
    ctx: Arc<RevisionContext>,
) -> Result<Action, Error> {
    let name = cluster_api.name_any();
    debug!(cluster_api = %name, "Reconciling installer revisions");

    let outcome = reconcile_revisions(&cluster_api, &ctx).await;
    debug!(
        cluster_api = %name,
        outcome = ?outcome.kind(),
        message = %outcome.message(),
        "Reconcile finished"
    );

    let result = outcome.finish(&ctx.writer).await;
    if result.is_ok() {
        ctx.backoff.reset(&name);
    }
    result
}

/// Error policy: exponential backoff for retryable errors, none for terminal ones
pub fn error_policy(
    cluster_api: Arc<ClusterAPI>,
    error: &Error,
    ctx: Arc<RevisionContext>,
) -> Action {
    let name = cluster_api.name_any();
    error!(?error, cluster_api = %name, "Installer revision reconciliation failed");
    ctx.backoff.action_for(&name, error)
}

async fn reconcile_revisions(
    cluster_api: &ClusterAPI,
    ctx: &RevisionContext,
) -> ReconcileOutcome {
    let name = cluster_api.name_any();
    let outcomes = &ctx.outcomes;

    let candidate = match &ctx.components {
        Some(components) => {
            let platform = match cancellable(ctx.writer.shutdown(), "get platform", async {
                ctx.store.get_platform().await
            })
            .await
            {
                Ok(Some(platform)) => platform,
                Ok(None) => return outcomes.waiting_on_external("Infrastructure platform"),
                Err(e @ Error::Validation { .. }) => return outcomes.non_retryable_error(e),
                Err(e) => return outcomes.error(e),
            };
            match RenderedRevision::new(components, platform) {
                Ok(rendered) => {
                    warn_if_provider_missing(&name, platform, &rendered);
                    Some(rendered)
                }
                Err(e) => {
                    error!(
                        cluster_api = %name,
                        component = ?e.component(),
                        %platform,
                        "Provider components failed to render"
                    );
                    return outcomes.non_retryable_error(e);
                }
            }
        }
        None => None,
    };

    let status = cluster_api.status.clone().unwrap_or_default();

    let merged = merge_revisions(
        &status.revisions,
        candidate.as_ref(),
        &ctx.release_version,
    );
    let mut history = match merged {
        Ok(history) => history,
        Err(e) => return outcomes.non_retryable_error(e),
    };
    if let Err(e) = enforce_max_revisions(&history) {
        return outcomes.error(e);
    }

    if trim_revisions(&mut history, status.current_revision.as_deref()) {
        info!(
            cluster_api = %name,
            current = ?status.current_revision,
            "Trimmed superseded revisions"
        );
    }

    let desired = history.first().map(|r| r.name.clone());

    if history_changed(&status, &history, desired.as_deref()) {
        let update = ClusterAPIStatus {
            desired_revision: desired.clone(),
            current_revision: None,
            revisions: history,
        };
        let applied = cancellable(ctx.writer.shutdown(), "apply ClusterAPI status", async {
            ctx.store
                .apply_revision_status(&name, FIELD_MANAGER, &update)
                .await
        })
        .await;
        if let Err(e) = applied {
            return outcomes.error(e);
        }
        info!(
            cluster_api = %name,
            desired = ?desired,
            revisions = update.revisions.len(),
            "Updated installer revisions"
        );
        return outcomes.progressing(match &desired {
            Some(desired) => format!("Desired revision is {}", desired),
            None => "Revision history updated".to_string(),
        });
    }

    match desired {
        Some(desired) if status.current_revision.as_deref() != Some(desired.as_str()) => {
            outcomes.waiting_on_external(format!("revision {} to be installed", desired))
        }
        _ => outcomes.success(),
    }
}

/// The platform has a CAPI infrastructure provider, but this release ships
/// no component scoped to it.
fn warn_if_provider_missing(name: &str, platform: Platform, rendered: &RenderedRevision) {
    let Some(provider) = platform.infrastructure_provider() else {
        return;
    };
    if !rendered
        .components()
        .iter()
        .any(|c| c.platform == Some(platform))
    {
        warn!(
            cluster_api = %name,
            %platform,
            provider,
            "No infrastructure provider component shipped for platform"
        );
    }
}

fn history_changed(
    status: &ClusterAPIStatus,
    history: &[InstallerRevision],
    desired: Option<&str>,
) -> bool {
    status.revisions.as_slice() != history || status.desired_revision.as_deref() != desired
}
