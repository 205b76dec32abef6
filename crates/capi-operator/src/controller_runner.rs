//! Controller runner - builds controller futures
//!
//! Each `build_*` function returns boxed futures the caller drives to
//! completion. Contexts are built here from the injected configuration.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use capi_common::crd::{ClusterAPI, ClusterOperator, Infrastructure, CLUSTER_API_SINGLETON};
use capi_revision::{KubeRevisionStore, ProviderComponent, RevisionContext};
use capi_status::{ConditionWriter, KubeConditionStore};
use futures::StreamExt;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};
use tokio_util::sync::CancellationToken;

use crate::cluster_operator::{self, ClusterOperatorContext};
use crate::config::OperatorConfig;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

/// A controller future
pub type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

fn singleton_config(name: &str) -> WatcherConfig {
    watcher_config().fields(&format!("metadata.name={}", name))
}

/// Build the installer revision controller.
///
/// Infrastructure changes are mapped onto the ClusterAPI singleton so a
/// platform appearing re-triggers a reconcile that was waiting on it.
pub fn build_revision_controller(
    client: Client,
    config: &OperatorConfig,
    components: Option<Vec<ProviderComponent>>,
    shutdown: CancellationToken,
) -> Vec<ControllerFuture> {
    let writer = ConditionWriter::new(
        Arc::new(KubeConditionStore::new(client.clone())),
        config.cluster_operator.clone(),
        capi_revision::controller::FIELD_MANAGER,
    )
    .with_shutdown(shutdown);

    let mut builder = RevisionContext::builder(
        Arc::new(KubeRevisionStore::new(client.clone())),
        writer,
        config.release_version.clone(),
    );
    if let Some(components) = components {
        builder = builder.components(components);
    }
    let ctx = Arc::new(builder.build());

    let cluster_apis: Api<ClusterAPI> = Api::all(client.clone());
    let infrastructures: Api<Infrastructure> = Api::all(client);

    tracing::info!("- InstallerRevision controller");

    vec![Box::pin(
        Controller::new(cluster_apis, singleton_config(CLUSTER_API_SINGLETON))
            .watches(infrastructures, watcher_config(), |_| {
                Some(ObjectRef::<ClusterAPI>::new(CLUSTER_API_SINGLETON))
            })
            .shutdown_on_signal()
            .run(capi_revision::reconcile, capi_revision::error_policy, ctx)
            .for_each(log_reconcile_result("InstallerRevision")),
    )]
}

/// Build the ClusterOperator aggregation controller
pub fn build_cluster_operator_controller(
    client: Client,
    config: &OperatorConfig,
    shutdown: CancellationToken,
) -> Vec<ControllerFuture> {
    let writer = ConditionWriter::new(
        Arc::new(KubeConditionStore::new(client.clone())),
        config.cluster_operator.clone(),
        cluster_operator::FIELD_MANAGER,
    )
    .with_shutdown(shutdown);
    let ctx = Arc::new(ClusterOperatorContext::new(
        writer,
        config.release_version.clone(),
    ));

    let cluster_operators: Api<ClusterOperator> = Api::all(client);

    tracing::info!("- ClusterOperator controller");

    vec![Box::pin(
        Controller::new(
            cluster_operators,
            singleton_config(&config.cluster_operator),
        )
        .shutdown_on_signal()
        .run(cluster_operator::reconcile, cluster_operator::error_policy, ctx)
        .for_each(log_reconcile_result("ClusterOperator")),
    )]
}

/// Log the result of each reconcile
fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
