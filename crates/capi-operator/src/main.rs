//! Cluster API operator - installs CAPI providers and reports their status

use clap::Parser;
use kube::CustomResourceExt;
use tokio_util::sync::CancellationToken;

use capi_common::crd::ClusterAPI;
use capi_common::kube_utils::create_client;
use capi_common::retry::{retry_with_backoff, RetryConfig};
use capi_common::telemetry::{init_telemetry, TelemetryConfig};
use capi_operator::config::{Cli, Commands, OperatorConfig};
use capi_operator::controller_runner::{
    build_cluster_operator_controller, build_revision_controller,
};
use capi_operator::startup::ensure_crds_installed;
use capi_revision::load_provider_components;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&ClusterAPI::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    init_telemetry(TelemetryConfig {
        json: cli.controller.log_json,
        ..Default::default()
    })?;

    match cli.command {
        Some(Commands::Controller) | None => {
            let config = OperatorConfig::from_args(&cli.controller)?;
            run_controller(config).await
        }
    }
}

async fn run_controller(config: OperatorConfig) -> anyhow::Result<()> {
    tracing::info!(
        release_version = %config.release_version,
        cluster_operator = %config.cluster_operator,
        "Starting Cluster API operator"
    );

    // Providers are read once; reconciles never touch the filesystem
    let components = match &config.providers_dir {
        Some(dir) => Some(load_provider_components(dir)?),
        None => {
            tracing::warn!("No providers directory configured, no revisions will be rendered");
            None
        }
    };

    let kubeconfig = config.kubeconfig.clone();
    let client = retry_with_backoff(&RetryConfig::with_max_attempts(10), "create_client", || {
        let kubeconfig = kubeconfig.clone();
        async move { create_client(kubeconfig.as_deref()).await }
    })
    .await?;

    retry_with_backoff(&RetryConfig::with_max_attempts(10), "install_crds", || {
        ensure_crds_installed(&client)
    })
    .await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    tracing::info!("Starting controllers:");
    let mut controllers =
        build_revision_controller(client.clone(), &config, components, shutdown.clone());
    controllers.extend(build_cluster_operator_controller(
        client,
        &config,
        shutdown,
    ));

    futures::future::join_all(controllers).await;
    tracing::info!("Controllers stopped");
    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM so in-flight status writes return promptly
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
