//! Command line and runtime configuration

use std::path::PathBuf;

use capi_common::DEFAULT_CLUSTER_OPERATOR;
use clap::{Args, Parser, Subcommand};

/// Cluster API operator - installs and tracks CAPI providers for the cluster
#[derive(Parser, Debug)]
#[command(name = "capi-operator", version, about, long_about = None)]
pub struct Cli {
    /// Print the ClusterAPI CRD as YAML and exit
    #[arg(long)]
    pub crd: bool,

    /// Controller settings, accepted with or without the subcommand
    #[command(flatten)]
    pub controller: ControllerArgs,

    /// Mode to run in; defaults to the controller
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Operator subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the controllers (default mode)
    Controller,
}

/// Settings for controller mode
#[derive(Args, Debug, Clone, Default)]
pub struct ControllerArgs {
    /// Path to a kubeconfig; in-cluster config is used when unset
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Release version stamped on new revisions and reported in status.versions
    #[arg(long, env = "RELEASE_VERSION")]
    pub release_version: Option<String>,

    /// Directory with one sub-directory per provider (metadata.yaml + manifests.yaml)
    #[arg(long, env = "PROVIDER_IMAGES_DIR")]
    pub providers_dir: Option<PathBuf>,

    /// Name of the ClusterOperator to report status on
    #[arg(long, default_value = DEFAULT_CLUSTER_OPERATOR)]
    pub cluster_operator: String,

    /// Emit JSON logs
    #[arg(long, env = "CAPI_LOG_JSON")]
    pub log_json: bool,
}

/// Validated configuration shared by every controller
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Release version of this operator
    pub release_version: String,
    /// ClusterOperator the controllers report through
    pub cluster_operator: String,
    /// Provider directory, `None` when there is nothing to install
    pub providers_dir: Option<PathBuf>,
    /// Explicit kubeconfig path
    pub kubeconfig: Option<PathBuf>,
}

impl OperatorConfig {
    /// Build the configuration from parsed arguments
    pub fn from_args(args: &ControllerArgs) -> anyhow::Result<Self> {
        let release_version = args
            .release_version
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("--release-version (RELEASE_VERSION) is required"))?;

        if args.cluster_operator.is_empty() {
            anyhow::bail!("--cluster-operator must not be empty");
        }

        Ok(Self {
            release_version,
            cluster_operator: args.cluster_operator.clone(),
            providers_dir: args.providers_dir.clone(),
            kubeconfig: args.kubeconfig.clone(),
        })
    }
}
