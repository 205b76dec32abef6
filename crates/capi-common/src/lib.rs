//! Common types for the Cluster API operator: CRDs, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod digest;
pub mod error;
pub mod kube_utils;
pub mod platform;
pub mod retry;
pub mod telemetry;

pub use error::Error;
pub use platform::Platform;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Name of the ClusterOperator this operator reports through
pub const DEFAULT_CLUSTER_OPERATOR: &str = "cluster-api";

/// Operand name used for the operator's own entry in `status.versions`
pub const OPERATOR_VERSION_NAME: &str = "operator";
