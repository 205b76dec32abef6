//! Cluster API operator
//!
//! Runs the installer revision controller and the ClusterOperator
//! aggregation controller against the cluster.

#![deny(missing_docs)]

pub mod cluster_operator;
pub mod config;
pub mod controller_runner;
/// Startup utilities (CRD install)
pub mod startup;
