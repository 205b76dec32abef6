//! Per-object error backoff for kube-rs error policies
//!
//! kube-rs calls the error policy synchronously with no memory of earlier
//! failures, so the failure count per object lives here. Terminal errors stop
//! automatic retries entirely; the next watch event re-triggers the reconcile.

use capi_common::retry::RetryConfig;
use capi_common::Error;
use dashmap::DashMap;
use kube::runtime::controller::Action;
use tracing::{debug, warn};

/// Tracks consecutive failures per object key
pub struct ErrorBackoff {
    config: RetryConfig,
    failures: DashMap<String, u32>,
}

impl Default for ErrorBackoff {
    fn default() -> Self {
        Self::new(RetryConfig::reconcile())
    }
}

impl ErrorBackoff {
    /// Create a backoff tracker following `config`
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            failures: DashMap::new(),
        }
    }

    /// Record a failure and return the consecutive failure count
    pub fn record_failure(&self, key: &str) -> u32 {
        let mut entry = self.failures.entry(key.to_string()).or_insert(0);
        let count = entry.saturating_add(1);
        *entry = count;
        count
    }

    /// Forget failures for `key` after a successful reconcile
    pub fn reset(&self, key: &str) {
        self.failures.remove(key);
    }

    /// Current consecutive failure count
    pub fn failures(&self, key: &str) -> u32 {
        self.failures.get(key).map(|v| *v).unwrap_or(0)
    }

    /// Action for a failed reconcile of `key`
    pub fn action_for(&self, key: &str, error: &Error) -> Action {
        if error.is_terminal() {
            warn!(
                object = %key,
                error = %error,
                "Non-retryable error, waiting for a change before reconciling again"
            );
            self.reset(key);
            return Action::await_change();
        }

        let attempt = self.record_failure(key);
        let delay = self.config.delay_for_attempt(attempt);
        debug!(
            object = %key,
            attempt,
            delay_secs = delay.as_secs(),
            error = %error,
            "Requeueing after error"
        );
        Action::requeue(delay)
    }
}
