//! In-memory [`ConditionStore`] for tests in this and dependent crates

use std::sync::Mutex;

use async_trait::async_trait;
use capi_common::crd::{
    find_condition, ClusterOperator, ClusterOperatorSpec, ClusterOperatorStatus, Condition,
};
use capi_common::Error;

use crate::store::ConditionStore;

/// Holds a single ClusterOperator and merges applies the way the API server
/// does for the fields each field manager sends: conditions are keyed by
/// type, non-empty lists replace the stored ones.
#[derive(Default)]
pub struct InMemoryConditionStore {
    object: Mutex<Option<ClusterOperator>>,
    applies: Mutex<Vec<(String, ClusterOperatorStatus)>>,
}

impl InMemoryConditionStore {
    /// Store containing an empty ClusterOperator named `name`
    pub fn with_cluster_operator(name: &str) -> Self {
        let store = Self::default();
        store.set(ClusterOperator::new(name, ClusterOperatorSpec::default()));
        store
    }

    /// Replace the stored object
    pub fn set(&self, co: ClusterOperator) {
        *lock(&self.object) = Some(co);
    }

    /// Persisted conditions
    pub fn conditions(&self) -> Vec<Condition> {
        lock(&self.object)
            .as_ref()
            .map(|co| co.conditions().to_vec())
            .unwrap_or_default()
    }

    /// Persisted condition of the given type
    pub fn condition(&self, type_: &str) -> Option<Condition> {
        find_condition(&self.conditions(), type_).cloned()
    }

    /// Current status, if any
    pub fn status(&self) -> Option<ClusterOperatorStatus> {
        lock(&self.object).as_ref().and_then(|co| co.status.clone())
    }

    /// Every apply received, as (field manager, body)
    pub fn applies(&self) -> Vec<(String, ClusterOperatorStatus)> {
        lock(&self.applies).clone()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ConditionStore for InMemoryConditionStore {
    async fn get_cluster_operator(&self, name: &str) -> Result<Option<ClusterOperator>, Error> {
        Ok(lock(&self.object)
            .as_ref()
            .filter(|co| co.metadata.name.as_deref() == Some(name))
            .cloned())
    }

    async fn apply_status(
        &self,
        name: &str,
        field_manager: &str,
        status: &ClusterOperatorStatus,
    ) -> Result<(), Error> {
        let mut guard = lock(&self.object);
        let co = guard
            .as_mut()
            .filter(|co| co.metadata.name.as_deref() == Some(name))
            .ok_or_else(|| Error::internal_with_context("store", "ClusterOperator not found"))?;

        let stored = co.status.get_or_insert_with(Default::default);
        for incoming in &status.conditions {
            match stored.conditions.iter_mut().find(|c| c.type_ == incoming.type_) {
                Some(existing) => *existing = incoming.clone(),
                None => stored.conditions.push(incoming.clone()),
            }
        }
        if !status.versions.is_empty() {
            stored.versions = status.versions.clone();
        }
        if !status.related_objects.is_empty() {
            stored.related_objects = status.related_objects.clone();
        }

        lock(&self.applies).push((field_manager.to_string(), status.clone()));
        Ok(())
    }
}
