//! DeploymentStore — the authoritative in-memory collection of deployments.
//!
//! Records are kept in insertion order with a side index by id, so
//! pagination is stable and lookups are O(1). The whole collection sits
//! behind a single `RwLock`: every operation is a short critical section
//! and readers never see a half-written record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StateError, StateResult};
use crate::types::*;

#[derive(Default)]
struct Records {
    /// Deployments in insertion order. Nothing is ever removed.
    items: Vec<Deployment>,
    /// id → position in `items`.
    index: HashMap<DeploymentId, usize>,
}

/// Thread-safe deployment store.
#[derive(Clone, Default)]
pub struct DeploymentStore {
    inner: Arc<RwLock<Records>>,
}

impl DeploymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new deployment.
    ///
    /// An empty id is replaced with a fresh UUID. Both `created_at` and
    /// `updated_at` are set to the same instant. A caller-supplied id that
    /// is already stored is rejected with [`StateError::Conflict`].
    pub fn create(&self, mut deployment: Deployment) -> StateResult<Deployment> {
        let mut records = self.inner.write();

        if deployment.id.is_empty() {
            let mut id = Uuid::new_v4().to_string();
            while records.index.contains_key(&id) {
                id = Uuid::new_v4().to_string();
            }
            deployment.id = id;
        } else if records.index.contains_key(&deployment.id) {
            return Err(StateError::Conflict(deployment.id));
        }

        let now = Utc::now();
        deployment.created_at = now;
        deployment.updated_at = now;

        let position = records.items.len();
        records.index.insert(deployment.id.clone(), position);
        records.items.push(deployment.clone());
        debug!(id = %deployment.id, application = %deployment.application, "deployment stored");
        Ok(deployment)
    }

    /// Get a copy of a deployment by id.
    pub fn get_by_id(&self, id: &str) -> StateResult<Deployment> {
        let records = self.inner.read();
        records
            .index
            .get(id)
            .map(|&pos| records.items[pos].clone())
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    /// Deployments `[skip, skip + limit)` in insertion order.
    ///
    /// A `skip` past the end yields an empty page rather than an error.
    pub fn list_all(&self, skip: usize, limit: usize) -> Vec<Deployment> {
        let records = self.inner.read();
        records.items.iter().skip(skip).take(limit).cloned().collect()
    }

    /// Replace a stored deployment wholesale, refreshing `updated_at`.
    ///
    /// Unknown ids are rejected with [`StateError::NotFound`]; this never
    /// inserts.
    pub fn update(&self, mut deployment: Deployment) -> StateResult<Deployment> {
        let mut records = self.inner.write();
        let pos = *records
            .index
            .get(&deployment.id)
            .ok_or_else(|| StateError::NotFound(deployment.id.clone()))?;

        // Never let a backwards wall-clock step put updated_at before created_at.
        deployment.updated_at = Utc::now().max(deployment.created_at);
        records.items[pos] = deployment.clone();
        debug!(id = %deployment.id, status = %deployment.status, "deployment updated");
        Ok(deployment)
    }

    /// Apply `change` to the stored deployment under a single write lock.
    ///
    /// Read, mutate and write are one step, so concurrent modifications of
    /// the same record never overwrite each other. The id and `created_at`
    /// cannot be changed; `updated_at` is refreshed as in [`update`](Self::update).
    pub fn modify<F>(&self, id: &str, change: F) -> StateResult<Deployment>
    where
        F: FnOnce(&mut Deployment),
    {
        let mut records = self.inner.write();
        let pos = *records
            .index
            .get(id)
            .ok_or_else(|| StateError::NotFound(id.to_string()))?;

        let stored = &mut records.items[pos];
        let (id, created_at) = (stored.id.clone(), stored.created_at);
        change(stored);
        stored.id = id;
        stored.created_at = created_at;
        stored.updated_at = Utc::now().max(created_at);
        debug!(id = %stored.id, status = %stored.status, "deployment modified");
        Ok(stored.clone())
    }

    /// Total number of stored deployments.
    pub fn count(&self) -> usize {
        self.inner.read().items.len()
    }

    /// Number of deployments currently in `status`.
    pub fn count_by_status(&self, status: DeploymentStatus) -> usize {
        self.inner
            .read()
            .items
            .iter()
            .filter(|d| d.status == status)
            .count()
    }
}
