//! In-memory state store.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{LedgerUpdate, StateStore, StoreSnapshot};
use crate::core::{
    ContainerFactory, ContainerHandle, LedgerError, PersistedAttemptInfo, RecoveryStore,
    ResourceField,
};
use crate::util::{AttemptId, ContainerId, ResourceAmount};

/// State store kept in process memory, for development and testing.
pub struct InMemoryStateStore {
    snapshot: RwLock<StoreSnapshot>,
    factory: Arc<dyn ContainerFactory>,
}

impl InMemoryStateStore {
    /// Create an empty store that rebuilds handles with `factory`.
    pub fn new(factory: Arc<dyn ContainerFactory>) -> Self {
        Self {
            snapshot: RwLock::new(StoreSnapshot::default()),
            factory,
        }
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.read().clone()
    }
}

impl StateStore for InMemoryStateStore {
    fn apply(&self, updates: Vec<LedgerUpdate>) -> Result<(), LedgerError> {
        let mut snapshot = self.snapshot.write();
        for update in updates {
            snapshot.apply(update);
        }
        Ok(())
    }

    fn attempt_info(&self, attempt: &AttemptId) -> Result<Option<PersistedAttemptInfo>, LedgerError> {
        Ok(self.snapshot.read().attempt_info(attempt))
    }

    fn attempts(&self) -> Result<Vec<PersistedAttemptInfo>, LedgerError> {
        Ok(self.snapshot.read().attempts())
    }
}

impl RecoveryStore for InMemoryStateStore {
    fn resource(
        &self,
        attempt: &AttemptId,
        field: ResourceField,
    ) -> Result<Option<ResourceAmount>, LedgerError> {
        Ok(self.snapshot.read().resource(attempt, field))
    }

    fn staged_container_ids(&self, attempt: &AttemptId) -> Result<Vec<ContainerId>, LedgerError> {
        Ok(self.snapshot.read().staged_container_ids(attempt))
    }

    fn live_container_ids(&self, attempt: &AttemptId) -> Result<Vec<ContainerId>, LedgerError> {
        Ok(self.snapshot.read().live_container_ids(attempt))
    }

    fn resolve_container(&self, container_id: &ContainerId) -> Result<ContainerHandle, LedgerError> {
        self.snapshot
            .read()
            .resolve_container(container_id, self.factory.as_ref())
    }
}
