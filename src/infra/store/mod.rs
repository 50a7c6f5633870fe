//! Persistence backends for ledger updates.
//!
//! Ledger calls write into a [`StoreTransaction`], which buffers
//! [`LedgerUpdate`]s until the caller commits it to a [`StateStore`]. Stores
//! keep a [`StoreSnapshot`] built from the updates and serve it back to
//! recovery.

pub mod jsonl;
pub mod memory;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{
    Container, ContainerFactory, ContainerHandle, ContainerState, LedgerError,
    PersistedAttemptInfo, RecoveryStore, ResourceField, TransactionScope,
};
use crate::util::{AttemptId, ContainerId, ResourceAmount};

pub use jsonl::JsonlStateStore;
pub use memory::InMemoryStateStore;

/// One durable change to ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerUpdate {
    /// New value of a resource row.
    Resource {
        /// Attempt.
        attempt: AttemptId,
        /// Row.
        field: ResourceField,
        /// Value.
        value: ResourceAmount,
    },
    /// New attempt-level row.
    AttemptInfo(PersistedAttemptInfo),
    /// Container staged.
    StagedAdded {
        /// Attempt.
        attempt: AttemptId,
        /// Container record.
        container: Container,
    },
    /// Container left staging.
    StagedRemoved {
        /// Attempt.
        attempt: AttemptId,
        /// Container.
        container_id: ContainerId,
    },
    /// Container joined the live set.
    LiveAdded {
        /// Attempt.
        attempt: AttemptId,
        /// Container record.
        container: Container,
    },
    /// Container left the live set.
    LiveRemoved {
        /// Attempt.
        attempt: AttemptId,
        /// Container.
        container_id: ContainerId,
    },
}

/// A backend that accepts committed updates and serves recovery reads.
pub trait StateStore: RecoveryStore + Send + Sync {
    /// Apply a committed batch.
    fn apply(&self, updates: Vec<LedgerUpdate>) -> Result<(), LedgerError>;

    /// Attempt-level row of one attempt.
    fn attempt_info(&self, attempt: &AttemptId) -> Result<Option<PersistedAttemptInfo>, LedgerError>;

    /// Attempt-level rows of every persisted attempt, ordered by attempt id.
    fn attempts(&self) -> Result<Vec<PersistedAttemptInfo>, LedgerError>;
}

/// Buffers the updates of one scheduling step.
#[derive(Debug, Default)]
pub struct StoreTransaction {
    updates: Vec<LedgerUpdate>,
}

impl StoreTransaction {
    /// Open an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffered updates.
    #[must_use]
    pub fn updates(&self) -> &[LedgerUpdate] {
        &self.updates
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Apply the buffered updates to a store, returning how many were written.
    pub fn commit(self, store: &dyn StateStore) -> Result<usize, LedgerError> {
        let count = self.updates.len();
        if count > 0 {
            store.apply(self.updates)?;
        }
        Ok(count)
    }
}

impl TransactionScope for StoreTransaction {
    fn update_resource(
        &mut self,
        attempt: &AttemptId,
        field: ResourceField,
        value: ResourceAmount,
    ) -> Result<(), LedgerError> {
        self.updates.push(LedgerUpdate::Resource {
            attempt: *attempt,
            field,
            value,
        });
        Ok(())
    }

    fn update_attempt_info(&mut self, info: &PersistedAttemptInfo) -> Result<(), LedgerError> {
        self.updates.push(LedgerUpdate::AttemptInfo(info.clone()));
        Ok(())
    }

    fn add_staged_container(
        &mut self,
        attempt: &AttemptId,
        container: &Container,
    ) -> Result<(), LedgerError> {
        self.updates.push(LedgerUpdate::StagedAdded {
            attempt: *attempt,
            container: container.clone(),
        });
        Ok(())
    }

    fn remove_staged_container(
        &mut self,
        attempt: &AttemptId,
        container_id: &ContainerId,
    ) -> Result<(), LedgerError> {
        self.updates.push(LedgerUpdate::StagedRemoved {
            attempt: *attempt,
            container_id: *container_id,
        });
        Ok(())
    }

    fn add_live_container(
        &mut self,
        attempt: &AttemptId,
        container: &Container,
    ) -> Result<(), LedgerError> {
        self.updates.push(LedgerUpdate::LiveAdded {
            attempt: *attempt,
            container: container.clone(),
        });
        Ok(())
    }

    fn remove_live_container(
        &mut self,
        attempt: &AttemptId,
        container_id: &ContainerId,
    ) -> Result<(), LedgerError> {
        self.updates.push(LedgerUpdate::LiveRemoved {
            attempt: *attempt,
            container_id: *container_id,
        });
        Ok(())
    }
}

/// Materialized state of every persisted attempt.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    resources: HashMap<(AttemptId, ResourceField), ResourceAmount>,
    attempts: HashMap<AttemptId, PersistedAttemptInfo>,
    staged: HashMap<AttemptId, Vec<ContainerId>>,
    live: HashMap<AttemptId, Vec<ContainerId>>,
    containers: HashMap<ContainerId, (Container, ContainerState)>,
}

impl StoreSnapshot {
    /// Fold one update into the snapshot.
    pub fn apply(&mut self, update: LedgerUpdate) {
        match update {
            LedgerUpdate::Resource {
                attempt,
                field,
                value,
            } => {
                self.resources.insert((attempt, field), value);
            }
            LedgerUpdate::AttemptInfo(info) => {
                self.attempts.insert(info.attempt_id, info);
            }
            LedgerUpdate::StagedAdded { attempt, container } => {
                let ids = self.staged.entry(attempt).or_default();
                if !ids.contains(&container.id) {
                    ids.push(container.id);
                }
                self.containers
                    .insert(container.id, (container, ContainerState::Allocated));
            }
            LedgerUpdate::StagedRemoved {
                attempt,
                container_id,
            } => {
                if let Some(ids) = self.staged.get_mut(&attempt) {
                    ids.retain(|id| *id != container_id);
                }
                self.forget_if_unreferenced(&attempt, &container_id);
            }
            LedgerUpdate::LiveAdded { attempt, container } => {
                let ids = self.live.entry(attempt).or_default();
                if !ids.contains(&container.id) {
                    ids.push(container.id);
                }
                self.containers
                    .insert(container.id, (container, ContainerState::Acquired));
            }
            LedgerUpdate::LiveRemoved {
                attempt,
                container_id,
            } => {
                if let Some(ids) = self.live.get_mut(&attempt) {
                    ids.retain(|id| *id != container_id);
                }
                self.forget_if_unreferenced(&attempt, &container_id);
            }
        }
    }

    fn forget_if_unreferenced(&mut self, attempt: &AttemptId, container_id: &ContainerId) {
        let referenced = |ids: Option<&Vec<ContainerId>>| ids.is_some_and(|ids| ids.contains(container_id));
        if !referenced(self.staged.get(attempt)) && !referenced(self.live.get(attempt)) {
            self.containers.remove(container_id);
        }
    }

    /// Persisted resource row.
    #[must_use]
    pub fn resource(&self, attempt: &AttemptId, field: ResourceField) -> Option<ResourceAmount> {
        self.resources.get(&(*attempt, field)).copied()
    }

    /// Persisted attempt row.
    #[must_use]
    pub fn attempt_info(&self, attempt: &AttemptId) -> Option<PersistedAttemptInfo> {
        self.attempts.get(attempt).cloned()
    }

    /// Every attempt row, ordered by attempt id.
    #[must_use]
    pub fn attempts(&self) -> Vec<PersistedAttemptInfo> {
        let mut infos: Vec<_> = self.attempts.values().cloned().collect();
        infos.sort_by_key(|info| info.attempt_id);
        infos
    }

    /// Staged container ids in staging order.
    #[must_use]
    pub fn staged_container_ids(&self, attempt: &AttemptId) -> Vec<ContainerId> {
        self.staged.get(attempt).cloned().unwrap_or_default()
    }

    /// Live container ids.
    #[must_use]
    pub fn live_container_ids(&self, attempt: &AttemptId) -> Vec<ContainerId> {
        self.live.get(attempt).cloned().unwrap_or_default()
    }

    /// Rebuild a handle through the factory.
    pub fn resolve_container(
        &self,
        container_id: &ContainerId,
        factory: &dyn ContainerFactory,
    ) -> Result<ContainerHandle, LedgerError> {
        let (container, state) = self
            .containers
            .get(container_id)
            .cloned()
            .ok_or(LedgerError::UnknownContainer(*container_id))?;
        Ok(factory.restore(container, state))
    }
}
