//! Containers decided for allocation, waiting for token issuance.

use crate::core::container::ContainerHandle;
use crate::util::ContainerId;

/// Ordered, duplicate-free staging list.
#[derive(Default)]
pub struct AllocationStaging {
    staged: Vec<ContainerHandle>,
}

impl AllocationStaging {
    /// Create an empty staging list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handle. Returns false if the container is already staged.
    pub fn stage(&mut self, handle: ContainerHandle) -> bool {
        let id = handle.container_id();
        if self.contains(&id) {
            return false;
        }
        self.staged.push(handle);
        true
    }

    /// True if the container is staged.
    #[must_use]
    pub fn contains(&self, id: &ContainerId) -> bool {
        self.staged.iter().any(|h| h.container_id() == *id)
    }

    /// Handle of a staged container.
    #[must_use]
    pub fn get(&self, id: &ContainerId) -> Option<&ContainerHandle> {
        self.staged.iter().find(|h| h.container_id() == *id)
    }

    /// Remove a container, returning its handle.
    pub fn remove(&mut self, id: &ContainerId) -> Option<ContainerHandle> {
        let idx = self.staged.iter().position(|h| h.container_id() == *id)?;
        Some(self.staged.remove(idx))
    }

    /// Staged handles in staging order.
    #[must_use]
    pub fn handles(&self) -> &[ContainerHandle] {
        &self.staged
    }

    /// Number of staged containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// True if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Replace the whole list, used when rebuilding after a restart.
    pub fn replace(&mut self, handles: Vec<ContainerHandle>) {
        self.staged.clear();
        for handle in handles {
            self.stage(handle);
        }
    }
}
