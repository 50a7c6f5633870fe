//! Live containers held by an attempt.

use std::collections::HashMap;

use crate::core::container::ContainerHandle;
use crate::util::ContainerId;

/// Container id to handle, for containers acquired and not yet completed.
#[derive(Default)]
pub struct ContainerRegistry {
    containers: HashMap<ContainerId, ContainerHandle>,
}

impl ContainerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under its container id.
    pub fn insert(&mut self, handle: ContainerHandle) -> Option<ContainerHandle> {
        self.containers.insert(handle.container_id(), handle)
    }

    /// Look up a handle.
    #[must_use]
    pub fn get(&self, id: &ContainerId) -> Option<&ContainerHandle> {
        self.containers.get(id)
    }

    /// Remove a handle.
    pub fn remove(&mut self, id: &ContainerId) -> Option<ContainerHandle> {
        self.containers.remove(id)
    }

    /// Number of live containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// True if no container is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// All live handles.
    pub fn handles(&self) -> impl Iterator<Item = &ContainerHandle> {
        self.containers.values()
    }
}
