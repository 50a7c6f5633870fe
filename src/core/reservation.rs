//! Reservations keyed by (priority, node).

use std::collections::{BTreeMap, HashMap};

use crate::core::container::ContainerHandle;
use crate::core::counters::PriorityCounter;
use crate::util::{NodeId, Priority};

/// Reserved container handles plus the re-reservation counter.
///
/// A (priority, node) key holds at most one handle.
#[derive(Default)]
pub struct ReservationTable {
    slots: BTreeMap<Priority, HashMap<NodeId, ContainerHandle>>,
    re_reservations: PriorityCounter,
}

impl ReservationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle, returning whatever was there before for that key.
    pub fn insert(
        &mut self,
        priority: Priority,
        node: NodeId,
        handle: ContainerHandle,
    ) -> Option<ContainerHandle> {
        self.slots.entry(priority).or_default().insert(node, handle)
    }

    /// Remove the handle at a key.
    pub fn remove(&mut self, priority: Priority, node: &NodeId) -> Option<ContainerHandle> {
        let nodes = self.slots.get_mut(&priority)?;
        let removed = nodes.remove(node);
        if nodes.is_empty() {
            self.slots.remove(&priority);
        }
        removed
    }

    /// Handle at a key.
    #[must_use]
    pub fn get(&self, priority: Priority, node: &NodeId) -> Option<&ContainerHandle> {
        self.slots.get(&priority).and_then(|nodes| nodes.get(node))
    }

    /// True if the key holds a handle.
    #[must_use]
    pub fn contains(&self, priority: Priority, node: &NodeId) -> bool {
        self.get(priority, node).is_some()
    }

    /// Number of nodes reserved at a priority.
    #[must_use]
    pub fn count_at(&self, priority: Priority) -> usize {
        self.slots.get(&priority).map_or(0, HashMap::len)
    }

    /// Number of reserved handles across all priorities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.values().map(HashMap::len).sum()
    }

    /// True if nothing is reserved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All reserved handles, ordered by priority.
    pub fn handles(&self) -> impl Iterator<Item = &ContainerHandle> {
        self.slots.values().flat_map(HashMap::values)
    }

    /// Note a reservation call that made no progress at an existing slot.
    pub fn add_re_reservation(&mut self, priority: Priority) -> u32 {
        self.re_reservations.increment(priority)
    }

    /// Clear the re-reservation count after a fresh reservation.
    pub fn reset_re_reservations(&mut self, priority: Priority) {
        self.re_reservations.reset(priority);
    }

    /// Re-reservations since the last fresh reservation at a priority.
    #[must_use]
    pub fn re_reservations(&self, priority: Priority) -> u32 {
        self.re_reservations.count(priority)
    }
}
