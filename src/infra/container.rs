//! Reference container state machine.
//!
//! Tracks the state the ledger drives and keeps the event history, which is
//! what a scheduler embedding the ledger without its own lifecycle needs.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::core::{
    Container, ContainerFactory, ContainerHandle, ContainerState, ContainerStateMachine,
    ReservedEvent,
};
use crate::util::{AttemptId, ResourceAmount};

struct TrackedInner {
    container: Container,
    state: ContainerState,
    reserved: Option<ReservedEvent>,
    history: Vec<ContainerState>,
}

/// Container lifecycle object guarded by its own mutex.
pub struct TrackedContainer {
    inner: Mutex<TrackedInner>,
}

impl TrackedContainer {
    /// Create a container in the given state.
    #[must_use]
    pub fn new(container: Container, state: ContainerState) -> Self {
        Self {
            inner: Mutex::new(TrackedInner {
                container,
                state,
                reserved: None,
                history: vec![state],
            }),
        }
    }

    /// States entered so far, oldest first.
    pub fn history(&self) -> Vec<ContainerState> {
        self.inner.lock().history.clone()
    }

    /// Latest reservation event, if any.
    pub fn last_reservation(&self) -> Option<ReservedEvent> {
        self.inner.lock().reserved.clone()
    }

    /// Mark the container finished. The ledger never does this; the node
    /// report path does.
    pub fn complete(&self) {
        self.transition(ContainerState::Completed);
    }

    fn transition(&self, next: ContainerState) {
        let mut inner = self.inner.lock();
        if inner.state == ContainerState::Completed {
            debug!(container = %inner.container.id, %next, "ignoring event on completed container");
            return;
        }
        debug!(container = %inner.container.id, from = %inner.state, to = %next, "container transition");
        inner.state = next;
        inner.history.push(next);
    }
}

impl ContainerStateMachine for TrackedContainer {
    fn container(&self) -> Container {
        self.inner.lock().container.clone()
    }

    fn state(&self) -> ContainerState {
        self.inner.lock().state
    }

    fn reserved_resource(&self) -> Option<ResourceAmount> {
        self.inner.lock().reserved.as_ref().map(|e| e.resource)
    }

    fn on_reserved(&self, event: ReservedEvent) {
        self.inner.lock().reserved = Some(event);
        self.transition(ContainerState::Reserved);
    }

    fn on_allocated(&self) {
        self.transition(ContainerState::Allocated);
    }

    fn on_acquired(&self) {
        self.transition(ContainerState::Acquired);
    }

    fn on_launched(&self) {
        self.transition(ContainerState::Running);
    }
}

/// Factory producing [`TrackedContainer`]s.
///
/// Keeps a typed reference to every container it made so callers can look at
/// their histories.
#[derive(Default)]
pub struct TrackedContainerFactory {
    created: Mutex<Vec<Arc<TrackedContainer>>>,
}

impl TrackedContainerFactory {
    /// Create a factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every container created or restored so far.
    pub fn created(&self) -> Vec<Arc<TrackedContainer>> {
        self.created.lock().clone()
    }

    fn track(&self, container: Container, state: ContainerState) -> ContainerHandle {
        let tracked = Arc::new(TrackedContainer::new(container, state));
        self.created.lock().push(Arc::clone(&tracked));
        tracked
    }
}

impl ContainerFactory for TrackedContainerFactory {
    fn create(&self, container: Container, attempt: &AttemptId, user: &str) -> ContainerHandle {
        debug!(container = %container.id, %attempt, user, "creating container");
        self.track(container, ContainerState::New)
    }

    fn restore(&self, container: Container, state: ContainerState) -> ContainerHandle {
        self.track(container, state)
    }
}
