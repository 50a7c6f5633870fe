//! Container records and the state-machine interface the ledger drives.
//!
//! The ledger never owns a container's lifecycle. It holds shared handles and
//! delivers one event per transition it is responsible for.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::util::{AttemptId, ContainerId, NodeId, Priority, ResourceAmount};

/// Credential that lets the application start a container on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerToken {
    /// Opaque token identifier.
    pub identifier: String,
    /// Resolved node address the token is bound to.
    pub node_address: String,
    /// User the container runs as.
    pub user: String,
    /// Resource the token authorizes.
    pub resource: ResourceAmount,
}

/// Credential that lets the application talk to a node agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NmToken {
    /// Node the token is valid for.
    pub node_id: NodeId,
    /// Opaque token identifier.
    pub identifier: String,
}

/// A slice of cluster resource on a specific node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container identifier.
    pub id: ContainerId,
    /// Node hosting the container.
    pub node_id: NodeId,
    /// Priority of the request the container satisfies.
    pub priority: Priority,
    /// Granted resource.
    pub resource: ResourceAmount,
    /// Container token, set on acquisition.
    pub token: Option<ContainerToken>,
}

impl Container {
    /// Create a container without a token.
    #[must_use]
    pub const fn new(
        id: ContainerId,
        node_id: NodeId,
        priority: Priority,
        resource: ResourceAmount,
    ) -> Self {
        Self {
            id,
            node_id,
            priority,
            resource,
            token: None,
        }
    }
}

/// Lifecycle states of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    /// Created, no event delivered yet.
    New,
    /// Held at a (priority, node) slot.
    Reserved,
    /// Decided for allocation and staged for hand-off.
    Allocated,
    /// Tokens minted and handed to the application.
    Acquired,
    /// Launch confirmed by the node agent.
    Running,
    /// Finished, killed or released.
    Completed,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "NEW",
            Self::Reserved => "RESERVED",
            Self::Allocated => "ALLOCATED",
            Self::Acquired => "ACQUIRED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

/// Payload of a reservation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedEvent {
    /// Container being reserved.
    pub container_id: ContainerId,
    /// Resource held by the reservation.
    pub resource: ResourceAmount,
    /// Node of the reserved slot.
    pub node_id: NodeId,
    /// Priority of the reserved slot.
    pub priority: Priority,
}

/// A container's own lifecycle object.
///
/// Each method is one transition the ledger is allowed to drive. Delivery is
/// fire-and-forget; subsequent transitions belong to the implementation.
pub trait ContainerStateMachine: Send + Sync {
    /// Snapshot of the container record.
    fn container(&self) -> Container;

    /// Current lifecycle state.
    fn state(&self) -> ContainerState;

    /// Resource held by the latest reservation, if the container was reserved.
    fn reserved_resource(&self) -> Option<ResourceAmount>;

    /// The container was reserved (or re-reserved) at a slot.
    fn on_reserved(&self, event: ReservedEvent);

    /// The container was decided for allocation and staged.
    fn on_allocated(&self);

    /// Tokens were minted and the container was handed to the application.
    fn on_acquired(&self);

    /// A node agent confirmed the launch.
    fn on_launched(&self);

    /// Container id shortcut.
    fn container_id(&self) -> ContainerId {
        self.container().id
    }
}

/// Shared reference to a container state machine.
pub type ContainerHandle = Arc<dyn ContainerStateMachine>;

/// Creates and rebuilds container handles.
pub trait ContainerFactory: Send + Sync {
    /// Create a fresh handle in [`ContainerState::New`].
    fn create(&self, container: Container, attempt: &AttemptId, user: &str) -> ContainerHandle;

    /// Rebuild a handle for a persisted container in the given state.
    fn restore(&self, container: Container, state: ContainerState) -> ContainerHandle;
}
