//! Interfaces of the services the ledger calls out to.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::container::{Container, ContainerHandle, ContainerToken, NmToken};
use crate::core::txn::{AttemptFinalState, PersistedAttemptInfo, ResourceField, TxnContext};
use crate::core::{LedgerError, TokenError};
use crate::util::{AttemptId, ContainerId, NodeId, Priority, ResourceAmount};

/// An application's ask for containers at one priority and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Request priority.
    pub priority: Priority,
    /// Host, rack, or [`ResourceRequest::ANY`].
    pub resource_name: String,
    /// Size of each container.
    pub capability: ResourceAmount,
    /// Number of containers wanted.
    pub num_containers: u32,
    /// Whether the scheduler may place the request elsewhere.
    pub relax_locality: bool,
}

impl ResourceRequest {
    /// Resource name matching any location.
    pub const ANY: &'static str = "*";

    /// Request for `num_containers` of `capability` anywhere.
    #[must_use]
    pub fn any(priority: Priority, capability: ResourceAmount, num_containers: u32) -> Self {
        Self {
            priority,
            resource_name: Self::ANY.to_string(),
            capability,
            num_containers,
            relax_locality: true,
        }
    }
}

/// Per-priority request book of an attempt.
pub trait RequestBook: Send {
    /// Attempt the book belongs to.
    fn attempt_id(&self) -> AttemptId;

    /// Submitting user.
    fn user(&self) -> &str;

    /// Name of the queue the attempt runs in.
    fn queue_name(&self) -> &str;

    /// Merge new requests.
    fn update_resource_requests(
        &mut self,
        requests: &[ResourceRequest],
        txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError>;

    /// Add and remove blacklisted resource names.
    fn update_blacklist(
        &mut self,
        additions: &[String],
        removals: &[String],
        txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError>;

    /// Whether a resource name is blacklisted.
    fn is_blacklisted(&self, resource_name: &str) -> bool;

    /// Whether the attempt is still waiting to be scheduled.
    fn is_pending(&self) -> bool;

    /// Priorities with outstanding requests.
    fn priorities(&self) -> Vec<Priority>;

    /// All requests at a priority, keyed by resource name.
    fn resource_requests(&self, priority: Priority) -> Option<HashMap<String, ResourceRequest>>;

    /// One request at a priority and resource name.
    fn resource_request(&self, priority: Priority, resource_name: &str) -> Option<ResourceRequest>;

    /// Hand out the next container sequence number.
    fn new_container_id(&mut self) -> u64;

    /// Last container sequence number handed out.
    fn last_container_id(&self) -> u64;

    /// Stop the book with the attempt's final state.
    fn stop(
        &mut self,
        final_state: AttemptFinalState,
        txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError>;

    /// Restore from a persisted attempt row.
    fn recover(&mut self, info: &PersistedAttemptInfo);

    /// Take over the state of the previous attempt's book.
    fn transfer_state_from(&mut self, previous: Self)
    where
        Self: Sized;

    /// Re-home the book under another queue.
    fn move_to_queue(&mut self, queue: &QueueRef);
}

/// Accounting side of a queue.
pub trait QueueMetrics: Send + Sync {
    /// Containers released by a user.
    fn release_resources(&self, user: &str, containers: u32, resource: ResourceAmount);

    /// Containers allocated to a user.
    fn allocate_resources(
        &self,
        user: &str,
        containers: u32,
        resource: ResourceAmount,
        decr_pending: bool,
    );

    /// Resource reserved for a user.
    fn reserve_resource(&self, user: &str, resource: ResourceAmount);

    /// Reservation released for a user.
    fn unreserve_resource(&self, user: &str, resource: ResourceAmount);
}

/// A scheduler queue as seen by the ledger.
pub trait Queue: Send + Sync {
    /// Queue name.
    fn name(&self) -> &str;

    /// Queue accounting.
    fn metrics(&self) -> &dyn QueueMetrics;
}

/// Shared queue reference.
pub type QueueRef = Arc<dyn Queue>;

/// Mints container and node-manager tokens.
pub trait TokenIssuer: Send + Sync {
    /// Mint a container token.
    fn create_container_token(
        &self,
        container_id: &ContainerId,
        node_id: &NodeId,
        user: &str,
        resource: ResourceAmount,
    ) -> Result<ContainerToken, TokenError>;

    /// Mint a node-manager token, or `None` if the attempt already holds one
    /// for the container's node.
    fn create_nm_token(
        &self,
        user: &str,
        attempt: &AttemptId,
        container: &Container,
    ) -> Result<Option<NmToken>, TokenError>;

    /// Withdraw a node-manager token that was minted but never delivered, so
    /// the next `create_nm_token` for the node mints it again.
    fn revoke_nm_token(&self, _attempt: &AttemptId, _node_id: &NodeId) {}
}

/// Sends requests to remote node agents.
pub trait NodeEventHandler: Send + Sync {
    /// Ask a node to kill and clean up a container the ledger does not know.
    fn clean_container(&self, node_id: &NodeId, container_id: &ContainerId, txn: &mut TxnContext<'_>);
}

/// Read-only view of persisted ledger state, used by recovery.
pub trait RecoveryStore {
    /// Persisted resource row, if one exists.
    fn resource(
        &self,
        attempt: &AttemptId,
        field: ResourceField,
    ) -> Result<Option<ResourceAmount>, LedgerError>;

    /// Ids of containers persisted as staged.
    fn staged_container_ids(&self, attempt: &AttemptId) -> Result<Vec<ContainerId>, LedgerError>;

    /// Ids of containers persisted as live.
    fn live_container_ids(&self, attempt: &AttemptId) -> Result<Vec<ContainerId>, LedgerError>;

    /// Rebuild a handle for a persisted container.
    fn resolve_container(&self, container_id: &ContainerId) -> Result<ContainerHandle, LedgerError>;
}
