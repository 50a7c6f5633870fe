//! Channel-backed delivery of node requests.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{info, warn};

use crate::core::{NodeEventHandler, TxnContext};
use crate::util::{ContainerId, NodeId};

/// Requests addressed to a node agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// Kill and clean up a container the scheduler does not know about.
    CleanContainer {
        /// Node hosting the container.
        node_id: NodeId,
        /// Container to clean up.
        container_id: ContainerId,
    },
}

/// Sends node requests over a channel to whatever delivers them.
#[derive(Clone)]
pub struct ChannelNodeDispatcher {
    sender: Sender<NodeEvent>,
}

impl ChannelNodeDispatcher {
    /// Create a dispatcher and the receiving end of its channel.
    #[must_use]
    pub fn unbounded() -> (Self, Receiver<NodeEvent>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl NodeEventHandler for ChannelNodeDispatcher {
    fn clean_container(&self, node_id: &NodeId, container_id: &ContainerId, _txn: &mut TxnContext<'_>) {
        let event = NodeEvent::CleanContainer {
            node_id: node_id.clone(),
            container_id: *container_id,
        };
        match self.sender.send(event) {
            Ok(()) => info!(node = %node_id, container = %container_id, "queued container cleanup"),
            Err(_) => warn!(node = %node_id, container = %container_id, "node event receiver gone; cleanup dropped"),
        }
    }
}
