//! Reference implementations of the ledger's collaborators: container state
//! machines, token issuance, node dispatch, queues, request books and state
//! stores.

pub mod container;
pub mod dispatch;
pub mod queue;
pub mod requests;
pub mod store;
pub mod tokens;

pub use container::{TrackedContainer, TrackedContainerFactory};
pub use dispatch::{ChannelNodeDispatcher, NodeEvent};
pub use queue::{InMemoryQueueMetrics, LeafQueue, MetricsCall, UserUsage};
pub use requests::InMemoryRequestBook;
pub use store::{
    InMemoryStateStore, JsonlStateStore, LedgerUpdate, StateStore, StoreSnapshot, StoreTransaction,
};
pub use tokens::{LocalTokenIssuer, NodeResolver, StaticResolver, SystemResolver};
