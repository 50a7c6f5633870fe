//! In-memory leaf queue with per-user accounting.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{Queue, QueueMetrics};
use crate::util::ResourceAmount;

/// Accounting totals of one user in one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserUsage {
    /// Containers allocated.
    pub allocated_containers: i64,
    /// Resource allocated.
    pub allocated: ResourceAmount,
    /// Containers reserved.
    pub reserved_containers: i64,
    /// Resource reserved.
    pub reserved: ResourceAmount,
}

/// A metrics call, recorded in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsCall {
    /// `release_resources`.
    Release {
        /// User.
        user: String,
        /// Containers.
        containers: u32,
        /// Resource per container.
        resource: ResourceAmount,
    },
    /// `allocate_resources`.
    Allocate {
        /// User.
        user: String,
        /// Containers.
        containers: u32,
        /// Resource per container.
        resource: ResourceAmount,
    },
    /// `reserve_resource`.
    Reserve {
        /// User.
        user: String,
        /// Resource.
        resource: ResourceAmount,
    },
    /// `unreserve_resource`.
    Unreserve {
        /// User.
        user: String,
        /// Resource.
        resource: ResourceAmount,
    },
}

#[derive(Default)]
struct MetricsInner {
    users: HashMap<String, UserUsage>,
    calls: Vec<MetricsCall>,
}

/// Per-user queue metrics.
#[derive(Default)]
pub struct InMemoryQueueMetrics {
    inner: Mutex<MetricsInner>,
}

impl InMemoryQueueMetrics {
    /// Totals for a user.
    pub fn user(&self, user: &str) -> UserUsage {
        self.inner.lock().users.get(user).copied().unwrap_or_default()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<MetricsCall> {
        self.inner.lock().calls.clone()
    }
}

fn scaled(resource: ResourceAmount, containers: u32) -> ResourceAmount {
    ResourceAmount::new(
        resource.memory * i64::from(containers),
        resource.cores * i32::try_from(containers).unwrap_or(i32::MAX),
    )
}

impl QueueMetrics for InMemoryQueueMetrics {
    fn release_resources(&self, user: &str, containers: u32, resource: ResourceAmount) {
        let mut inner = self.inner.lock();
        let usage = inner.users.entry(user.to_string()).or_default();
        usage.allocated_containers -= i64::from(containers);
        usage.allocated -= scaled(resource, containers);
        inner.calls.push(MetricsCall::Release {
            user: user.to_string(),
            containers,
            resource,
        });
    }

    fn allocate_resources(
        &self,
        user: &str,
        containers: u32,
        resource: ResourceAmount,
        _decr_pending: bool,
    ) {
        let mut inner = self.inner.lock();
        let usage = inner.users.entry(user.to_string()).or_default();
        usage.allocated_containers += i64::from(containers);
        usage.allocated += scaled(resource, containers);
        inner.calls.push(MetricsCall::Allocate {
            user: user.to_string(),
            containers,
            resource,
        });
    }

    fn reserve_resource(&self, user: &str, resource: ResourceAmount) {
        let mut inner = self.inner.lock();
        let usage = inner.users.entry(user.to_string()).or_default();
        usage.reserved_containers += 1;
        usage.reserved += resource;
        inner.calls.push(MetricsCall::Reserve {
            user: user.to_string(),
            resource,
        });
    }

    fn unreserve_resource(&self, user: &str, resource: ResourceAmount) {
        let mut inner = self.inner.lock();
        let usage = inner.users.entry(user.to_string()).or_default();
        usage.reserved_containers -= 1;
        usage.reserved -= resource;
        inner.calls.push(MetricsCall::Unreserve {
            user: user.to_string(),
            resource,
        });
    }
}

/// Named queue owning its metrics.
pub struct LeafQueue {
    name: String,
    metrics: InMemoryQueueMetrics,
}

impl LeafQueue {
    /// Create a queue.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metrics: InMemoryQueueMetrics::default(),
        }
    }

    /// Create a queue behind an `Arc`.
    pub fn shared(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    /// Typed access to the metrics.
    pub const fn accounting(&self) -> &InMemoryQueueMetrics {
        &self.metrics
    }
}

impl Queue for LeafQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn metrics(&self) -> &dyn QueueMetrics {
        &self.metrics
    }
}
