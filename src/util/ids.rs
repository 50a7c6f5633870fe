//! Identifiers for applications, attempts, containers, nodes and priorities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one application submitted to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId {
    /// Start time of the resource manager that accepted the application.
    pub cluster_timestamp: u64,
    /// Sequence number within that resource manager.
    pub id: u32,
}

impl ApplicationId {
    /// Create an application id.
    #[must_use]
    pub const fn new(cluster_timestamp: u64, id: u32) -> Self {
        Self { cluster_timestamp, id }
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "application_{}_{:04}", self.cluster_timestamp, self.id)
    }
}

/// Identifier of one attempt of an application. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttemptId {
    /// Owning application.
    pub application: ApplicationId,
    /// Attempt number, starting at 1.
    pub attempt: u32,
}

impl AttemptId {
    /// Create an attempt id.
    #[must_use]
    pub const fn new(application: ApplicationId, attempt: u32) -> Self {
        Self { application, attempt }
    }

    /// The attempt that follows this one after a failover.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self {
            application: self.application,
            attempt: self.attempt + 1,
        }
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "appattempt_{}_{:04}_{:06}",
            self.application.cluster_timestamp, self.application.id, self.attempt
        )
    }
}

/// Identifier of a container granted to an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId {
    /// Attempt that owns the container.
    pub attempt: AttemptId,
    /// Sequence number within the attempt.
    pub id: u64,
}

impl ContainerId {
    /// Create a container id.
    #[must_use]
    pub const fn new(attempt: AttemptId, id: u64) -> Self {
        Self { attempt, id }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "container_{}_{:04}_{:02}_{:06}",
            self.attempt.application.cluster_timestamp,
            self.attempt.application.id,
            self.attempt.attempt,
            self.id
        )
    }
}

/// Address of a node agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    /// Host name.
    pub host: String,
    /// Agent port.
    pub port: u16,
}

impl NodeId {
    /// Create a node id.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Request priority. Lower values are served first by the cluster scheduler;
/// the ledger only uses the ordering for deterministic iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(pub u32);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
