//! Local token issuer.
//!
//! Tokens carry a random identifier and the resolved node address. Minting
//! fails with [`TokenError::Unresolvable`] when the node's host cannot be
//! resolved, which is the failure the ledger retries on the next pull.

use std::collections::{HashMap, HashSet};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::core::{Container, ContainerToken, NmToken, TokenError, TokenIssuer};
use crate::util::{AttemptId, ContainerId, NodeId, ResourceAmount};

/// Resolves node ids to socket addresses.
pub trait NodeResolver: Send + Sync {
    /// Resolve a node.
    fn resolve(&self, node: &NodeId) -> Result<SocketAddr, TokenError>;
}

/// Resolver backed by the system's name service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl NodeResolver for SystemResolver {
    fn resolve(&self, node: &NodeId) -> Result<SocketAddr, TokenError> {
        (node.host.as_str(), node.port)
            .to_socket_addrs()
            .map_err(|e| TokenError::Unresolvable {
                node: node.clone(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| TokenError::Unresolvable {
                node: node.clone(),
                reason: "no addresses returned".into(),
            })
    }
}

/// Resolver over a fixed host table. Hosts can be added and removed at
/// runtime, which models a name service losing and regaining entries.
#[derive(Debug, Default)]
pub struct StaticResolver {
    hosts: RwLock<HashMap<String, std::net::IpAddr>>,
}

impl StaticResolver {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a host entry.
    pub fn insert(&self, host: impl Into<String>, addr: std::net::IpAddr) {
        self.hosts.write().insert(host.into(), addr);
    }

    /// Remove a host entry.
    pub fn remove(&self, host: &str) {
        self.hosts.write().remove(host);
    }
}

impl NodeResolver for StaticResolver {
    fn resolve(&self, node: &NodeId) -> Result<SocketAddr, TokenError> {
        self.hosts
            .read()
            .get(&node.host)
            .map(|ip| SocketAddr::new(*ip, node.port))
            .ok_or_else(|| TokenError::Unresolvable {
                node: node.clone(),
                reason: "unknown host".into(),
            })
    }
}

/// Issuer that mints tokens in-process.
///
/// Node-manager tokens are minted once per (attempt, node); later requests for
/// the same pair return `None`.
pub struct LocalTokenIssuer {
    resolver: Arc<dyn NodeResolver>,
    nm_tokens_issued: Mutex<HashMap<AttemptId, HashSet<NodeId>>>,
}

impl LocalTokenIssuer {
    /// Create an issuer using the given resolver.
    pub fn new(resolver: Arc<dyn NodeResolver>) -> Self {
        Self {
            resolver,
            nm_tokens_issued: Mutex::new(HashMap::new()),
        }
    }

    /// Forget the node-manager tokens issued to an attempt.
    pub fn clear_attempt(&self, attempt: &AttemptId) {
        self.nm_tokens_issued.lock().remove(attempt);
    }
}

impl TokenIssuer for LocalTokenIssuer {
    fn create_container_token(
        &self,
        container_id: &ContainerId,
        node_id: &NodeId,
        user: &str,
        resource: ResourceAmount,
    ) -> Result<ContainerToken, TokenError> {
        let addr = self.resolver.resolve(node_id)?;
        debug!(container = %container_id, node = %node_id, %addr, "minted container token");
        Ok(ContainerToken {
            identifier: Uuid::new_v4().to_string(),
            node_address: addr.to_string(),
            user: user.to_string(),
            resource,
        })
    }

    fn create_nm_token(
        &self,
        user: &str,
        attempt: &AttemptId,
        container: &Container,
    ) -> Result<Option<NmToken>, TokenError> {
        let mut issued = self.nm_tokens_issued.lock();
        let nodes = issued.entry(*attempt).or_default();
        if nodes.contains(&container.node_id) {
            return Ok(None);
        }
        self.resolver.resolve(&container.node_id)?;
        nodes.insert(container.node_id.clone());
        debug!(%attempt, node = %container.node_id, user, "minted NM token");
        Ok(Some(NmToken {
            node_id: container.node_id.clone(),
            identifier: Uuid::new_v4().to_string(),
        }))
    }

    fn revoke_nm_token(&self, attempt: &AttemptId, node_id: &NodeId) {
        if let Some(nodes) = self.nm_tokens_issued.lock().get_mut(attempt) {
            nodes.remove(node_id);
        }
        debug!(%attempt, node = %node_id, "revoked undelivered NM token");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{ApplicationId, Priority};
    use std::net::{IpAddr, Ipv4Addr};

    fn attempt() -> AttemptId {
        AttemptId::new(ApplicationId::new(1, 1), 1)
    }

    fn container(id: u64, host: &str) -> Container {
        Container::new(
            ContainerId::new(attempt(), id),
            NodeId::new(host, 8041),
            Priority(1),
            ResourceAmount::new(512, 1),
        )
    }

    #[test]
    fn test_nm_token_minted_once_per_node() {
        let resolver = Arc::new(StaticResolver::new());
        resolver.insert("node-a", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        let issuer = LocalTokenIssuer::new(resolver);

        let first = issuer.create_nm_token("alice", &attempt(), &container(1, "node-a")).unwrap();
        let second = issuer.create_nm_token("alice", &attempt(), &container(2, "node-a")).unwrap();
        assert!(first.is_some());
        assert!(second.is_none());

        issuer.clear_attempt(&attempt());
        let third = issuer.create_nm_token("alice", &attempt(), &container(3, "node-a")).unwrap();
        assert!(third.is_some());
    }

    #[test]
    fn test_revoked_nm_token_is_minted_again() {
        let resolver = Arc::new(StaticResolver::new());
        resolver.insert("node-a", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        let issuer = LocalTokenIssuer::new(resolver);

        let c = container(1, "node-a");
        assert!(issuer.create_nm_token("alice", &attempt(), &c).unwrap().is_some());
        issuer.revoke_nm_token(&attempt(), &c.node_id);
        assert!(issuer.create_nm_token("alice", &attempt(), &c).unwrap().is_some());
        assert!(issuer.create_nm_token("alice", &attempt(), &c).unwrap().is_none());
    }

    #[test]
    fn test_unknown_host_is_unresolvable() {
        let issuer = LocalTokenIssuer::new(Arc::new(StaticResolver::new()));
        let c = container(1, "ghost");
        let err = issuer
            .create_container_token(&c.id, &c.node_id, "alice", c.resource)
            .unwrap_err();
        assert!(matches!(err, TokenError::Unresolvable { .. }));
    }

    #[test]
    fn test_container_token_binds_resolved_address() {
        let resolver = Arc::new(StaticResolver::new());
        resolver.insert("node-a", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        let issuer = LocalTokenIssuer::new(resolver);
        let c = container(1, "node-a");

        let token = issuer
            .create_container_token(&c.id, &c.node_id, "alice", c.resource)
            .unwrap();
        assert_eq!(token.node_address, "10.0.0.1:8041");
        assert_eq!(token.user, "alice");
        assert_eq!(token.resource, c.resource);
    }
}
