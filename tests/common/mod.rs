//! Shared fixtures for ledger integration tests.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use attempt_ledger::core::{
    AttemptLedger, Container, LedgerContext, LedgerError, PersistedAttemptInfo, ResourceField,
    TransactionScope,
};
use attempt_ledger::infra::{
    ChannelNodeDispatcher, InMemoryRequestBook, LeafQueue, LocalTokenIssuer, NodeEvent,
    StaticResolver, TrackedContainerFactory,
};
use attempt_ledger::util::{
    ApplicationId, AttemptId, ContainerId, NodeId, Priority, ResourceAmount,
};
use crossbeam_channel::Receiver;

pub const USER: &str = "alice";
pub const P1: Priority = Priority(1);
pub const P2: Priority = Priority(2);

pub fn application() -> ApplicationId {
    ApplicationId::new(1_700_000_000_000, 42)
}

pub fn attempt(n: u32) -> AttemptId {
    AttemptId::new(application(), n)
}

pub fn node(host: &str) -> NodeId {
    NodeId::new(host, 8041)
}

pub fn res(memory: i64, cores: i32) -> ResourceAmount {
    ResourceAmount::new(memory, cores)
}

pub fn container(attempt: AttemptId, id: u64, host: &str, memory: i64, cores: i32) -> Container {
    Container::new(
        ContainerId::new(attempt, id),
        node(host),
        P1,
        res(memory, cores),
    )
}

/// Collaborators wired the way a resource manager would wire them, with
/// typed handles kept for assertions.
pub struct Harness {
    pub factory: Arc<TrackedContainerFactory>,
    pub resolver: Arc<StaticResolver>,
    pub issuer: Arc<LocalTokenIssuer>,
    pub node_events: Receiver<NodeEvent>,
    pub queue: Arc<LeafQueue>,
    pub context: LedgerContext,
}

impl Harness {
    /// Hosts `n1`..`n3` resolve to `10.0.0.1`..`10.0.0.3`.
    pub fn new() -> Self {
        let factory = Arc::new(TrackedContainerFactory::new());
        let resolver = Arc::new(StaticResolver::new());
        for i in 1..=3u8 {
            resolver.insert(format!("n{i}"), IpAddr::V4(Ipv4Addr::new(10, 0, 0, i)));
        }
        let issuer = Arc::new(LocalTokenIssuer::new(resolver.clone()));
        let (dispatcher, node_events) = ChannelNodeDispatcher::unbounded();
        let context = LedgerContext::new(factory.clone(), issuer.clone(), Arc::new(dispatcher));
        Self {
            factory,
            resolver,
            issuer,
            node_events,
            queue: LeafQueue::shared("root.default"),
            context,
        }
    }

    pub fn book(&self, attempt: AttemptId) -> InMemoryRequestBook {
        InMemoryRequestBook::new(attempt, USER, self.queue_name())
    }

    pub fn queue_name(&self) -> String {
        "root.default".to_string()
    }

    pub fn ledger(&self, attempt: AttemptId) -> AttemptLedger<InMemoryRequestBook> {
        AttemptLedger::new(self.book(attempt), self.queue.clone(), self.context.clone())
    }
}

/// Scope whose every write fails as if the store were full.
pub struct RejectingScope;

impl TransactionScope for RejectingScope {
    fn update_resource(
        &mut self,
        _attempt: &AttemptId,
        _field: ResourceField,
        _value: ResourceAmount,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::Persistence("disk full".into()))
    }

    fn update_attempt_info(&mut self, _info: &PersistedAttemptInfo) -> Result<(), LedgerError> {
        Err(LedgerError::Persistence("disk full".into()))
    }

    fn add_staged_container(
        &mut self,
        _attempt: &AttemptId,
        _container: &Container,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::Persistence("disk full".into()))
    }

    fn remove_staged_container(
        &mut self,
        _attempt: &AttemptId,
        _container_id: &ContainerId,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::Persistence("disk full".into()))
    }

    fn add_live_container(
        &mut self,
        _attempt: &AttemptId,
        _container: &Container,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::Persistence("disk full".into()))
    }

    fn remove_live_container(
        &mut self,
        _attempt: &AttemptId,
        _container_id: &ContainerId,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::Persistence("disk full".into()))
    }
}
