//! Per-attempt scheduling ledger.
//!
//! One [`AttemptLedger`] exists per application attempt admitted to the
//! scheduler. It tracks what the attempt holds, what it has reserved, what is
//! staged for hand-off, and the delay-scheduling counters.
//!
//! Every public method takes the ledger's `parking_lot::Mutex` exactly once,
//! so a ledger behaves as a monitor: one operation at a time per attempt,
//! while distinct attempts run fully in parallel. Persistence calls are made
//! inside the critical section through the caller's [`TxnContext`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn, Level};

use crate::core::audit::{build_audit_event, AuditSink, LedgerAction};
use crate::core::collaborators::{
    NodeEventHandler, QueueRef, RecoveryStore, RequestBook, ResourceRequest, TokenIssuer,
};
use crate::core::container::{
    Container, ContainerFactory, ContainerHandle, NmToken, ReservedEvent,
};
use crate::core::counters::OpportunityCounters;
use crate::core::registry::ContainerRegistry;
use crate::core::reservation::ReservationTable;
use crate::core::staging::AllocationStaging;
use crate::core::txn::{AttemptFinalState, PersistedAttemptInfo, ResourceField, TxnContext};
use crate::core::{LedgerError, TokenError};
use crate::util::clock::now_ms;
use crate::util::{ApplicationId, AttemptId, ContainerId, NodeId, Priority, ResourceAmount};

/// Services shared by every ledger of a resource manager.
#[derive(Clone)]
pub struct LedgerContext {
    /// Creates container state machines.
    pub containers: Arc<dyn ContainerFactory>,
    /// Mints container and node-manager tokens.
    pub tokens: Arc<dyn TokenIssuer>,
    /// Delivers requests to node agents.
    pub nodes: Arc<dyn NodeEventHandler>,
}

impl LedgerContext {
    /// Bundle the collaborators.
    pub fn new(
        containers: Arc<dyn ContainerFactory>,
        tokens: Arc<dyn TokenIssuer>,
        nodes: Arc<dyn NodeEventHandler>,
    ) -> Self {
        Self {
            containers,
            tokens,
            nodes,
        }
    }
}

/// Containers handed to the application by one pull, with the node-manager
/// tokens minted for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainersAndNmTokens {
    /// Acquired containers, each carrying its container token.
    pub containers: Vec<Container>,
    /// Node-manager tokens minted in this batch.
    pub nm_tokens: Vec<NmToken>,
}

/// Point-in-time resource usage of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceUsageReport {
    /// Containers currently held.
    pub live_containers: usize,
    /// Containers currently reserved.
    pub reserved_containers: usize,
    /// Resource held by allocated containers.
    pub used: ResourceAmount,
    /// Resource held by reservations.
    pub reserved: ResourceAmount,
    /// `used + reserved`.
    pub needed: ResourceAmount,
}

/// Part of the ledger rebuilt by [`AttemptLedger::recover`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryField {
    /// One of the persisted resource rows.
    Resource(ResourceField),
    /// The staging list.
    StagedContainers,
    /// The live container set.
    LiveContainers,
}

/// Result of a best-effort recovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryOutcome {
    failed: Vec<RecoveryField>,
}

impl RecoveryOutcome {
    /// Fields whose lookup failed and were left at their defaults.
    #[must_use]
    pub fn failed(&self) -> &[RecoveryField] {
        &self.failed
    }

    /// True if every lookup succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct LedgerState<R> {
    request_book: R,
    queue: QueueRef,
    live: ContainerRegistry,
    reservations: ReservationTable,
    staging: AllocationStaging,
    opportunities: OpportunityCounters,
    current_reservation: ResourceAmount,
    resource_limit: ResourceAmount,
    current_consumption: ResourceAmount,
    stopped: bool,
    final_state: Option<AttemptFinalState>,
    audit: Option<Box<dyn AuditSink>>,
}

impl<R: RequestBook> LedgerState<R> {
    fn resource_mut(&mut self, field: ResourceField) -> &mut ResourceAmount {
        match field {
            ResourceField::CurrentReservation => &mut self.current_reservation,
            ResourceField::ResourceLimit => &mut self.resource_limit,
            ResourceField::CurrentConsumption => &mut self.current_consumption,
        }
    }

    fn attempt_info(&self, attempt_id: AttemptId, user: &str) -> PersistedAttemptInfo {
        PersistedAttemptInfo {
            attempt_id,
            user: user.to_string(),
            queue: self.request_book.queue_name().to_string(),
            stopped: self.stopped,
            final_state: self.final_state,
            last_container_id: self.request_book.last_container_id(),
        }
    }

    fn audit(
        &mut self,
        attempt: AttemptId,
        container: Option<ContainerId>,
        action: LedgerAction,
        detail: Option<String>,
    ) {
        if let Some(sink) = self.audit.as_mut() {
            sink.record(build_audit_event(attempt, container, action, detail));
        }
    }
}

/// Scheduling ledger of one application attempt.
pub struct AttemptLedger<R: RequestBook> {
    attempt_id: AttemptId,
    user: String,
    context: LedgerContext,
    show_requests: bool,
    state: Mutex<LedgerState<R>>,
}

impl<R: RequestBook> AttemptLedger<R> {
    /// Create the ledger for a newly admitted attempt.
    pub fn new(request_book: R, queue: QueueRef, context: LedgerContext) -> Self {
        let attempt_id = request_book.attempt_id();
        let user = request_book.user().to_string();
        Self {
            attempt_id,
            user,
            context,
            show_requests: false,
            state: Mutex::new(LedgerState {
                request_book,
                queue,
                live: ContainerRegistry::new(),
                reservations: ReservationTable::new(),
                staging: AllocationStaging::new(),
                opportunities: OpportunityCounters::new(),
                current_reservation: ResourceAmount::ZERO,
                resource_limit: ResourceAmount::ZERO,
                current_consumption: ResourceAmount::ZERO,
                stopped: false,
                final_state: None,
                audit: None,
            }),
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.state.get_mut().audit = Some(audit);
        self
    }

    /// Dump requests at debug level after every request update.
    #[must_use]
    pub fn with_show_requests(mut self, enabled: bool) -> Self {
        self.show_requests = enabled;
        self
    }

    /// Attempt this ledger tracks.
    pub const fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    /// Owning application.
    pub const fn application_id(&self) -> ApplicationId {
        self.attempt_id.application
    }

    /// Submitting user.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Name of the queue recorded in the request book.
    pub fn queue_name(&self) -> String {
        self.state.lock().request_book.queue_name().to_string()
    }

    /// Current queue.
    pub fn queue(&self) -> QueueRef {
        Arc::clone(&self.state.lock().queue)
    }

    // ---------------------------------------------------------------------
    // Requests and blacklist
    // ---------------------------------------------------------------------

    /// Forward new resource requests to the request book. Ignored once stopped.
    pub fn update_resource_requests(
        &self,
        requests: &[ResourceRequest],
        txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.stopped {
            debug!(attempt = %self.attempt_id, "ignoring request update on stopped attempt");
            return Ok(());
        }
        state.request_book.update_resource_requests(requests, txn)?;
        if self.show_requests {
            self.log_requests(&state);
        }
        Ok(())
    }

    /// Forward blacklist changes to the request book. Ignored once stopped.
    pub fn update_blacklist(
        &self,
        additions: &[String],
        removals: &[String],
        txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.stopped {
            debug!(attempt = %self.attempt_id, "ignoring blacklist update on stopped attempt");
            return Ok(());
        }
        state.request_book.update_blacklist(additions, removals, txn)
    }

    /// Whether a resource name is blacklisted.
    pub fn is_blacklisted(&self, resource_name: &str) -> bool {
        self.state.lock().request_book.is_blacklisted(resource_name)
    }

    /// Whether the attempt is still waiting to be scheduled.
    pub fn is_pending(&self) -> bool {
        self.state.lock().request_book.is_pending()
    }

    /// Priorities with outstanding requests.
    pub fn priorities(&self) -> Vec<Priority> {
        self.state.lock().request_book.priorities()
    }

    /// All requests at a priority.
    pub fn resource_requests(&self, priority: Priority) -> Option<HashMap<String, ResourceRequest>> {
        self.state.lock().request_book.resource_requests(priority)
    }

    /// One request at a priority and resource name.
    pub fn resource_request(&self, priority: Priority, resource_name: &str) -> Option<ResourceRequest> {
        self.state
            .lock()
            .request_book
            .resource_request(priority, resource_name)
    }

    /// Containers still wanted at a priority, per the off-switch request.
    pub fn total_required_resources(&self, priority: Priority) -> u32 {
        self.resource_request(priority, ResourceRequest::ANY)
            .map_or(0, |r| r.num_containers)
    }

    /// Hand out the next container sequence number and persist it.
    pub fn new_container_id(&self, txn: &mut TxnContext<'_>) -> Result<u64, LedgerError> {
        let mut state = self.state.lock();
        let mut info = state.attempt_info(self.attempt_id, &self.user);
        info.last_container_id += 1;
        txn.update_attempt_info(&info)?;
        Ok(state.request_book.new_container_id())
    }

    /// Last container sequence number handed out.
    pub fn last_container_id(&self) -> u64 {
        self.state.lock().request_book.last_container_id()
    }

    /// Log outstanding requests at debug level.
    pub fn show_requests(&self) {
        let state = self.state.lock();
        self.log_requests(&state);
    }

    fn log_requests(&self, state: &LedgerState<R>) {
        if !tracing::enabled!(Level::DEBUG) {
            return;
        }
        for priority in state.request_book.priorities() {
            let Some(requests) = state.request_book.resource_requests(priority) else {
                continue;
            };
            debug!(
                application = %self.attempt_id.application,
                headroom = %state.resource_limit.with_memory_floored(),
                consumption = state.current_consumption.memory,
                "show requests"
            );
            for request in requests.values() {
                debug!(application = %self.attempt_id.application, ?request, "request");
            }
        }
    }

    // ---------------------------------------------------------------------
    // Reservations
    // ---------------------------------------------------------------------

    /// Reserve `container` at (`priority`, `node`).
    ///
    /// Without an existing handle a new one is created and its resource is
    /// added to the reservation total. With one, the call made no progress at
    /// that slot and only the re-reservation count moves. Either way the handle
    /// receives a reserved event and replaces whatever held the slot.
    pub fn reserve(
        &self,
        node: &NodeId,
        priority: Priority,
        existing: Option<ContainerHandle>,
        container: Container,
        txn: &mut TxnContext<'_>,
    ) -> Result<ContainerHandle, LedgerError> {
        let mut state = self.state.lock();
        let container_id = container.id;
        let resource = container.resource;

        let handle = if let Some(handle) = existing {
            let count = state.reservations.add_re_reservation(priority);
            debug!(
                attempt = %self.attempt_id,
                container = %container_id,
                %priority,
                re_reservations = count,
                "re-reserved without progress"
            );
            state.audit(self.attempt_id, Some(container_id), LedgerAction::ReReserve, None);
            handle
        } else {
            let next = state.current_reservation + resource;
            txn.update_resource(&self.attempt_id, ResourceField::CurrentReservation, next)?;
            let handle = self
                .context
                .containers
                .create(container, &self.attempt_id, &self.user);
            state.current_reservation = next;
            state.reservations.reset_re_reservations(priority);
            state.audit(
                self.attempt_id,
                Some(container_id),
                LedgerAction::Reserve,
                Some(format!("node={node} priority={priority}")),
            );
            handle
        };

        handle.on_reserved(ReservedEvent {
            container_id,
            resource,
            node_id: node.clone(),
            priority,
        });
        state
            .reservations
            .insert(priority, node.clone(), Arc::clone(&handle));

        info!(
            application = %self.attempt_id.application,
            container = %container_id,
            %node,
            %priority,
            reserved_at_priority = state.reservations.count_at(priority),
            current_reservation = state.current_reservation.memory,
            "reserved container"
        );
        Ok(handle)
    }

    /// Release the reservation at (`priority`, `node`).
    pub fn unreserve(
        &self,
        node: &NodeId,
        priority: Priority,
        txn: &mut TxnContext<'_>,
    ) -> Result<Option<ContainerHandle>, LedgerError> {
        let mut state = self.state.lock();
        let Some(handle) = state.reservations.get(priority, node).cloned() else {
            return Ok(None);
        };
        let resource = handle
            .reserved_resource()
            .unwrap_or_else(|| handle.container().resource);
        let (next, underflow) = state.current_reservation.saturating_sub(resource);
        if underflow {
            warn!(
                attempt = %self.attempt_id,
                current = %state.current_reservation,
                %resource,
                "reservation total would go negative; flooring at zero"
            );
        }
        txn.update_resource(&self.attempt_id, ResourceField::CurrentReservation, next)?;
        state.reservations.remove(priority, node);
        state.current_reservation = next;

        let container_id = handle.container_id();
        state.audit(self.attempt_id, Some(container_id), LedgerAction::Unreserve, None);
        info!(
            application = %self.attempt_id.application,
            container = %container_id,
            %node,
            %priority,
            current_reservation = next.memory,
            "unreserved container"
        );
        Ok(Some(handle))
    }

    /// Whether `node` is reserved at `priority`.
    pub fn is_reserved(&self, node: &NodeId, priority: Priority) -> bool {
        self.state.lock().reservations.contains(priority, node)
    }

    /// Number of nodes reserved at `priority`.
    pub fn num_reserved_containers(&self, priority: Priority) -> usize {
        self.state.lock().reservations.count_at(priority)
    }

    /// Re-reservations at `priority` since the last fresh reservation.
    pub fn re_reservations(&self, priority: Priority) -> u32 {
        self.state.lock().reservations.re_reservations(priority)
    }

    /// Every reserved handle.
    pub fn reserved_containers(&self) -> Vec<ContainerHandle> {
        self.state
            .lock()
            .reservations
            .handles()
            .map(Arc::clone)
            .collect()
    }

    /// Sum of reserved resources.
    pub fn current_reservation(&self) -> ResourceAmount {
        self.state.lock().current_reservation
    }

    // ---------------------------------------------------------------------
    // Headroom
    // ---------------------------------------------------------------------

    /// Overwrite the headroom and persist it.
    pub fn set_headroom(
        &self,
        limit: ResourceAmount,
        txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        txn.update_resource(&self.attempt_id, ResourceField::ResourceLimit, limit)?;
        state.resource_limit = limit;
        Ok(())
    }

    /// Headroom with memory floored at zero. Accounting drift can push the
    /// stored limit slightly negative; cores are returned as stored.
    pub fn headroom(&self) -> ResourceAmount {
        self.state.lock().resource_limit.with_memory_floored()
    }

    /// The stored limit, unclamped.
    pub fn resource_limit(&self) -> ResourceAmount {
        self.state.lock().resource_limit
    }

    // ---------------------------------------------------------------------
    // Allocation, acquisition, launch
    // ---------------------------------------------------------------------

    /// Stage a container the scheduler decided to allocate.
    ///
    /// Its resource counts towards consumption from this point. Staging the
    /// same container twice returns the existing handle unchanged.
    pub fn allocate(
        &self,
        container: Container,
        txn: &mut TxnContext<'_>,
    ) -> Result<ContainerHandle, LedgerError> {
        let mut state = self.state.lock();
        let container_id = container.id;
        if let Some(existing) = state
            .staging
            .get(&container_id)
            .or_else(|| state.live.get(&container_id))
        {
            warn!(attempt = %self.attempt_id, container = %container_id, "container already allocated");
            return Ok(Arc::clone(existing));
        }

        let next = state.current_consumption + container.resource;
        txn.update_resource(&self.attempt_id, ResourceField::CurrentConsumption, next)?;
        txn.add_staged_container(&self.attempt_id, &container)?;

        let node = container.node_id.clone();
        let handle = self
            .context
            .containers
            .create(container, &self.attempt_id, &self.user);
        handle.on_allocated();
        state.staging.stage(Arc::clone(&handle));
        state.current_consumption = next;
        state.audit(self.attempt_id, Some(container_id), LedgerAction::Allocate, None);

        info!(
            application = %self.attempt_id.application,
            container = %container_id,
            %node,
            staged = state.staging.len(),
            current_consumption = next.memory,
            "staged container"
        );
        Ok(handle)
    }

    /// Hand staged containers to the application.
    ///
    /// Container tokens are minted for every staged container first, then
    /// node-manager tokens, then the moves are persisted. Only after all three
    /// succeed do containers leave staging, join the live set and receive an
    /// acquired event. A container whose node cannot be resolved stays staged
    /// for the next pull. Any other issuer or persistence failure aborts the
    /// call with the ledger untouched and undelivered node-manager tokens
    /// revoked.
    pub fn pull_newly_allocated_containers_and_nm_tokens(
        &self,
        txn: &mut TxnContext<'_>,
    ) -> Result<ContainersAndNmTokens, LedgerError> {
        let mut state = self.state.lock();

        let mut skipped = Vec::new();
        let mut minted = Vec::with_capacity(state.staging.len());
        for handle in state.staging.handles() {
            let mut container = handle.container();
            match self.context.tokens.create_container_token(
                &container.id,
                &container.node_id,
                &self.user,
                container.resource,
            ) {
                Ok(token) => {
                    container.token = Some(token);
                    minted.push((Arc::clone(handle), container));
                }
                Err(err @ TokenError::Unresolvable { .. }) => {
                    self.log_unassigned(&container, &err);
                    skipped.push((container.id, err.to_string()));
                }
                Err(err) => return Err(err.into()),
            }
        }

        let mut batch = Vec::with_capacity(minted.len());
        let mut issued = Vec::new();
        for (handle, container) in minted {
            match self
                .context
                .tokens
                .create_nm_token(&self.user, &self.attempt_id, &container)
            {
                Ok(nm_token) => {
                    if nm_token.is_some() {
                        issued.push(container.node_id.clone());
                    }
                    batch.push((handle, container, nm_token));
                }
                Err(err @ TokenError::Unresolvable { .. }) => {
                    self.log_unassigned(&container, &err);
                    skipped.push((container.id, err.to_string()));
                }
                Err(err) => {
                    self.revoke_nm_tokens(&issued);
                    return Err(err.into());
                }
            }
        }

        let persisted = batch.iter().try_for_each(|(_, container, _)| {
            txn.remove_staged_container(&self.attempt_id, &container.id)?;
            txn.add_live_container(&self.attempt_id, container)
        });
        if let Err(err) = persisted {
            self.revoke_nm_tokens(&issued);
            return Err(err);
        }

        for (container_id, reason) in skipped {
            state.audit(
                self.attempt_id,
                Some(container_id),
                LedgerAction::AcquireSkipped,
                Some(reason),
            );
        }

        let mut pulled = ContainersAndNmTokens::default();
        for (handle, container, nm_token) in batch {
            state.staging.remove(&container.id);
            state.live.insert(Arc::clone(&handle));
            handle.on_acquired();
            state.audit(self.attempt_id, Some(container.id), LedgerAction::Acquire, None);
            pulled.containers.push(container);
            if let Some(token) = nm_token {
                pulled.nm_tokens.push(token);
            }
        }

        if !pulled.containers.is_empty() {
            info!(
                application = %self.attempt_id.application,
                acquired = pulled.containers.len(),
                nm_tokens = pulled.nm_tokens.len(),
                still_staged = state.staging.len(),
                "pulled newly allocated containers"
            );
        }
        Ok(pulled)
    }

    fn log_unassigned(&self, container: &Container, err: &TokenError) {
        error!(
            attempt = %self.attempt_id,
            container = %container.id,
            error = %err,
            "error trying to assign container token and NM token to an allocated container"
        );
    }

    fn revoke_nm_tokens(&self, nodes: &[NodeId]) {
        for node in nodes {
            self.context.tokens.revoke_nm_token(&self.attempt_id, node);
        }
    }

    /// Confirm that a node launched a container.
    ///
    /// A container the ledger has no record of (after a restart, or from an
    /// expired reservation) is sent back to its node for cleanup.
    pub fn container_launched_on_node(
        &self,
        container_id: &ContainerId,
        node_id: &NodeId,
        txn: &mut TxnContext<'_>,
    ) {
        let mut state = self.state.lock();
        let Some(handle) = state.live.get(container_id).cloned() else {
            warn!(
                attempt = %self.attempt_id,
                container = %container_id,
                node = %node_id,
                "unknown container reported by node; requesting cleanup"
            );
            self.context.nodes.clean_container(node_id, container_id, txn);
            state.audit(
                self.attempt_id,
                Some(*container_id),
                LedgerAction::Cleanup,
                Some(format!("node={node_id}")),
            );
            return;
        };
        handle.on_launched();
        state.audit(self.attempt_id, Some(*container_id), LedgerAction::Launch, None);
    }

    /// Drop a finished container and give its resource back.
    pub fn container_completed(
        &self,
        container_id: &ContainerId,
        txn: &mut TxnContext<'_>,
    ) -> Result<Option<ContainerHandle>, LedgerError> {
        let mut state = self.state.lock();
        let (handle, was_live) = if let Some(handle) = state.live.get(container_id) {
            (Arc::clone(handle), true)
        } else if let Some(handle) = state.staging.get(container_id) {
            (Arc::clone(handle), false)
        } else {
            debug!(attempt = %self.attempt_id, container = %container_id, "completion for unknown container");
            return Ok(None);
        };

        let resource = handle.container().resource;
        let (next, underflow) = state.current_consumption.saturating_sub(resource);
        if underflow {
            warn!(
                attempt = %self.attempt_id,
                current = %state.current_consumption,
                %resource,
                "consumption would go negative; flooring at zero"
            );
        }
        txn.update_resource(&self.attempt_id, ResourceField::CurrentConsumption, next)?;
        if was_live {
            txn.remove_live_container(&self.attempt_id, container_id)?;
            state.live.remove(container_id);
        } else {
            txn.remove_staged_container(&self.attempt_id, container_id)?;
            state.staging.remove(container_id);
        }
        state.current_consumption = next;
        state.audit(self.attempt_id, Some(*container_id), LedgerAction::Complete, None);
        Ok(Some(handle))
    }

    /// Live container by id.
    pub fn live_container(&self, container_id: &ContainerId) -> Option<ContainerHandle> {
        self.state.lock().live.get(container_id).cloned()
    }

    /// Every live container.
    pub fn live_containers(&self) -> Vec<ContainerHandle> {
        self.state.lock().live.handles().map(Arc::clone).collect()
    }

    /// Staged containers in staging order.
    pub fn staged_containers(&self) -> Vec<ContainerHandle> {
        self.state.lock().staging.handles().to_vec()
    }

    /// Sum of allocated resources.
    pub fn current_consumption(&self) -> ResourceAmount {
        self.state.lock().current_consumption
    }

    // ---------------------------------------------------------------------
    // Delay scheduling
    // ---------------------------------------------------------------------

    /// Record that the scheduler offered this priority a chance to place.
    pub fn add_scheduling_opportunity(&self, priority: Priority) {
        let count = self.state.lock().opportunities.add(priority);
        debug!(attempt = %self.attempt_id, %priority, count, "scheduling opportunity");
    }

    /// Take back one opportunity; never below zero.
    pub fn subtract_scheduling_opportunity(&self, priority: Priority) {
        self.state.lock().opportunities.subtract(priority);
    }

    /// Zero the opportunities after a placement, stamped with the current time.
    pub fn reset_scheduling_opportunities(&self, priority: Priority) {
        self.reset_scheduling_opportunities_at(priority, now_ms());
    }

    /// Zero the opportunities with an explicit timestamp.
    pub fn reset_scheduling_opportunities_at(&self, priority: Priority, timestamp_ms: u64) {
        self.state.lock().opportunities.reset(priority, timestamp_ms);
    }

    /// Opportunities since the last placement at `priority`.
    pub fn scheduling_opportunities(&self, priority: Priority) -> u32 {
        self.state.lock().opportunities.count(priority)
    }

    /// Time of the last placement per priority.
    pub fn last_scheduled_container(&self) -> HashMap<Priority, u64> {
        self.state.lock().opportunities.last_scheduled().clone()
    }

    // ---------------------------------------------------------------------
    // Reporting
    // ---------------------------------------------------------------------

    /// Derived usage snapshot.
    pub fn resource_usage_report(&self) -> ResourceUsageReport {
        let state = self.state.lock();
        ResourceUsageReport {
            live_containers: state.live.len(),
            reserved_containers: state.reservations.len(),
            used: state.current_consumption,
            reserved: state.current_reservation,
            needed: state.current_consumption + state.current_reservation,
        }
    }

    // ---------------------------------------------------------------------
    // Recovery, failover, queue moves, termination
    // ---------------------------------------------------------------------

    /// Rebuild state from a persisted snapshot after a restart.
    ///
    /// Best effort: a failed lookup is logged, the field keeps its default, and
    /// the remaining fields are still recovered. Holds the ledger lock for the
    /// whole rebuild.
    pub fn recover(&self, info: &PersistedAttemptInfo, store: &dyn RecoveryStore) -> RecoveryOutcome {
        let mut state = self.state.lock();
        let mut outcome = RecoveryOutcome::default();

        state.request_book.recover(info);
        state.stopped = state.stopped || info.stopped;
        state.final_state = info.final_state;

        for field in ResourceField::ALL {
            match store.resource(&self.attempt_id, field) {
                Ok(Some(value)) => *state.resource_mut(field) = value,
                Ok(None) => debug!(attempt = %self.attempt_id, ?field, "no persisted row"),
                Err(err) => {
                    error!(attempt = %self.attempt_id, ?field, error = %err, "failed to recover resource row");
                    outcome.failed.push(RecoveryField::Resource(field));
                }
            }
        }

        match resolve_all(store, store.staged_container_ids(&self.attempt_id)) {
            Ok(handles) => state.staging.replace(handles),
            Err(err) => {
                error!(attempt = %self.attempt_id, error = %err, "failed to recover staged containers");
                outcome.failed.push(RecoveryField::StagedContainers);
            }
        }

        match resolve_all(store, store.live_container_ids(&self.attempt_id)) {
            Ok(handles) => {
                let mut live = ContainerRegistry::new();
                for handle in handles {
                    live.insert(handle);
                }
                state.live = live;
            }
            Err(err) => {
                error!(attempt = %self.attempt_id, error = %err, "failed to recover live containers");
                outcome.failed.push(RecoveryField::LiveContainers);
            }
        }

        let detail = format!("failed={}", outcome.failed.len());
        state.audit(self.attempt_id, None, LedgerAction::Recover, Some(detail));
        info!(
            attempt = %self.attempt_id,
            stopped = state.stopped,
            staged = state.staging.len(),
            live = state.live.len(),
            complete = outcome.is_complete(),
            "recovered attempt ledger"
        );
        outcome
    }

    /// Take over the state of the attempt this one replaces.
    ///
    /// The prior ledger is consumed: live containers, consumption, headroom
    /// and last-scheduled timestamps move over wholesale and the request book
    /// transplants its own state. The live set, both resource rows and the
    /// attempt info are persisted under this attempt first; if that fails
    /// nothing moves and the prior ledger is dropped.
    pub fn transfer_state_from_previous_attempt(
        &self,
        prior: Self,
        txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError> {
        self.persist_transfer_from(&prior, txn)?;
        self.absorb(prior);
        Ok(())
    }

    pub(crate) fn persist_transfer_from(
        &self,
        prior: &Self,
        txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError> {
        let state = self.state.lock();
        let prior_state = prior.state.lock();
        for handle in prior_state.live.handles() {
            let container = handle.container();
            txn.remove_live_container(&prior.attempt_id, &container.id)?;
            txn.add_live_container(&self.attempt_id, &container)?;
        }
        txn.update_resource(
            &self.attempt_id,
            ResourceField::CurrentConsumption,
            prior_state.current_consumption,
        )?;
        txn.update_resource(
            &self.attempt_id,
            ResourceField::ResourceLimit,
            prior_state.resource_limit,
        )?;
        let mut info = state.attempt_info(self.attempt_id, &self.user);
        info.last_container_id = info
            .last_container_id
            .max(prior_state.request_book.last_container_id());
        txn.update_attempt_info(&info)
    }

    pub(crate) fn absorb(&self, prior: Self) {
        let prior_attempt = prior.attempt_id;
        let LedgerState {
            request_book,
            live,
            current_consumption,
            resource_limit,
            mut opportunities,
            ..
        } = prior.state.into_inner();

        let mut state = self.state.lock();
        debug!(attempt = %self.attempt_id, from = %prior_attempt, "transferring state");
        state.live = live;
        state.current_consumption = current_consumption;
        state.resource_limit = resource_limit;
        state
            .opportunities
            .replace_last_scheduled(opportunities.take_last_scheduled());
        state.request_book.transfer_state_from(request_book);
        state.audit(
            self.attempt_id,
            None,
            LedgerAction::Transfer,
            Some(format!("from={prior_attempt}")),
        );
    }

    /// Re-home the attempt under another queue.
    ///
    /// Metrics move one container and one reservation at a time; this is not
    /// atomic across containers.
    pub fn move_to_queue(&self, new_queue: QueueRef) {
        let mut state = self.state.lock();
        let old_queue = Arc::clone(&state.queue);
        let old_metrics = old_queue.metrics();
        let new_metrics = new_queue.metrics();

        for handle in state.live.handles() {
            let resource = handle.container().resource;
            old_metrics.release_resources(&self.user, 1, resource);
            new_metrics.allocate_resources(&self.user, 1, resource, false);
        }
        for handle in state.reservations.handles() {
            let resource = handle
                .reserved_resource()
                .unwrap_or_else(|| handle.container().resource);
            old_metrics.unreserve_resource(&self.user, resource);
            new_metrics.reserve_resource(&self.user, resource);
        }

        state.request_book.move_to_queue(&new_queue);
        info!(
            attempt = %self.attempt_id,
            from = old_queue.name(),
            to = new_queue.name(),
            live = state.live.len(),
            reserved = state.reservations.len(),
            "moved attempt"
        );
        let detail = format!("{}->{}", old_queue.name(), new_queue.name());
        state.queue = new_queue;
        state.audit(self.attempt_id, None, LedgerAction::Move, Some(detail));
    }

    /// Stop the attempt. Request and blacklist updates are ignored afterwards.
    pub fn stop(
        &self,
        final_state: AttemptFinalState,
        txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        let mut info = state.attempt_info(self.attempt_id, &self.user);
        info.stopped = true;
        info.final_state = Some(final_state);
        txn.update_attempt_info(&info)?;
        state.request_book.stop(final_state, txn)?;
        state.stopped = true;
        state.final_state = Some(final_state);
        state.audit(
            self.attempt_id,
            None,
            LedgerAction::Stop,
            Some(format!("{final_state:?}")),
        );
        info!(attempt = %self.attempt_id, ?final_state, "stopped attempt");
        Ok(())
    }

    /// Whether `stop` has run.
    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }
}

fn resolve_all(
    store: &dyn RecoveryStore,
    ids: Result<Vec<ContainerId>, LedgerError>,
) -> Result<Vec<ContainerHandle>, LedgerError> {
    ids?.iter().map(|id| store.resolve_container(id)).collect()
}
