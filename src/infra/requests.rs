//! In-memory request book.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::core::{
    AttemptFinalState, LedgerError, PersistedAttemptInfo, QueueRef, RequestBook,
    ResourceRequest, TxnContext,
};
use crate::util::{AttemptId, Priority};

/// Requests, blacklist and identity of one attempt, kept in memory.
pub struct InMemoryRequestBook {
    attempt_id: AttemptId,
    user: String,
    queue_name: String,
    requests: BTreeMap<Priority, HashMap<String, ResourceRequest>>,
    blacklist: HashSet<String>,
    container_id_counter: u64,
    pending: bool,
    final_state: Option<AttemptFinalState>,
}

impl InMemoryRequestBook {
    /// Create a book for an attempt.
    pub fn new(attempt_id: AttemptId, user: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self {
            attempt_id,
            user: user.into(),
            queue_name: queue_name.into(),
            requests: BTreeMap::new(),
            blacklist: HashSet::new(),
            container_id_counter: 0,
            pending: true,
            final_state: None,
        }
    }

    /// Blacklisted names, sorted.
    #[must_use]
    pub fn blacklist(&self) -> Vec<String> {
        let mut names: Vec<_> = self.blacklist.iter().cloned().collect();
        names.sort();
        names
    }

    /// Final state passed to `stop`.
    #[must_use]
    pub const fn final_state(&self) -> Option<AttemptFinalState> {
        self.final_state
    }
}

impl RequestBook for InMemoryRequestBook {
    fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    fn user(&self) -> &str {
        &self.user
    }

    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    fn update_resource_requests(
        &mut self,
        requests: &[ResourceRequest],
        _txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError> {
        for request in requests {
            self.requests
                .entry(request.priority)
                .or_default()
                .insert(request.resource_name.clone(), request.clone());
            if request.resource_name == ResourceRequest::ANY && request.num_containers > 0 {
                self.pending = true;
            }
        }
        debug!(attempt = %self.attempt_id, updated = requests.len(), "updated resource requests");
        Ok(())
    }

    fn update_blacklist(
        &mut self,
        additions: &[String],
        removals: &[String],
        _txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError> {
        self.blacklist.extend(additions.iter().cloned());
        for name in removals {
            self.blacklist.remove(name);
        }
        Ok(())
    }

    fn is_blacklisted(&self, resource_name: &str) -> bool {
        self.blacklist.contains(resource_name)
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    fn priorities(&self) -> Vec<Priority> {
        self.requests.keys().copied().collect()
    }

    fn resource_requests(&self, priority: Priority) -> Option<HashMap<String, ResourceRequest>> {
        self.requests.get(&priority).cloned()
    }

    fn resource_request(&self, priority: Priority, resource_name: &str) -> Option<ResourceRequest> {
        self.requests
            .get(&priority)
            .and_then(|by_name| by_name.get(resource_name))
            .cloned()
    }

    fn new_container_id(&mut self) -> u64 {
        self.container_id_counter += 1;
        self.container_id_counter
    }

    fn last_container_id(&self) -> u64 {
        self.container_id_counter
    }

    fn stop(
        &mut self,
        final_state: AttemptFinalState,
        _txn: &mut TxnContext<'_>,
    ) -> Result<(), LedgerError> {
        self.requests.clear();
        self.pending = false;
        self.final_state = Some(final_state);
        Ok(())
    }

    fn recover(&mut self, info: &PersistedAttemptInfo) {
        self.user.clone_from(&info.user);
        self.queue_name.clone_from(&info.queue);
        self.container_id_counter = info.last_container_id;
        self.final_state = info.final_state;
        if info.stopped {
            self.pending = false;
        }
    }

    fn transfer_state_from(&mut self, previous: Self) {
        self.requests = previous.requests;
        self.blacklist = previous.blacklist;
        self.container_id_counter = self.container_id_counter.max(previous.container_id_counter);
    }

    fn move_to_queue(&mut self, queue: &QueueRef) {
        self.queue_name = queue.name().to_string();
    }
}
