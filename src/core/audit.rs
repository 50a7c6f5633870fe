//! Audit trail of ledger decisions.
//!
//! Provides a sink abstraction and a bounded in-memory implementation.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::util::clock::now_ms;
use crate::util::{AttemptId, ContainerId};

/// Ledger action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    /// Fresh reservation at a slot.
    Reserve,
    /// Reservation call that made no progress.
    ReReserve,
    /// Reservation released.
    Unreserve,
    /// Container staged for hand-off.
    Allocate,
    /// Container handed to the application.
    Acquire,
    /// Token minting failed; container left staged.
    AcquireSkipped,
    /// Launch confirmed.
    Launch,
    /// Unknown container sent for cleanup.
    Cleanup,
    /// Container completed.
    Complete,
    /// Attempt moved to another queue.
    Move,
    /// Attempt stopped.
    Stop,
    /// State rebuilt from the store.
    Recover,
    /// State taken over from the previous attempt.
    Transfer,
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reserve => "reserve",
            Self::ReReserve => "re_reserve",
            Self::Unreserve => "unreserve",
            Self::Allocate => "allocate",
            Self::Acquire => "acquire",
            Self::AcquireSkipped => "acquire_skipped",
            Self::Launch => "launch",
            Self::Cleanup => "cleanup",
            Self::Complete => "complete",
            Self::Move => "move",
            Self::Stop => "stop",
            Self::Recover => "recover",
            Self::Transfer => "transfer",
        };
        f.write_str(name)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Attempt the event belongs to.
    pub attempt: AttemptId,
    /// Container involved, if any.
    pub container: Option<ContainerId>,
    /// Action taken.
    pub action: LedgerAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u64,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink with a bounded buffer; the oldest event is dropped
/// when full.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Shared sinks record through their lock, so a caller can keep a handle
/// and inspect events while the ledger owns the other.
impl<S: AuditSink> AuditSink for Arc<Mutex<S>> {
    fn record(&mut self, event: AuditEvent) {
        self.lock().record(event);
    }
}

/// Helper to build an audit event stamped with the current time.
pub fn build_audit_event(
    attempt: AttemptId,
    container: Option<ContainerId>,
    action: LedgerAction,
    detail: Option<String>,
) -> AuditEvent {
    let created_at_ms = now_ms();
    let event_id = container.map_or_else(
        || format!("{attempt}-{action}-{created_at_ms}"),
        |c| format!("{c}-{action}-{created_at_ms}"),
    );
    AuditEvent {
        event_id,
        attempt,
        container,
        action,
        created_at_ms,
        detail,
    }
}
