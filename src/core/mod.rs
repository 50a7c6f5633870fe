//! Ledger core: the attempt ledger, its data structures, and the interfaces
//! of the collaborators it calls.

pub mod audit;
pub mod collaborators;
pub mod container;
pub mod counters;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod reservation;
pub mod staging;
pub mod txn;

pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, LedgerAction};
pub use collaborators::{
    NodeEventHandler, Queue, QueueMetrics, QueueRef, RecoveryStore, RequestBook, ResourceRequest,
    TokenIssuer,
};
pub use container::{
    Container, ContainerFactory, ContainerHandle, ContainerState, ContainerStateMachine,
    ContainerToken, NmToken, ReservedEvent,
};
pub use counters::{OpportunityCounters, PriorityCounter};
pub use error::{AppResult, LedgerError, TokenError};
pub use ledger::{
    AttemptLedger, ContainersAndNmTokens, LedgerContext, RecoveryField, RecoveryOutcome,
    ResourceUsageReport,
};
pub use registry::ContainerRegistry;
pub use reservation::ReservationTable;
pub use staging::AllocationStaging;
pub use txn::{AttemptFinalState, PersistedAttemptInfo, ResourceField, TransactionScope, TxnContext};
