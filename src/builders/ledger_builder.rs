//! Builders to construct ledgers and state stores from configuration.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::config::{LedgerConfig, PersistenceBackendConfig};
use crate::core::{
    AttemptLedger, ContainerFactory, InMemoryAuditSink, LedgerContext, LedgerError, QueueRef,
    RequestBook,
};
use crate::infra::{InMemoryStateStore, JsonlStateStore, StateStore};

/// Collaborators a ledger is assembled from.
pub struct LedgerParts<R> {
    /// Request bookkeeping for the attempt.
    pub request_book: R,
    /// Queue the attempt is admitted to.
    pub queue: QueueRef,
    /// Shared services.
    pub context: LedgerContext,
}

/// A configured ledger plus the handle to its audit buffer, if any.
pub struct BuiltLedger<R: RequestBook> {
    /// The ledger.
    pub ledger: AttemptLedger<R>,
    /// Audit buffer shared with the ledger.
    pub audit: Option<Arc<Mutex<InMemoryAuditSink>>>,
}

/// Build a ledger from configuration.
pub fn build_ledger<R: RequestBook>(
    cfg: &LedgerConfig,
    parts: LedgerParts<R>,
) -> Result<BuiltLedger<R>, LedgerError> {
    cfg.validate()
        .map_err(|e| LedgerError::Config(format!("config invalid: {e}")))?;

    let mut ledger = AttemptLedger::new(parts.request_book, parts.queue, parts.context)
        .with_show_requests(cfg.show_requests);
    let audit = (cfg.audit_buffer_events > 0).then(|| {
        Arc::new(Mutex::new(InMemoryAuditSink::new(cfg.audit_buffer_events)))
    });
    if let Some(sink) = &audit {
        ledger = ledger.with_audit(Box::new(Arc::clone(sink)));
    }
    info!(
        attempt = %ledger.attempt_id(),
        queue = %ledger.queue_name(),
        audit = cfg.audit_buffer_events,
        "ledger built"
    );
    Ok(BuiltLedger { ledger, audit })
}

/// Build the state store selected by configuration.
pub fn build_state_store(
    cfg: &LedgerConfig,
    factory: Arc<dyn ContainerFactory>,
) -> Result<Arc<dyn StateStore>, LedgerError> {
    cfg.validate()
        .map_err(|e| LedgerError::Config(format!("config invalid: {e}")))?;
    match &cfg.persistence {
        PersistenceBackendConfig::InMemory => Ok(Arc::new(InMemoryStateStore::new(factory))),
        PersistenceBackendConfig::File { path } => {
            info!(path = %path.display(), "opening file state store");
            Ok(Arc::new(JsonlStateStore::open(path, factory)?))
        }
    }
}
