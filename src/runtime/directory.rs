//! Concurrent directory of live attempt ledgers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::core::{AttemptLedger, LedgerError, RequestBook, TxnContext};
use crate::util::{ApplicationId, AttemptId};

/// Attempt id to ledger map used by scheduler threads.
///
/// The map lock is held only while the map itself changes; ledger operations
/// run against the returned `Arc` outside of it.
pub struct AttemptDirectory<R: RequestBook> {
    ledgers: RwLock<HashMap<AttemptId, Arc<AttemptLedger<R>>>>,
}

impl<R: RequestBook> Default for AttemptDirectory<R> {
    fn default() -> Self {
        Self {
            ledgers: RwLock::new(HashMap::new()),
        }
    }
}

impl<R: RequestBook> AttemptDirectory<R> {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ledger. Fails if its attempt is already present.
    pub fn admit(&self, ledger: AttemptLedger<R>) -> Result<Arc<AttemptLedger<R>>, LedgerError> {
        let attempt = ledger.attempt_id();
        let mut ledgers = self.ledgers.write();
        if ledgers.contains_key(&attempt) {
            return Err(LedgerError::DuplicateAttempt(attempt));
        }
        let ledger = Arc::new(ledger);
        ledgers.insert(attempt, Arc::clone(&ledger));
        info!(attempt = %attempt, "attempt admitted");
        Ok(ledger)
    }

    /// Ledger for an attempt.
    pub fn get(&self, attempt: &AttemptId) -> Option<Arc<AttemptLedger<R>>> {
        self.ledgers.read().get(attempt).cloned()
    }

    /// Remove an attempt, returning its ledger.
    pub fn retire(&self, attempt: &AttemptId) -> Option<Arc<AttemptLedger<R>>> {
        let removed = self.ledgers.write().remove(attempt);
        if removed.is_some() {
            info!(attempt = %attempt, "attempt retired");
        }
        removed
    }

    /// Hand the prior attempt's state to `next` and register `next`.
    ///
    /// The prior ledger must no longer be shared; if another handle is still
    /// alive, or persisting the transfer fails, the directory is left
    /// unchanged and the error is returned.
    pub fn fail_over(
        &self,
        prior: &AttemptId,
        next: AttemptLedger<R>,
        txn: &mut TxnContext<'_>,
    ) -> Result<Arc<AttemptLedger<R>>, LedgerError> {
        let next_id = next.attempt_id();
        let mut ledgers = self.ledgers.write();
        if ledgers.contains_key(&next_id) {
            return Err(LedgerError::DuplicateAttempt(next_id));
        }
        let shared = ledgers
            .remove(prior)
            .ok_or(LedgerError::UnknownAttempt(*prior))?;
        let prior_ledger = match Arc::try_unwrap(shared) {
            Ok(ledger) => ledger,
            Err(shared) => {
                warn!(prior = %prior, next = %next_id, "prior attempt still referenced");
                ledgers.insert(*prior, shared);
                return Err(LedgerError::AttemptInUse(*prior));
            }
        };
        if let Err(err) = next.persist_transfer_from(&prior_ledger, txn) {
            warn!(prior = %prior, next = %next_id, error = %err, "failed to persist transfer");
            ledgers.insert(*prior, Arc::new(prior_ledger));
            return Err(err);
        }
        next.absorb(prior_ledger);
        let next = Arc::new(next);
        ledgers.insert(next_id, Arc::clone(&next));
        info!(prior = %prior, next = %next_id, "attempt failed over");
        Ok(next)
    }

    /// Registered attempts of one application, in attempt order.
    pub fn attempts_of(&self, application: &ApplicationId) -> Vec<AttemptId> {
        let mut ids: Vec<_> = self
            .ledgers
            .read()
            .keys()
            .filter(|id| id.application == *application)
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Number of registered attempts.
    pub fn len(&self) -> usize {
        self.ledgers.read().len()
    }

    /// True if no attempt is registered.
    pub fn is_empty(&self) -> bool {
        self.ledgers.read().is_empty()
    }
}
