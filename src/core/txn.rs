//! Transactional context threaded through mutating ledger calls.
//!
//! The caller opens a transaction scope, hands it to the ledger, and commits
//! it once the scheduling step completes. [`TxnContext::None`] means no
//! persistence was requested for the call.

use crate::core::container::Container;
use crate::core::LedgerError;
use crate::util::{AttemptId, ContainerId, ResourceAmount};
use serde::{Deserialize, Serialize};

/// Persisted resource rows of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceField {
    /// Sum of reserved container resources.
    CurrentReservation,
    /// Headroom granted by the scheduler.
    ResourceLimit,
    /// Sum of allocated container resources.
    CurrentConsumption,
}

impl ResourceField {
    /// Every field, in recovery order.
    pub const ALL: [Self; 3] = [
        Self::CurrentReservation,
        Self::ResourceLimit,
        Self::CurrentConsumption,
    ];
}

/// Final state an attempt is stopped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptFinalState {
    /// Attempt completed normally.
    Finished,
    /// Attempt failed.
    Failed,
    /// Attempt was killed.
    Killed,
}

/// Attempt-level row persisted alongside the resource rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAttemptInfo {
    /// Attempt the row belongs to.
    pub attempt_id: AttemptId,
    /// Submitting user.
    pub user: String,
    /// Queue the attempt runs in.
    pub queue: String,
    /// Whether `stop` has run.
    pub stopped: bool,
    /// Final state passed to `stop`, if any.
    pub final_state: Option<AttemptFinalState>,
    /// Last container sequence number handed out.
    pub last_container_id: u64,
}

/// Update operations the ledger issues to a persistence backend.
pub trait TransactionScope {
    /// Record a new value for one resource row.
    fn update_resource(
        &mut self,
        attempt: &AttemptId,
        field: ResourceField,
        value: ResourceAmount,
    ) -> Result<(), LedgerError>;

    /// Record the attempt-level row.
    fn update_attempt_info(&mut self, info: &PersistedAttemptInfo) -> Result<(), LedgerError>;

    /// Record a container entering staging.
    fn add_staged_container(
        &mut self,
        attempt: &AttemptId,
        container: &Container,
    ) -> Result<(), LedgerError>;

    /// Record a container leaving staging.
    fn remove_staged_container(
        &mut self,
        attempt: &AttemptId,
        container_id: &ContainerId,
    ) -> Result<(), LedgerError>;

    /// Record a container joining the live set.
    fn add_live_container(
        &mut self,
        attempt: &AttemptId,
        container: &Container,
    ) -> Result<(), LedgerError>;

    /// Record a container leaving the live set.
    fn remove_live_container(
        &mut self,
        attempt: &AttemptId,
        container_id: &ContainerId,
    ) -> Result<(), LedgerError>;
}

/// Optional transaction supplied by the caller.
#[derive(Default)]
pub enum TxnContext<'a> {
    /// No persistence requested.
    #[default]
    None,
    /// Updates go to the given scope.
    Active(&'a mut dyn TransactionScope),
}

impl<'a> TxnContext<'a> {
    /// Wrap an open scope.
    pub fn active(scope: &'a mut dyn TransactionScope) -> Self {
        Self::Active(scope)
    }

    /// True when updates will be recorded.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub(crate) fn update_resource(
        &mut self,
        attempt: &AttemptId,
        field: ResourceField,
        value: ResourceAmount,
    ) -> Result<(), LedgerError> {
        match self {
            Self::None => Ok(()),
            Self::Active(scope) => scope.update_resource(attempt, field, value),
        }
    }

    pub(crate) fn update_attempt_info(
        &mut self,
        info: &PersistedAttemptInfo,
    ) -> Result<(), LedgerError> {
        match self {
            Self::None => Ok(()),
            Self::Active(scope) => scope.update_attempt_info(info),
        }
    }

    pub(crate) fn add_staged_container(
        &mut self,
        attempt: &AttemptId,
        container: &Container,
    ) -> Result<(), LedgerError> {
        match self {
            Self::None => Ok(()),
            Self::Active(scope) => scope.add_staged_container(attempt, container),
        }
    }

    pub(crate) fn remove_staged_container(
        &mut self,
        attempt: &AttemptId,
        container_id: &ContainerId,
    ) -> Result<(), LedgerError> {
        match self {
            Self::None => Ok(()),
            Self::Active(scope) => scope.remove_staged_container(attempt, container_id),
        }
    }

    pub(crate) fn add_live_container(
        &mut self,
        attempt: &AttemptId,
        container: &Container,
    ) -> Result<(), LedgerError> {
        match self {
            Self::None => Ok(()),
            Self::Active(scope) => scope.add_live_container(attempt, container),
        }
    }

    pub(crate) fn remove_live_container(
        &mut self,
        attempt: &AttemptId,
        container_id: &ContainerId,
    ) -> Result<(), LedgerError> {
        match self {
            Self::None => Ok(()),
            Self::Active(scope) => scope.remove_live_container(attempt, container_id),
        }
    }
}
