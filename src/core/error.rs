//! Error types for ledger operations.

use thiserror::Error;

use crate::util::{AttemptId, ContainerId, NodeId};

/// Failures reported by a token issuer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The node address could not be resolved. The container stays staged
    /// and is retried on the next pull.
    #[error("cannot resolve node {node}: {reason}")]
    Unresolvable {
        /// Node whose address failed to resolve.
        node: NodeId,
        /// Resolver message.
        reason: String,
    },
    /// Any other issuer failure.
    #[error("token issuer error: {0}")]
    Issuer(String),
}

/// Errors produced by the ledger and its collaborators.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The persistence context rejected an update.
    #[error("persistence error: {0}")]
    Persistence(String),
    /// Token issuance failed in a way the ledger does not absorb.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// A container id could not be resolved.
    #[error("unknown container {0}")]
    UnknownContainer(ContainerId),
    /// No ledger is registered for the attempt.
    #[error("unknown attempt {0}")]
    UnknownAttempt(AttemptId),
    /// A ledger is registered twice.
    #[error("attempt {0} already registered")]
    DuplicateAttempt(AttemptId),
    /// The retiring ledger is still referenced elsewhere.
    #[error("attempt {0} is still in use")]
    AttemptInUse(AttemptId),
    /// A recovery lookup failed.
    #[error("recovery error: {0}")]
    Recovery(String),
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
    /// I/O failure in a file-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Encoding failure in a file-backed store.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
