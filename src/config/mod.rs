//! Configuration models for ledgers and their persistence backends.

pub mod ledger;

pub use ledger::{LedgerConfig, PersistenceBackendConfig};
