//! Builders that assemble ledgers from configuration.

pub mod ledger_builder;

pub use ledger_builder::{build_ledger, build_state_store, BuiltLedger, LedgerParts};
