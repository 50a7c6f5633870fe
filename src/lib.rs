//! # Attempt Ledger
//!
//! Per-application-attempt scheduling ledger for a cluster resource manager.
//!
//! Each [`core::AttemptLedger`] is the authoritative record of what one
//! attempt holds on the cluster: reservations parked on nodes, containers
//! allocated but not yet handed to the application, containers the
//! application has acquired, and the running resource totals derived from
//! them. Schedulers drive it from many threads; every public call runs under
//! the ledger's own lock.
//!
//! ## Lifecycle of a container
//!
//! 1. `reserve` parks capacity on a node at a priority.
//! 2. `allocate` stages a container and charges it to consumption.
//! 3. `pull_newly_allocated_containers_and_nm_tokens` mints tokens and moves
//!    staged containers into the live set. Containers whose node cannot be
//!    resolved stay staged for the next pull.
//! 4. `container_launched_on_node` confirms the launch, or asks the node to
//!    clean up a container the ledger does not know.
//!
//! ## Persistence
//!
//! Mutating calls take a [`core::TxnContext`]. With an active scope the
//! ledger writes the durable form of each change before touching memory, so
//! a failed write leaves the ledger unchanged. [`infra::StoreTransaction`]
//! buffers those writes for a [`infra::StateStore`], and
//! [`core::AttemptLedger::recover`] rebuilds a ledger from one.
//!
//! ```rust,ignore
//! use attempt_ledger::core::TxnContext;
//! use attempt_ledger::infra::StoreTransaction;
//!
//! let mut scope = StoreTransaction::new();
//! let mut txn = TxnContext::active(&mut scope);
//! ledger.allocate(container, &mut txn)?;
//! let pulled = ledger.pull_newly_allocated_containers_and_nm_tokens(&mut txn)?;
//! scope.commit(store.as_ref())?;
//! ```
//!
//! ## Failover
//!
//! [`runtime::AttemptDirectory::fail_over`] retires the previous attempt and
//! hands its live containers, consumption and headroom to the next one. The
//! transfer is written under the next attempt's id, so a restart recovers it.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Ledger state, collaborator contracts, and persistence scopes.
pub mod core;
/// Configuration models for ledgers and persistence backends.
pub mod config;
/// Builders to construct ledgers and stores from configuration.
pub mod builders;
/// Reference collaborators and state stores.
pub mod infra;
/// Concurrent attempt directory.
pub mod runtime;
/// Shared utilities.
pub mod util;
