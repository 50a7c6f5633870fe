//! Tests for ledger builders

use std::sync::Arc;

use attempt_ledger::builders::{build_ledger, build_state_store, LedgerParts};
use attempt_ledger::config::{LedgerConfig, PersistenceBackendConfig};
use attempt_ledger::core::{LedgerAction, LedgerContext, LedgerError, TxnContext};
use attempt_ledger::infra::{
    ChannelNodeDispatcher, InMemoryRequestBook, LeafQueue, LocalTokenIssuer, StaticResolver,
    TrackedContainerFactory,
};
use attempt_ledger::util::{ApplicationId, AttemptId, ResourceAmount};

fn parts(attempt: AttemptId) -> LedgerParts<InMemoryRequestBook> {
    let (dispatcher, _events) = ChannelNodeDispatcher::unbounded();
    LedgerParts {
        request_book: InMemoryRequestBook::new(attempt, "bob", "root.etl"),
        queue: LeafQueue::shared("root.etl"),
        context: LedgerContext::new(
            Arc::new(TrackedContainerFactory::new()),
            Arc::new(LocalTokenIssuer::new(Arc::new(StaticResolver::new()))),
            Arc::new(dispatcher),
        ),
    }
}

fn attempt() -> AttemptId {
    AttemptId::new(ApplicationId::new(1_700_000_000_000, 8), 1)
}

#[test]
fn test_build_ledger_with_audit() {
    let cfg = LedgerConfig {
        audit_buffer_events: 4,
        ..LedgerConfig::default()
    };
    let built = build_ledger(&cfg, parts(attempt())).unwrap();
    assert_eq!(built.ledger.attempt_id(), attempt());
    assert_eq!(built.ledger.user(), "bob");
    assert_eq!(built.ledger.queue_name(), "root.etl");

    built
        .ledger
        .set_headroom(ResourceAmount::new(1024, 1), &mut TxnContext::None)
        .unwrap();
    built.ledger.stop(attempt_ledger::core::AttemptFinalState::Failed, &mut TxnContext::None).unwrap();
    let audit = built.audit.unwrap();
    let actions: Vec<_> = audit.lock().events().iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![LedgerAction::Stop]);
}

#[test]
fn test_build_ledger_without_audit() {
    let cfg = LedgerConfig {
        audit_buffer_events: 0,
        ..LedgerConfig::default()
    };
    let built = build_ledger(&cfg, parts(attempt())).unwrap();
    assert!(built.audit.is_none());
}

#[test]
fn test_build_rejects_invalid_config() {
    let cfg = LedgerConfig {
        persistence: PersistenceBackendConfig::File {
            path: std::path::PathBuf::new(),
        },
        ..LedgerConfig::default()
    };
    assert!(matches!(
        build_ledger(&cfg, parts(attempt())),
        Err(LedgerError::Config(_))
    ));
    assert!(matches!(
        build_state_store(&cfg, Arc::new(TrackedContainerFactory::new())),
        Err(LedgerError::Config(_))
    ));
}

#[test]
fn test_build_in_memory_store() {
    let store = build_state_store(&LedgerConfig::default(), Arc::new(TrackedContainerFactory::new()))
        .unwrap();
    assert!(store.attempts().unwrap().is_empty());
}
