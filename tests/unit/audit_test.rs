//! Tests for audit sink

use attempt_ledger::core::{build_audit_event, AuditSink, InMemoryAuditSink, LedgerAction};
use attempt_ledger::util::{ApplicationId, AttemptId, ContainerId};

fn attempt() -> AttemptId {
    AttemptId::new(ApplicationId::new(1_700_000_000_000, 3), 1)
}

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    let container = ContainerId::new(attempt(), 1);

    sink.record(build_audit_event(
        attempt(),
        Some(container),
        LedgerAction::Allocate,
        Some("node=n1:8041".to_string()),
    ));
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].attempt, attempt());
    assert_eq!(events[0].container, Some(container));
    assert_eq!(events[0].action, LedgerAction::Allocate);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    sink.record(build_audit_event(attempt(), None, LedgerAction::Reserve, None));
    sink.record(build_audit_event(attempt(), None, LedgerAction::Allocate, None));
    sink.record(build_audit_event(attempt(), None, LedgerAction::Acquire, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].action, LedgerAction::Allocate); // oldest dropped
    assert_eq!(events[1].action, LedgerAction::Acquire);
}

#[test]
fn test_zero_capacity_sink_keeps_nothing() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event(attempt(), None, LedgerAction::Stop, None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        attempt(),
        None,
        LedgerAction::Transfer,
        Some("from=appattempt_1700000000000_0003_000001".to_string()),
    );
    assert!(!event.event_id.is_empty());
    assert!(event.created_at_ms > 0);
    assert_eq!(event.action.to_string(), "transfer");
    assert_eq!(LedgerAction::AcquireSkipped.to_string(), "acquire_skipped");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"], "transfer");
}
