//! Tests for utility functions

use attempt_ledger::util::clock::now_ms;
use attempt_ledger::util::{
    init_tracing, ApplicationId, AttemptId, ContainerId, NodeId, Priority, ResourceAmount,
};

#[test]
fn test_now_ms() {
    let t1 = now_ms();
    std::thread::sleep(std::time::Duration::from_millis(10));
    let t2 = now_ms();
    assert!(t2 >= t1);
}

#[test]
fn test_init_tracing_is_repeatable() {
    init_tracing();
    init_tracing();
}

#[test]
fn test_resource_display_and_floor() {
    let amount = ResourceAmount::new(-512, -1);
    assert_eq!(amount.to_string(), "<memory:-512, vCores:-1>");
    assert_eq!(amount.with_memory_floored(), ResourceAmount::new(0, -1));
    assert!(!amount.is_non_negative());
}

#[test]
fn test_saturating_sub_reports_underflow() {
    let (left, underflow) = ResourceAmount::new(1024, 1).saturating_sub(ResourceAmount::new(2048, 1));
    assert!(underflow);
    assert_eq!(left, ResourceAmount::new(0, 0));
    let (left, underflow) = ResourceAmount::new(1024, 2).saturating_sub(ResourceAmount::new(512, 1));
    assert!(!underflow);
    assert_eq!(left, ResourceAmount::new(512, 1));
}

#[test]
fn test_ids_order_by_attempt_then_sequence() {
    let app = ApplicationId::new(1_700_000_000_000, 1);
    let first = AttemptId::new(app, 1);
    assert!(first < first.next());
    assert!(ContainerId::new(first, 9) < ContainerId::new(first.next(), 1));
    assert!(Priority(1) < Priority(2));
    assert_eq!(NodeId::new("n1", 8041).to_string(), "n1:8041");
}
