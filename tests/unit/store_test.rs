//! Tests for state stores and transactions

use std::sync::Arc;

use attempt_ledger::core::{
    AttemptFinalState, Container, ContainerState, ContainerStateMachine, PersistedAttemptInfo,
    RecoveryStore, ResourceField,
};
use attempt_ledger::infra::{
    InMemoryStateStore, LedgerUpdate, StateStore, StoreTransaction, TrackedContainerFactory,
};
use attempt_ledger::util::{ApplicationId, AttemptId, ContainerId, NodeId, Priority, ResourceAmount};

fn attempt(n: u32) -> AttemptId {
    AttemptId::new(ApplicationId::new(1_700_000_000_000, 5), n)
}

fn container(id: u64) -> Container {
    Container::new(
        ContainerId::new(attempt(1), id),
        NodeId::new("n1", 8041),
        Priority(1),
        ResourceAmount::new(256, 1),
    )
}

fn store() -> InMemoryStateStore {
    InMemoryStateStore::new(Arc::new(TrackedContainerFactory::new()))
}

#[test]
fn test_empty_transaction_commits_nothing() {
    let store = store();
    assert_eq!(StoreTransaction::new().commit(&store).unwrap(), 0);
    assert!(store.attempts().unwrap().is_empty());
}

#[test]
fn test_latest_resource_row_wins() {
    let store = store();
    store
        .apply(vec![
            LedgerUpdate::Resource {
                attempt: attempt(1),
                field: ResourceField::ResourceLimit,
                value: ResourceAmount::new(100, 1),
            },
            LedgerUpdate::Resource {
                attempt: attempt(1),
                field: ResourceField::ResourceLimit,
                value: ResourceAmount::new(200, 2),
            },
        ])
        .unwrap();
    assert_eq!(
        store.resource(&attempt(1), ResourceField::ResourceLimit).unwrap(),
        Some(ResourceAmount::new(200, 2))
    );
    assert_eq!(store.resource(&attempt(2), ResourceField::ResourceLimit).unwrap(), None);
}

#[test]
fn test_container_moves_from_staged_to_live() {
    let store = store();
    let c = container(1);
    store
        .apply(vec![
            LedgerUpdate::StagedAdded {
                attempt: attempt(1),
                container: c.clone(),
            },
            LedgerUpdate::StagedRemoved {
                attempt: attempt(1),
                container_id: c.id,
            },
            LedgerUpdate::LiveAdded {
                attempt: attempt(1),
                container: c.clone(),
            },
        ])
        .unwrap();
    assert!(store.staged_container_ids(&attempt(1)).unwrap().is_empty());
    assert_eq!(store.live_container_ids(&attempt(1)).unwrap(), vec![c.id]);
    let handle = store.resolve_container(&c.id).unwrap();
    assert_eq!(handle.state(), ContainerState::Acquired);

    store
        .apply(vec![LedgerUpdate::LiveRemoved {
            attempt: attempt(1),
            container_id: c.id,
        }])
        .unwrap();
    assert!(store.resolve_container(&c.id).is_err());
}

#[test]
fn test_attempt_rows_listed_in_order() {
    let store = store();
    let row = |n: u32| PersistedAttemptInfo {
        attempt_id: attempt(n),
        user: "carol".into(),
        queue: "root.default".into(),
        stopped: n == 1,
        final_state: (n == 1).then_some(AttemptFinalState::Failed),
        last_container_id: u64::from(n) * 10,
    };
    store
        .apply(vec![
            LedgerUpdate::AttemptInfo(row(2)),
            LedgerUpdate::AttemptInfo(row(1)),
        ])
        .unwrap();
    let rows = store.attempts().unwrap();
    assert_eq!(rows.iter().map(|r| r.attempt_id).collect::<Vec<_>>(), vec![attempt(1), attempt(2)]);
    assert_eq!(store.attempt_info(&attempt(2)).unwrap().unwrap().last_container_id, 20);
}

#[test]
fn test_update_wire_format() {
    let update = LedgerUpdate::StagedRemoved {
        attempt: attempt(1),
        container_id: ContainerId::new(attempt(1), 3),
    };
    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(json["op"], "staged_removed");
    let back: LedgerUpdate = serde_json::from_value(json).unwrap();
    assert_eq!(back, update);
}
