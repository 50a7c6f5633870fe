//! Many scheduler threads against the attempt directory.

mod common;

use std::sync::Arc;
use std::thread;

use attempt_ledger::core::{ContainerStateMachine, LedgerError, TxnContext};
use attempt_ledger::runtime::AttemptDirectory;
use attempt_ledger::util::{ApplicationId, AttemptId, ContainerId};
use common::{application, attempt, container, node, res, Harness, P1};

#[test]
fn test_parallel_attempts_keep_exact_totals() {
    let h = Harness::new();
    let directory = Arc::new(AttemptDirectory::new());
    let attempts: Vec<AttemptId> = (0..8)
        .map(|i| AttemptId::new(ApplicationId::new(1_700_000_000_000, i), 1))
        .collect();
    for id in &attempts {
        directory.admit(h.ledger(*id)).unwrap();
    }

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let directory = Arc::clone(&directory);
            let attempts = attempts.clone();
            thread::spawn(move || {
                for round in 0..50u64 {
                    for id in &attempts {
                        let ledger = directory.get(id).unwrap();
                        let seq = worker * 1_000 + round;
                        let host = ["n1", "n2", "n3"][(seq % 3) as usize];
                        ledger
                            .allocate(container(*id, seq, host, 128, 1), &mut TxnContext::None)
                            .unwrap();
                        ledger.add_scheduling_opportunity(P1);
                        ledger
                            .pull_newly_allocated_containers_and_nm_tokens(&mut TxnContext::None)
                            .unwrap();
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    for id in &attempts {
        let ledger = directory.get(id).unwrap();
        assert_eq!(ledger.live_containers().len(), 200);
        assert!(ledger.staged_containers().is_empty());
        assert_eq!(ledger.current_consumption(), res(200 * 128, 200));
        assert_eq!(ledger.scheduling_opportunities(P1), 200);
    }
}

#[test]
fn test_parallel_pulls_hand_out_each_container_once() {
    let h = Harness::new();
    let ledger = Arc::new(h.ledger(attempt(1)));
    for id in 0..300u64 {
        ledger
            .allocate(container(attempt(1), id, "n2", 64, 1), &mut TxnContext::None)
            .unwrap();
    }

    let pullers: Vec<_> = (0..6)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..20 {
                    let pulled = ledger
                        .pull_newly_allocated_containers_and_nm_tokens(&mut TxnContext::None)
                        .unwrap();
                    seen.extend(pulled.containers.into_iter().map(|c| c.id));
                }
                seen
            })
        })
        .collect();

    let mut all: Vec<ContainerId> = pullers
        .into_iter()
        .flat_map(|p| p.join().unwrap())
        .collect();
    all.sort();
    let before = all.len();
    all.dedup();
    assert_eq!(before, 300);
    assert_eq!(all.len(), 300);
}

#[test]
fn test_fail_over_hands_state_to_next_attempt() {
    let h = Harness::new();
    let directory = AttemptDirectory::new();
    let first = directory.admit(h.ledger(attempt(1))).unwrap();
    let c = container(attempt(1), 1, "n1", 1024, 1);
    first.allocate(c.clone(), &mut TxnContext::None).unwrap();
    first
        .pull_newly_allocated_containers_and_nm_tokens(&mut TxnContext::None)
        .unwrap();
    first.set_headroom(res(4096, 4), &mut TxnContext::None).unwrap();
    first.reset_scheduling_opportunities_at(P1, 77);
    first
        .reserve(&node("n2"), P1, None, container(attempt(1), 2, "n2", 512, 1), &mut TxnContext::None)
        .unwrap();

    let busy = directory.fail_over(&attempt(1), h.ledger(attempt(2)), &mut TxnContext::None);
    assert!(matches!(busy, Err(LedgerError::AttemptInUse(id)) if id == attempt(1)));
    assert!(directory.get(&attempt(1)).is_some());
    drop(first);

    let next = directory.fail_over(&attempt(1), h.ledger(attempt(2)), &mut TxnContext::None).unwrap();
    assert!(directory.get(&attempt(1)).is_none());
    assert_eq!(directory.attempts_of(&application()), vec![attempt(2)]);
    assert_eq!(next.live_container(&c.id).unwrap().container_id(), c.id);
    assert_eq!(next.current_consumption(), res(1024, 1));
    assert_eq!(next.resource_limit(), res(4096, 4));
    assert_eq!(next.last_scheduled_container().get(&P1), Some(&77));
    assert_eq!(next.current_reservation(), res(0, 0));
    assert!(next.reserved_containers().is_empty());
}

#[test]
fn test_directory_rejects_duplicates_and_unknown_attempts() {
    let h = Harness::new();
    let directory = AttemptDirectory::new();
    directory.admit(h.ledger(attempt(1))).unwrap();
    assert!(matches!(
        directory.admit(h.ledger(attempt(1))),
        Err(LedgerError::DuplicateAttempt(_))
    ));
    assert!(matches!(
        directory.fail_over(&attempt(5), h.ledger(attempt(6)), &mut TxnContext::None),
        Err(LedgerError::UnknownAttempt(_))
    ));
    assert_eq!(directory.len(), 1);
    assert!(directory.retire(&attempt(1)).is_some());
    assert!(directory.is_empty());
}
