//! End-to-end scenarios over the in-memory store and mock transport.

use nestsync_engine::{
    BackoffConfig, CycleOutcome, MockTransport, SyncConfig, SyncError, SyncEvent, SyncOrchestrator,
    SyncState,
};
use nestsync_protocol::{
    CursorToken, EntityType, FieldValue, PullResponse, Record, Revision, Timestamp,
};
use nestsync_store::MemoryStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn goals() -> EntityType {
    EntityType::new("goal")
}

fn engine(
    config: SyncConfig,
) -> (
    Arc<SyncOrchestrator<MemoryStore, MockTransport>>,
    Arc<MockTransport>,
) {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(MockTransport::new());
    let orchestrator = Arc::new(SyncOrchestrator::new(config, store, Arc::clone(&transport)));
    (orchestrator, transport)
}

fn default_engine() -> (
    Arc<SyncOrchestrator<MemoryStore, MockTransport>>,
    Arc<MockTransport>,
) {
    engine(SyncConfig::new([goals()]).with_backoff(BackoffConfig::immediate()))
}

fn goal(name: &str, target: i64) -> Record {
    Record::new(goals(), BTreeMap::new())
        .with_field("name", FieldValue::from(name))
        .with_field("targetAmount", FieldValue::Integer(target))
}

/// A record as the server would hand it out: revisioned, with a stable
/// timestamp.
fn remote_goal(id_seed: u8, target: i64, rev: u64, millis: u64) -> Record {
    let mut record = Record::new(goals(), BTreeMap::new())
        .with_field("targetAmount", FieldValue::Integer(target));
    record.id = nestsync_protocol::RecordId::from_bytes([id_seed; 16]);
    record.remote_rev = Revision::new(rev);
    record.modified_at = Timestamp::from_millis(millis);
    record
}

#[test]
fn scenario_a_offline_creates_push_in_order_on_reconnect() {
    let (orchestrator, transport) = default_engine();

    orchestrator.handle_connectivity(false);

    let goal_a = goal("Goal A", 1000);
    let goal_b = goal("Goal B", 250);
    let action_a = orchestrator.submit_create(goal_a.clone()).unwrap();
    let action_b = orchestrator.submit_create(goal_b.clone()).unwrap();

    assert_eq!(orchestrator.queue_depth().unwrap(), 2);
    assert!(matches!(
        orchestrator.force_sync(),
        Err(SyncError::Offline)
    ));

    // The server moves the feed cursor even though nothing changed.
    transport.enqueue_pull(goals(), PullResponse::new(vec![], CursorToken::new(5), false));

    orchestrator.handle_connectivity(true);

    // Both creates pushed, in enqueue order.
    let pushed = transport.pushed_actions();
    assert_eq!(pushed.len(), 2);
    assert_eq!(pushed[0].id, action_a);
    assert_eq!(pushed[1].id, action_b);

    // Queue empties and the cursor advanced.
    assert_eq!(orchestrator.queue_depth().unwrap(), 0);
    assert_eq!(orchestrator.cursor(&goals()).unwrap(), CursorToken::new(5));
    assert_eq!(orchestrator.state(), SyncState::Idle);

    // Acknowledged records now carry server revisions.
    let stored = orchestrator.record(&goals(), goal_a.id).unwrap().unwrap();
    assert!(!stored.remote_rev.is_none());
}

#[test]
fn scenario_b_disjoint_edits_merge() {
    let (orchestrator, transport) = default_engine();
    let events = orchestrator.subscribe();

    // The record arrives from the server first, establishing the common
    // ancestor.
    let base = remote_goal(7, 500, 1, 1_000);
    transport.enqueue_pull(
        goals(),
        PullResponse::new(vec![base.clone()], CursorToken::new(1), false),
    );
    orchestrator.force_sync().unwrap();

    // Local session edits targetAmount.
    let mut local = orchestrator.record(&goals(), base.id).unwrap().unwrap();
    local
        .fields
        .insert("targetAmount".into(), FieldValue::Integer(1000));
    orchestrator.submit_update(local).unwrap();

    // A remote session concurrently sets a note.
    let mut remote = base.clone();
    remote.remote_rev = Revision::new(2);
    remote.modified_at = Timestamp::from_millis(2_000);
    remote.fields.insert("note".into(), FieldValue::from("hi"));
    transport.enqueue_pull(
        goals(),
        PullResponse::new(vec![remote], CursorToken::new(2), false),
    );

    orchestrator.force_sync().unwrap();

    let merged = orchestrator.record(&goals(), base.id).unwrap().unwrap();
    assert_eq!(
        merged.field("targetAmount"),
        Some(&FieldValue::Integer(1000))
    );
    assert_eq!(merged.field("note"), Some(&FieldValue::from("hi")));

    // The divergence was reported exactly once.
    let conflict_events: Vec<_> = events
        .try_iter()
        .filter(|e| matches!(e, SyncEvent::ConflictDetected(_)))
        .collect();
    assert_eq!(conflict_events.len(), 1);
    assert_eq!(orchestrator.conflict_log().unwrap().len(), 1);
}

#[test]
fn scenario_c_delete_beats_concurrent_update() {
    let (orchestrator, transport) = default_engine();

    let base = remote_goal(9, 1000, 1, 1_000);
    transport.enqueue_pull(
        goals(),
        PullResponse::new(vec![base.clone()], CursorToken::new(1), false),
    );
    orchestrator.force_sync().unwrap();

    // Local deletes while a remote session raises the target.
    orchestrator.submit_delete(&goals(), base.id).unwrap();

    let mut remote = base.clone();
    remote.remote_rev = Revision::new(2);
    remote.modified_at = Timestamp::from_millis(2_000);
    remote
        .fields
        .insert("targetAmount".into(), FieldValue::Integer(2000));
    transport.enqueue_pull(
        goals(),
        PullResponse::new(vec![remote], CursorToken::new(2), false),
    );

    orchestrator.force_sync().unwrap();

    // The deletion wins and is not resurrected.
    let stored = orchestrator.record(&goals(), base.id).unwrap().unwrap();
    assert!(stored.is_tombstone());
    // The queued delete went out to the server.
    assert!(transport
        .pushed_actions()
        .iter()
        .any(|a| a.kind.name() == "delete"));
}

#[test]
fn scenario_d_retries_exhaust_into_dead_letter() {
    let (orchestrator, transport) =
        engine(SyncConfig::new([goals()]).with_backoff(BackoffConfig::immediate()));
    let events = orchestrator.subscribe();

    orchestrator.submit_create(goal("Doomed", 1)).unwrap();

    // max_retries is 3: three transient failures exhaust the budget.
    for _ in 0..3 {
        transport.enqueue_push_error(SyncError::transient("connection refused"));
        assert!(orchestrator.force_sync().is_err());
    }

    assert_eq!(orchestrator.queue_depth().unwrap(), 0);
    let dead = orchestrator.dead_letters().unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].retry_count, 3);

    // The terminal event fired exactly once.
    let dead_events: Vec<_> = events
        .try_iter()
        .filter(|e| matches!(e, SyncEvent::ActionDeadLettered(_)))
        .collect();
    assert_eq!(dead_events.len(), 1);

    // Dead-lettered actions stay visible; nothing further pushes them.
    transport.enqueue_pull(goals(), PullResponse::empty(CursorToken::START));
    orchestrator.force_sync().unwrap();
    assert_eq!(orchestrator.dead_letters().unwrap().len(), 1);
}

#[test]
fn scenario_e_reconnect_preempts_backoff() {
    let backoff = BackoffConfig::new()
        .with_initial_delay(Duration::from_secs(20))
        .with_max_delay(Duration::from_secs(60));
    let (orchestrator, transport) = engine(SyncConfig::new([goals()]).with_backoff(backoff));

    transport.enqueue_pull_error(goals(), SyncError::transient("link down"));
    assert!(orchestrator.force_sync().is_err());

    match orchestrator.state() {
        SyncState::Backoff { attempt, .. } => assert_eq!(attempt, 1),
        other => panic!("expected backoff, got {other:?}"),
    }
    assert!(orchestrator.next_due_in() > Duration::from_secs(10));

    // A reconnect event arrives with most of the wait remaining: the
    // cycle restarts immediately, not after the full delay.
    let started = Instant::now();
    orchestrator.handle_connectivity(true);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(orchestrator.state(), SyncState::Idle);
    assert_eq!(orchestrator.stats().cycles_completed, 1);
}

#[test]
fn fifo_per_entity_across_cycles() {
    let (orchestrator, transport) = default_engine();

    let record = goal("Savings", 100);
    orchestrator.submit_create(record.clone()).unwrap();
    for target in [200, 300, 400] {
        let mut updated = orchestrator.record(&goals(), record.id).unwrap().unwrap();
        updated
            .fields
            .insert("targetAmount".into(), FieldValue::Integer(target));
        orchestrator.submit_update(updated).unwrap();
    }

    orchestrator.force_sync().unwrap();

    let pushed = transport.pushed_actions();
    assert_eq!(pushed.len(), 4);
    let seqs: Vec<_> = pushed.iter().map(|a| a.seq).collect();
    let mut sorted = seqs.clone();
    sorted.sort_unstable();
    assert_eq!(seqs, sorted);
}

#[test]
fn transient_push_failure_defers_unattempted_actions() {
    let (orchestrator, transport) = default_engine();

    orchestrator.submit_create(goal("First", 1)).unwrap();
    orchestrator.submit_create(goal("Second", 2)).unwrap();

    transport.enqueue_push_error(SyncError::Timeout);
    assert!(orchestrator.force_sync().is_err());

    // Only the first action was attempted; the second deferred to the
    // next cycle instead of retrying inline.
    assert_eq!(transport.push_count(), 1);
    assert_eq!(orchestrator.queue_depth().unwrap(), 2);

    orchestrator.force_sync().unwrap();
    assert_eq!(orchestrator.queue_depth().unwrap(), 0);
}

#[test]
fn applying_the_same_changeset_twice_is_idempotent() {
    let (orchestrator, transport) = default_engine();

    let change = remote_goal(3, 750, 2, 1_500);
    transport.enqueue_pull(
        goals(),
        PullResponse::new(vec![change.clone()], CursorToken::new(2), false),
    );
    orchestrator.force_sync().unwrap();
    let first = orchestrator.record(&goals(), change.id).unwrap().unwrap();

    // A crash before the cursor persisted re-delivers the same batch.
    transport.enqueue_pull(
        goals(),
        PullResponse::new(vec![change.clone()], CursorToken::new(2), false),
    );
    orchestrator.force_sync().unwrap();
    let second = orchestrator.record(&goals(), change.id).unwrap().unwrap();

    assert_eq!(first, second);
}

#[test]
fn reapply_with_dirty_local_record_is_stable() {
    let (orchestrator, transport) = default_engine();

    let base = remote_goal(4, 500, 1, 1_000);
    transport.enqueue_pull(
        goals(),
        PullResponse::new(vec![base.clone()], CursorToken::new(1), false),
    );
    orchestrator.force_sync().unwrap();

    let mut local = orchestrator.record(&goals(), base.id).unwrap().unwrap();
    local
        .fields
        .insert("targetAmount".into(), FieldValue::Integer(900));
    orchestrator.submit_update(local).unwrap();

    // Stop the queued action from pushing so the record stays dirty.
    let mut remote = base.clone();
    remote.remote_rev = Revision::new(2);
    remote.fields.insert("note".into(), FieldValue::from("x"));

    for _ in 0..2 {
        transport.enqueue_pull(
            goals(),
            PullResponse::new(vec![remote.clone()], CursorToken::new(2), false),
        );
        transport.enqueue_push_error(SyncError::Timeout);
        let _ = orchestrator.force_sync();
    }

    let merged = orchestrator.record(&goals(), base.id).unwrap().unwrap();
    assert_eq!(merged.field("targetAmount"), Some(&FieldValue::Integer(900)));
    assert_eq!(merged.field("note"), Some(&FieldValue::from("x")));
    // The second application of the same remote version changed nothing
    // and logged no second conflict.
    assert_eq!(orchestrator.conflict_log().unwrap().len(), 1);
}

#[test]
fn cursor_never_regresses_across_pulls() {
    let (orchestrator, transport) = default_engine();

    transport.enqueue_pull(goals(), PullResponse::new(vec![], CursorToken::new(9), false));
    orchestrator.force_sync().unwrap();
    assert_eq!(orchestrator.cursor(&goals()).unwrap(), CursorToken::new(9));

    // A confused server answers with an older token; the persisted
    // cursor holds.
    transport.enqueue_pull(goals(), PullResponse::new(vec![], CursorToken::new(3), false));
    orchestrator.force_sync().unwrap();
    assert_eq!(orchestrator.cursor(&goals()).unwrap(), CursorToken::new(9));
}

#[test]
fn failed_pull_does_not_advance_cursor() {
    let (orchestrator, transport) = default_engine();

    transport.enqueue_pull(goals(), PullResponse::new(vec![], CursorToken::new(4), false));
    orchestrator.force_sync().unwrap();
    assert_eq!(orchestrator.cursor(&goals()).unwrap(), CursorToken::new(4));

    transport.enqueue_pull_error(goals(), SyncError::transient("flaky link"));
    assert!(orchestrator.force_sync().is_err());
    assert_eq!(orchestrator.cursor(&goals()).unwrap(), CursorToken::new(4));
}

#[test]
fn permanent_rejection_dead_letters_immediately() {
    let (orchestrator, transport) = default_engine();
    let events = orchestrator.subscribe();

    orchestrator.submit_create(goal("Rejected", 1)).unwrap();
    orchestrator.submit_create(goal("Accepted", 2)).unwrap();

    transport.enqueue_push(nestsync_protocol::PushOutcome::Rejected {
        reason: "validation failed".into(),
    });

    match orchestrator.force_sync().unwrap() {
        CycleOutcome::Completed(stats) => {
            // The rejection did not abort the cycle; the second action
            // still pushed.
            assert_eq!(stats.pushed, 1);
            assert_eq!(stats.dead_lettered, 1);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(orchestrator.dead_letters().unwrap().len(), 1);
    assert!(events
        .try_iter()
        .any(|e| matches!(e, SyncEvent::ActionDeadLettered(_))));
}

#[test]
fn cycle_events_bracket_the_cycle() {
    let (orchestrator, _transport) = default_engine();
    let events = orchestrator.subscribe();

    orchestrator.force_sync().unwrap();

    let collected: Vec<_> = events.try_iter().collect();
    assert!(matches!(collected.first(), Some(SyncEvent::CycleStarted)));
    assert!(matches!(
        collected.last(),
        Some(SyncEvent::CycleCompleted(_))
    ));
}

#[test]
fn multi_batch_pull_applies_everything() {
    let config = SyncConfig::new([goals()])
        .with_pull_batch_size(1)
        .with_backoff(BackoffConfig::immediate());
    let (orchestrator, transport) = engine(config);

    let first = remote_goal(11, 100, 1, 1_000);
    let second = remote_goal(12, 200, 2, 1_100);
    transport.enqueue_pull(
        goals(),
        PullResponse::new(vec![first.clone()], CursorToken::new(1), true),
    );
    transport.enqueue_pull(
        goals(),
        PullResponse::new(vec![second.clone()], CursorToken::new(2), false),
    );

    match orchestrator.force_sync().unwrap() {
        CycleOutcome::Completed(stats) => assert_eq!(stats.pulled, 2),
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert!(orchestrator.record(&goals(), first.id).unwrap().is_some());
    assert!(orchestrator.record(&goals(), second.id).unwrap().is_some());
    assert_eq!(orchestrator.cursor(&goals()).unwrap(), CursorToken::new(2));
}
