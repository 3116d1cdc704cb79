//! Durable change queue.

use crate::config::BackoffConfig;
use crate::error::SyncResult;
use crate::keyspace::{self, decode, encode};
use nestsync_protocol::{ActionId, ActionKind, EntityType, PendingAction, Record, RecordId, Timestamp};
use nestsync_store::{LocalStore, LocalStoreExt, StorageError, StoreResult, StoreTxn};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of requeuing a failed action.
#[derive(Debug, Clone, PartialEq)]
pub enum RequeueOutcome {
    /// The action stays queued and becomes eligible again at the given
    /// time.
    Retried {
        /// Earliest next push attempt.
        next_eligible_at: Timestamp,
    },
    /// The retry budget is spent; the action moved to the dead-letter
    /// set and must be surfaced for manual resolution.
    DeadLettered(PendingAction),
}

/// The durable, ordered set of local mutations not yet confirmed
/// remotely.
///
/// Actions are keyed by a persisted sequence number, so iteration order
/// is enqueue order. Actions for the same entity are strictly FIFO;
/// cross-entity ordering is unconstrained. Every operation runs inside a
/// Local Store transaction, so enqueue/apply/acknowledge can never be
/// observed half-done after a crash.
pub struct ChangeQueue<S> {
    store: Arc<S>,
}

impl<S: LocalStore> ChangeQueue<S> {
    /// Creates a queue over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Appends an action with a zero retry count.
    ///
    /// Fails only on an underlying durable-storage write failure,
    /// propagated as a storage error.
    pub fn enqueue(&self, kind: ActionKind, max_retries: u32) -> SyncResult<PendingAction> {
        let now = Timestamp::now();
        let action = self
            .store
            .with_txn(|txn| enqueue_in(txn, kind, now, max_retries))?;
        debug!(
            action = %action.id,
            kind = action.kind.name(),
            seq = action.seq,
            "enqueued pending action"
        );
        Ok(action)
    }

    /// Returns up to `max` eligible actions in FIFO order, keeping
    /// same-entity actions contiguous.
    ///
    /// An ineligible action blocks every later action for its entity
    /// (head-of-line), preserving per-entity push order across retries.
    pub fn dequeue_batch(&self, max: usize, now: Timestamp) -> SyncResult<Vec<PendingAction>> {
        let entries = self.store.scan(&keyspace::actions())?;

        let mut blocked: HashSet<(EntityType, RecordId)> = HashSet::new();
        let mut groups: Vec<((EntityType, RecordId), Vec<PendingAction>)> = Vec::new();
        for (_, bytes) in entries {
            let action: PendingAction = decode(&bytes)?;
            let key = (action.entity_type().clone(), action.record_id());
            if blocked.contains(&key) {
                continue;
            }
            if !action.is_eligible(now) {
                blocked.insert(key);
                continue;
            }
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, group)) => group.push(action),
                None => groups.push((key, vec![action])),
            }
        }

        let mut batch = Vec::with_capacity(max.min(8));
        'outer: for (_, group) in groups {
            for action in group {
                if batch.len() == max {
                    break 'outer;
                }
                batch.push(action);
            }
        }
        Ok(batch)
    }

    /// Permanently removes an acknowledged action.
    pub fn acknowledge(&self, id: ActionId) -> SyncResult<()> {
        let removed = self.store.with_txn(|txn| acknowledge_in(txn, id))?;
        if !removed {
            warn!(action = %id, "acknowledge for unknown action");
        }
        Ok(())
    }

    /// Records a failed push attempt.
    ///
    /// Increments the retry count and schedules the next attempt via the
    /// backoff policy; once the budget is spent the action moves to the
    /// dead-letter set instead.
    pub fn requeue(
        &self,
        id: ActionId,
        backoff: &BackoffConfig,
        now: Timestamp,
    ) -> SyncResult<RequeueOutcome> {
        let outcome = self.store.with_txn(|txn| {
            let Some((key, mut action)) = find_in(txn, id)? else {
                return Err(StorageError::TransactionFailed(format!(
                    "requeue of unknown action {id}"
                )));
            };

            let delay = backoff.delay_for_attempt(action.retry_count + 1);
            action.record_retry(now.plus_millis(delay.as_millis() as u64));

            if action.retries_exhausted() {
                txn.delete(&keyspace::actions(), &key)?;
                txn.put(
                    &keyspace::dead_letter(),
                    action.id.as_bytes(),
                    encode(&action)?,
                )?;
                Ok(RequeueOutcome::DeadLettered(action))
            } else {
                let next_eligible_at = action.next_eligible_at;
                txn.put(&keyspace::actions(), &key, encode(&action)?)?;
                Ok(RequeueOutcome::Retried { next_eligible_at })
            }
        })?;

        match &outcome {
            RequeueOutcome::Retried { next_eligible_at } => {
                debug!(action = %id, eligible_at = next_eligible_at.as_millis(), "requeued action");
            }
            RequeueOutcome::DeadLettered(action) => {
                warn!(action = %id, retries = action.retry_count, "action dead-lettered");
            }
        }
        Ok(outcome)
    }

    /// Moves an action straight to the dead-letter set (permanent
    /// rejection). Returns the action, or `None` if it was not queued.
    pub fn dead_letter(&self, id: ActionId) -> SyncResult<Option<PendingAction>> {
        let moved = self.store.with_txn(|txn| {
            let Some((key, action)) = find_in(txn, id)? else {
                return Ok(None);
            };
            txn.delete(&keyspace::actions(), &key)?;
            txn.put(
                &keyspace::dead_letter(),
                action.id.as_bytes(),
                encode(&action)?,
            )?;
            Ok(Some(action))
        })?;
        if moved.is_none() {
            warn!(action = %id, "dead-letter for unknown action");
        }
        Ok(moved)
    }

    /// Returns the number of queued actions.
    pub fn depth(&self) -> SyncResult<usize> {
        Ok(self.store.scan(&keyspace::actions())?.len())
    }

    /// Returns the dead-letter set in enqueue order.
    pub fn dead_letters(&self) -> SyncResult<Vec<PendingAction>> {
        let mut actions = Vec::new();
        for (_, bytes) in self.store.scan(&keyspace::dead_letter())? {
            actions.push(decode::<PendingAction>(&bytes)?);
        }
        actions.sort_by_key(|a| a.seq);
        Ok(actions)
    }
}

/// Appends an action inside an existing transaction.
pub(crate) fn enqueue_in(
    txn: &mut dyn StoreTxn,
    kind: ActionKind,
    now: Timestamp,
    max_retries: u32,
) -> StoreResult<PendingAction> {
    let seq = next_seq_in(txn)?;
    let mut action = PendingAction::new(kind, now, max_retries);
    action.seq = seq;
    txn.put(&keyspace::actions(), &seq.to_be_bytes(), encode(&action)?)?;
    Ok(action)
}

/// Removes an acknowledged action inside an existing transaction.
pub(crate) fn acknowledge_in(txn: &mut dyn StoreTxn, id: ActionId) -> StoreResult<bool> {
    match find_in(txn, id)? {
        Some((key, _)) => {
            txn.delete(&keyspace::actions(), &key)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Rewrites queued create/update snapshots of `merged`'s record so a
/// later push carries the merged state instead of a stale pre-merge
/// snapshot.
pub(crate) fn rebase_in(txn: &mut dyn StoreTxn, merged: &Record) -> StoreResult<()> {
    let entries = txn.scan(&keyspace::actions())?;
    for (key, bytes) in entries {
        let mut action: PendingAction = decode(&bytes)?;
        let rebased = match &mut action.kind {
            ActionKind::Create { record } | ActionKind::Update { record }
                if record.id == merged.id =>
            {
                *record = merged.clone();
                true
            }
            _ => false,
        };
        if rebased {
            txn.put(&keyspace::actions(), &key, encode(&action)?)?;
        }
    }
    Ok(())
}

fn find_in(txn: &dyn StoreTxn, id: ActionId) -> StoreResult<Option<(Vec<u8>, PendingAction)>> {
    for (key, bytes) in txn.scan(&keyspace::actions())? {
        let action: PendingAction = decode(&bytes)?;
        if action.id == id {
            return Ok(Some((key, action)));
        }
    }
    Ok(None)
}

fn next_seq_in(txn: &mut dyn StoreTxn) -> StoreResult<u64> {
    const KEY: &[u8] = b"queue_seq";
    let current = match txn.get(&keyspace::meta(), KEY)? {
        Some(bytes) => {
            let raw: [u8; 8] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| StorageError::corrupted("queue sequence counter"))?;
            u64::from_be_bytes(raw)
        }
        None => 0,
    };
    let next = current + 1;
    txn.put(&keyspace::meta(), KEY, next.to_be_bytes().to_vec())?;
    Ok(next)
}
