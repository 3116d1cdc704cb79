//! Sync orchestration state machine.

use crate::config::SyncConfig;
use crate::cursor::CursorStore;
use crate::error::{SyncError, SyncResult};
use crate::events::{CycleStats, EventBus, SyncEvent};
use crate::keyspace::{self, decode, encode};
use crate::queue::{self, ChangeQueue, RequeueOutcome};
use crate::resolver::Resolver;
use crate::transport::SyncTransport;
use nestsync_protocol::{
    ActionId, ActionKind, ConflictRecord, CursorToken, EntityType, PendingAction, PullRequest,
    PushOutcome, Record, RecordId, Resolution, Revision, Timestamp,
};
use nestsync_store::{Collection, LocalStore, LocalStoreExt, StoreResult, StoreTxn};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// The current state of the orchestrator.
///
/// Exactly one sync cycle is active at a time, enforced by this state
/// machine rather than by locks around the data: two cycles can never
/// race to advance the same cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No cycle in flight.
    Idle,
    /// Pulling remote changes since the persisted cursors.
    Pulling,
    /// Applying a pulled batch through the conflict resolver.
    Applying,
    /// Draining the change queue.
    Pushing,
    /// Waiting out a transient failure. A reconnect event preempts the
    /// wait.
    Backoff {
        /// When the next automatic attempt becomes due.
        until: Instant,
        /// Consecutive failed cycles so far.
        attempt: u32,
    },
    /// The last cycle hit a local fault. Terminal for that cycle; a
    /// fresh trigger starts over.
    Failed,
}

impl SyncState {
    /// Returns a short name for logging and status surfaces.
    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Pulling => "pulling",
            SyncState::Applying => "applying",
            SyncState::Pushing => "pushing",
            SyncState::Backoff { .. } => "backoff",
            SyncState::Failed => "failed",
        }
    }

    /// Returns true while a cycle is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::Pulling | SyncState::Applying | SyncState::Pushing
        )
    }

    /// Returns true if a new cycle may start from this state.
    pub fn can_start_cycle(&self) -> bool {
        matches!(
            self,
            SyncState::Idle | SyncState::Backoff { .. } | SyncState::Failed
        )
    }
}

/// The explicit transition table. Anything not listed is illegal —
/// "pushing while pulling" is unrepresentable.
fn can_transition(from: &SyncState, to: &SyncState) -> bool {
    use SyncState::*;
    matches!(
        (from, to),
        (Idle, Pulling)
            | (Backoff { .. }, Pulling)
            | (Failed, Pulling)
            | (Pulling, Applying)
            | (Applying, Pulling)
            | (Pulling, Pushing)
            | (Applying, Pushing)
            | (Pushing, Idle)
            | (Pulling, Backoff { .. })
            | (Applying, Backoff { .. })
            | (Pushing, Backoff { .. })
            | (Pulling, Failed)
            | (Applying, Failed)
            | (Pushing, Failed)
    )
}

/// What prompted a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Connectivity came back.
    Reconnect,
    /// The periodic timer or a backoff deadline elapsed.
    Timer,
    /// A caller asked explicitly.
    Force,
}

/// Result of requesting a cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A cycle ran to completion.
    Completed(CycleStats),
    /// A cycle was already in flight; the request was coalesced into
    /// one pending re-run.
    Coalesced,
}

/// Lifetime counters for one orchestrator.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Completed cycles.
    pub cycles_completed: u64,
    /// Remote changes applied.
    pub records_pulled: u64,
    /// Actions acknowledged by the server.
    pub actions_pushed: u64,
    /// Conflicts detected.
    pub conflicts_detected: u64,
    /// Actions moved to the dead-letter set.
    pub actions_dead_lettered: u64,
    /// Wall-clock time of the last successful cycle.
    pub last_success: Option<Timestamp>,
    /// Message of the last failure, cleared on success.
    pub last_error: Option<String>,
}

/// Snapshot surfaced to UI collaborators for "pending"/"offline"
/// indicators.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    /// Current state name.
    pub state: &'static str,
    /// Pending actions not yet confirmed remotely.
    pub queue_depth: usize,
    /// Actions awaiting manual resolution.
    pub dead_lettered: usize,
    /// Wall-clock time of the last successful cycle.
    pub last_success: Option<Timestamp>,
}

/// Drives pull→merge→push cycles against injected collaborators.
///
/// Each orchestrator owns its queue and cursor state explicitly, so
/// multiple independent engines (one per signed-in profile) can coexist
/// and be unit-tested in isolation.
pub struct SyncOrchestrator<S, T> {
    config: SyncConfig,
    store: Arc<S>,
    transport: Arc<T>,
    queue: ChangeQueue<S>,
    cursors: CursorStore<S>,
    resolver: Resolver,
    state: RwLock<SyncState>,
    /// Held for the duration of a cycle; `try_lock` failure means a
    /// cycle is in flight and the trigger coalesces.
    cycle_lock: Mutex<()>,
    pending_trigger: AtomicBool,
    online: AtomicBool,
    cycle_attempts: AtomicU32,
    next_periodic_at: Mutex<Instant>,
    events: EventBus,
    stats: RwLock<SyncStats>,
}

impl<S: LocalStore, T: SyncTransport> SyncOrchestrator<S, T> {
    /// Creates an orchestrator over the given store and transport.
    ///
    /// Connectivity is assumed until a network monitor reports
    /// otherwise.
    pub fn new(config: SyncConfig, store: Arc<S>, transport: Arc<T>) -> Self {
        let queue = ChangeQueue::new(Arc::clone(&store));
        let cursors = CursorStore::new(Arc::clone(&store));
        let resolver = Resolver::new(config.policy);
        let next_periodic_at = Mutex::new(Instant::now() + config.sync_interval);
        Self {
            config,
            store,
            transport,
            queue,
            cursors,
            resolver,
            state: RwLock::new(SyncState::Idle),
            cycle_lock: Mutex::new(()),
            pending_trigger: AtomicBool::new(false),
            online: AtomicBool::new(true),
            cycle_attempts: AtomicU32::new(0),
            next_periodic_at,
            events: EventBus::new(),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Returns lifetime counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Subscribes to engine events.
    pub fn subscribe(&self) -> Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Returns the status snapshot for UI collaborators.
    pub fn status(&self) -> SyncResult<SyncStatus> {
        Ok(SyncStatus {
            state: self.state().name(),
            queue_depth: self.queue.depth()?,
            dead_lettered: self.queue.dead_letters()?.len(),
            last_success: self.stats.read().last_success,
        })
    }

    /// Returns the number of pending actions.
    pub fn queue_depth(&self) -> SyncResult<usize> {
        self.queue.depth()
    }

    /// Returns the persisted pull cursor for a collection.
    pub fn cursor(&self, collection: &EntityType) -> SyncResult<CursorToken> {
        self.cursors.get(collection)
    }

    /// Returns the dead-letter set for manual resolution.
    pub fn dead_letters(&self) -> SyncResult<Vec<PendingAction>> {
        self.queue.dead_letters()
    }

    /// Returns records of a collection whose last store commit happened
    /// after the given store sequence, with their commit sequence.
    ///
    /// A diagnostic surface for conflict investigation; never used for
    /// correctness.
    pub fn changed_since(
        &self,
        entity_type: &EntityType,
        since: u64,
    ) -> SyncResult<Vec<(RecordId, u64)>> {
        let changed = self
            .store
            .changed_since(&record_collection(entity_type), since)?;
        let mut out = Vec::with_capacity(changed.len());
        for (key, seq) in changed {
            let raw: [u8; 16] = key.as_slice().try_into().map_err(|_| {
                nestsync_store::StorageError::corrupted("record key is not an id")
            })?;
            out.push((RecordId::from_bytes(raw), seq));
        }
        Ok(out)
    }

    /// Returns the conflict audit log, oldest first.
    pub fn conflict_log(&self) -> SyncResult<Vec<ConflictRecord>> {
        let mut conflicts = Vec::new();
        for (_, bytes) in self.store.scan(&keyspace::conflicts())? {
            conflicts.push(decode::<ConflictRecord>(&bytes)?);
        }
        conflicts.sort_by_key(|c| c.resolved_at);
        Ok(conflicts)
    }

    /// Reads a record from the local store.
    pub fn record(&self, entity_type: &EntityType, id: RecordId) -> SyncResult<Option<Record>> {
        let bytes = self
            .store
            .get(&record_collection(entity_type), id.as_bytes())?;
        match bytes {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Captures a local creation: writes the record and queues a Create
    /// action in one transaction.
    ///
    /// Storage failures propagate to the caller; they signal a local
    /// environment fault the engine cannot fix by retrying.
    pub fn submit_create(&self, record: Record) -> SyncResult<ActionId> {
        self.submit_upsert(record, true)
    }

    /// Captures a local update: writes the record and queues an Update
    /// action in one transaction.
    pub fn submit_update(&self, record: Record) -> SyncResult<ActionId> {
        self.submit_upsert(record, false)
    }

    fn submit_upsert(&self, mut record: Record, create: bool) -> SyncResult<ActionId> {
        let now = Timestamp::now();
        let max_retries = self.config.max_retries;
        let action_id = self.store.with_txn(|txn| {
            let collection = record_collection(&record.entity_type);
            let prev_ts = get_record_in(txn, &collection, record.id)?
                .map(|prev| prev.modified_at)
                .unwrap_or_default();
            record.modified_at = now.bumped_past(prev_ts);
            put_record_in(txn, &collection, &record)?;
            let kind = if create {
                ActionKind::Create {
                    record: record.clone(),
                }
            } else {
                ActionKind::Update {
                    record: record.clone(),
                }
            };
            let action = queue::enqueue_in(txn, kind, now, max_retries)?;
            Ok(action.id)
        })?;
        debug!(action = %action_id, create, "captured local mutation");
        Ok(action_id)
    }

    /// Captures a local deletion: writes the tombstone and queues a
    /// Delete action in one transaction.
    pub fn submit_delete(&self, entity_type: &EntityType, id: RecordId) -> SyncResult<ActionId> {
        let collection = record_collection(entity_type);
        if self.store.get(&collection, id.as_bytes())?.is_none() {
            return Err(SyncError::UnknownRecord {
                entity_type: entity_type.to_string(),
                id: id.to_string(),
            });
        }

        let now = Timestamp::now();
        let max_retries = self.config.max_retries;
        let action_id = self.store.with_txn(|txn| {
            let Some(prev) = get_record_in(txn, &collection, id)? else {
                return Err(nestsync_store::StorageError::TransactionFailed(format!(
                    "record {id} vanished during delete"
                )));
            };
            let deleted_at = now.bumped_past(prev.modified_at);
            let tombstone = prev.into_tombstone(deleted_at);
            put_record_in(txn, &collection, &tombstone)?;
            let action = queue::enqueue_in(
                txn,
                ActionKind::Delete {
                    entity_type: entity_type.clone(),
                    id,
                    deleted_at,
                },
                now,
                max_retries,
            )?;
            Ok(action.id)
        })?;
        debug!(action = %action_id, "captured local deletion");
        Ok(action_id)
    }

    /// Reacts to a connectivity transition.
    ///
    /// A reconnect always triggers a cycle, preempting any backoff wait.
    /// Errors from the automatic cycle never escape here.
    pub fn handle_connectivity(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if online {
            if !was_online {
                info!("connectivity restored");
            }
            if let Err(e) = self.drive(SyncTrigger::Reconnect) {
                debug!(error = %e, "sync after reconnect failed");
            }
        } else if was_online {
            info!("connectivity lost");
        }
    }

    /// Runs a cycle if the periodic timer or a backoff deadline is due.
    ///
    /// Errors from the automatic cycle never escape here.
    pub fn tick(&self) {
        if !self.online.load(Ordering::SeqCst) {
            return;
        }
        let due = match *self.state.read() {
            SyncState::Backoff { until, .. } => Instant::now() >= until,
            SyncState::Idle | SyncState::Failed => {
                Instant::now() >= *self.next_periodic_at.lock()
            }
            _ => false,
        };
        if due {
            if let Err(e) = self.drive(SyncTrigger::Timer) {
                debug!(error = %e, "scheduled sync failed");
            }
        }
    }

    /// Runs a cycle now, cancelling any backoff wait.
    ///
    /// Unlike the automatic triggers, failures propagate to the caller.
    pub fn force_sync(&self) -> SyncResult<CycleOutcome> {
        self.drive(SyncTrigger::Force)
    }

    /// Time until the orchestrator next wants a [`tick`](Self::tick).
    pub fn next_due_in(&self) -> Duration {
        match *self.state.read() {
            SyncState::Backoff { until, .. } => until.saturating_duration_since(Instant::now()),
            _ => self
                .next_periodic_at
                .lock()
                .saturating_duration_since(Instant::now()),
        }
    }

    fn drive(&self, trigger: SyncTrigger) -> SyncResult<CycleOutcome> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(SyncError::Offline);
        }
        let Some(_guard) = self.cycle_lock.try_lock() else {
            self.pending_trigger.store(true, Ordering::SeqCst);
            debug!(?trigger, "cycle in flight; trigger coalesced");
            return Ok(CycleOutcome::Coalesced);
        };

        debug!(?trigger, "starting sync cycle");
        loop {
            match self.run_cycle() {
                Ok(stats) => {
                    self.cycle_attempts.store(0, Ordering::SeqCst);
                    *self.next_periodic_at.lock() = Instant::now() + self.config.sync_interval;
                    {
                        let mut lifetime = self.stats.write();
                        lifetime.cycles_completed += 1;
                        lifetime.last_success = Some(Timestamp::now());
                        lifetime.last_error = None;
                    }
                    self.events.emit(SyncEvent::CycleCompleted(stats.clone()));
                    if self.pending_trigger.swap(false, Ordering::SeqCst) {
                        debug!("running coalesced cycle");
                        continue;
                    }
                    return Ok(CycleOutcome::Completed(stats));
                }
                Err(e) => {
                    self.pending_trigger.store(false, Ordering::SeqCst);
                    self.stats.write().last_error = Some(e.to_string());
                    if e.is_transient() {
                        let attempt = self.cycle_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                        let delay = self.config.backoff.delay_for_attempt(attempt);
                        let until = Instant::now() + delay;
                        if let Err(transition) =
                            self.set_state(SyncState::Backoff { until, attempt })
                        {
                            warn!(error = %transition, "could not enter backoff");
                        }
                        warn!(
                            error = %e,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "cycle failed; backing off"
                        );
                    } else {
                        if let Err(transition) = self.set_state(SyncState::Failed) {
                            warn!(error = %transition, "could not enter failed state");
                        }
                        error!(error = %e, "cycle failed on local fault");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// One full pull-apply pass over every collection, then a bounded
    /// push batch. Bounding the push keeps per-cycle remote call volume
    /// predictable while still guaranteeing eventual queue drainage
    /// under intermittent connectivity.
    fn run_cycle(&self) -> SyncResult<CycleStats> {
        let started = Instant::now();
        self.set_state(SyncState::Pulling)?;
        self.events.emit(SyncEvent::CycleStarted);
        let mut stats = CycleStats::default();

        for collection in &self.config.collections {
            self.pull_collection(collection, &mut stats)?;
        }

        self.set_state(SyncState::Pushing)?;
        self.push_queue(&mut stats)?;

        self.set_state(SyncState::Idle)?;
        stats.duration = started.elapsed();
        info!(
            pulled = stats.pulled,
            pushed = stats.pushed,
            conflicts = stats.conflicts,
            "sync cycle completed"
        );
        Ok(stats)
    }

    fn pull_collection(&self, collection: &EntityType, stats: &mut CycleStats) -> SyncResult<()> {
        loop {
            let cursor = self.cursors.get(collection)?;
            let request = PullRequest::new(collection.clone(), cursor, self.config.pull_batch_size);
            let response = self.transport.pull(&request)?;

            if response.changes.is_empty() {
                self.cursors.advance(collection, response.new_cursor)?;
                if !response.has_more {
                    return Ok(());
                }
                continue;
            }

            self.set_state(SyncState::Applying)?;
            let conflicts = self.apply_batch(collection, &response.changes)?;
            stats.pulled += response.changes.len() as u64;
            stats.conflicts += conflicts.len() as u64;
            {
                let mut lifetime = self.stats.write();
                lifetime.records_pulled += response.changes.len() as u64;
                lifetime.conflicts_detected += conflicts.len() as u64;
            }
            // The cursor advances only after the apply transaction has
            // committed; a crash between the two re-applies the batch,
            // which resolves to the same state.
            self.cursors.advance(collection, response.new_cursor)?;
            for conflict in conflicts {
                self.events.emit(SyncEvent::ConflictDetected(conflict));
            }
            self.set_state(SyncState::Pulling)?;
            if !response.has_more {
                return Ok(());
            }
        }
    }

    /// Applies one pulled batch inside a single store transaction.
    fn apply_batch(
        &self,
        collection: &EntityType,
        changes: &[Record],
    ) -> SyncResult<Vec<ConflictRecord>> {
        let store_collection = record_collection(collection);
        let resolver = self.resolver;
        let now = Timestamp::now();
        let conflicts = self.store.with_txn(|txn| {
            let mut detected = Vec::new();
            for remote in changes {
                match get_record_in(txn, &store_collection, remote.id)? {
                    None => {
                        put_record_in(txn, &store_collection, remote)?;
                        put_shadow_in(txn, remote)?;
                    }
                    Some(local) => {
                        let base = get_shadow_in(txn, remote.id)?;
                        let resolution = resolver.resolve(&local, remote, base.as_ref());
                        if Resolver::diverged(&local, remote, base.as_ref()) {
                            let conflict = ConflictRecord::new(
                                local.clone(),
                                remote.clone(),
                                resolution.kind(),
                                now,
                            );
                            let key = conflict.audit_key();
                            if txn.get(&keyspace::conflicts(), &key)?.is_none() {
                                txn.put(&keyspace::conflicts(), &key, encode(&conflict)?)?;
                                detected.push(conflict);
                            }
                        }
                        match resolution {
                            Resolution::KeepLocal => {
                                if local.remote_rev < remote.remote_rev {
                                    let mut kept = local;
                                    kept.remote_rev = remote.remote_rev;
                                    put_record_in(txn, &store_collection, &kept)?;
                                }
                                put_shadow_in(txn, remote)?;
                            }
                            Resolution::KeepRemote => {
                                let mut applied = remote.clone();
                                applied.modified_at =
                                    applied.modified_at.bumped_past(local.modified_at);
                                put_record_in(txn, &store_collection, &applied)?;
                                put_shadow_in(txn, remote)?;
                            }
                            Resolution::Merge(mut merged) => {
                                merged.modified_at =
                                    merged.modified_at.bumped_past(local.modified_at);
                                put_record_in(txn, &store_collection, &merged)?;
                                // A queued snapshot taken before the merge
                                // would clobber it on push; rebase it now,
                                // in the same transaction.
                                queue::rebase_in(txn, &merged)?;
                                put_shadow_in(txn, remote)?;
                            }
                            Resolution::Manual => {
                                // Local stays put and the shadow does not
                                // advance, so the conflict resurfaces each
                                // cycle until resolved; the audit entry is
                                // deduplicated by its key.
                            }
                        }
                    }
                }
            }
            Ok(detected)
        })?;
        Ok(conflicts)
    }

    fn push_queue(&self, stats: &mut CycleStats) -> SyncResult<()> {
        let now = Timestamp::now();
        let batch = self
            .queue
            .dequeue_batch(self.config.push_batch_size as usize, now)?;
        for action in batch {
            match self.transport.push_one(&action) {
                Ok(PushOutcome::Acknowledged { new_rev }) => {
                    self.finish_push(&action, new_rev)?;
                    stats.pushed += 1;
                    self.stats.write().actions_pushed += 1;
                }
                Ok(PushOutcome::Rejected { reason }) => {
                    warn!(action = %action.id, reason = %reason, "push permanently rejected");
                    if let Some(dead) = self.queue.dead_letter(action.id)? {
                        stats.dead_lettered += 1;
                        self.stats.write().actions_dead_lettered += 1;
                        self.events.emit(SyncEvent::ActionDeadLettered(dead));
                    }
                }
                Err(e) if e.is_transient() => {
                    debug!(action = %action.id, error = %e, "push failed; requeueing");
                    match self
                        .queue
                        .requeue(action.id, &self.config.backoff, Timestamp::now())?
                    {
                        RequeueOutcome::Retried { .. } => {}
                        RequeueOutcome::DeadLettered(dead) => {
                            stats.dead_lettered += 1;
                            self.stats.write().actions_dead_lettered += 1;
                            self.events.emit(SyncEvent::ActionDeadLettered(dead));
                        }
                    }
                    // Unattempted items defer to the next cycle rather
                    // than retrying inline.
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Acknowledges a pushed action and records the server's view.
    fn finish_push(&self, action: &PendingAction, new_rev: Revision) -> SyncResult<()> {
        self.store.with_txn(|txn| {
            let removed = queue::acknowledge_in(txn, action.id)?;
            if !removed {
                warn!(action = %action.id, "acknowledged action missing from queue");
            }
            let collection = record_collection(action.entity_type());
            match &action.kind {
                ActionKind::Create { record } | ActionKind::Update { record } => {
                    if let Some(mut current) = get_record_in(txn, &collection, record.id)? {
                        if current.remote_rev < new_rev {
                            current.remote_rev = new_rev;
                            put_record_in(txn, &collection, &current)?;
                        }
                    }
                    let mut shadow = record.clone();
                    shadow.remote_rev = new_rev;
                    put_shadow_in(txn, &shadow)?;
                }
                ActionKind::Delete { id, .. } => {
                    if let Some(mut current) = get_record_in(txn, &collection, *id)? {
                        if current.remote_rev < new_rev {
                            current.remote_rev = new_rev;
                            put_record_in(txn, &collection, &current)?;
                        }
                        let mut shadow = current;
                        shadow.remote_rev = new_rev;
                        put_shadow_in(txn, &shadow)?;
                    }
                }
            }
            Ok(())
        })?;
        debug!(action = %action.id, rev = new_rev.value(), "push acknowledged");
        Ok(())
    }

    fn set_state(&self, to: SyncState) -> SyncResult<()> {
        let mut state = self.state.write();
        if !can_transition(&state, &to) {
            return Err(SyncError::InvalidTransition {
                from: state.name().into(),
                to: to.name().into(),
            });
        }
        debug!(from = state.name(), to = to.name(), "state transition");
        *state = to;
        Ok(())
    }
}

fn record_collection(entity_type: &EntityType) -> Collection {
    Collection::new(entity_type.as_str())
}

fn get_record_in(
    txn: &dyn StoreTxn,
    collection: &Collection,
    id: RecordId,
) -> StoreResult<Option<Record>> {
    match txn.get(collection, id.as_bytes())? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn put_record_in(
    txn: &mut dyn StoreTxn,
    collection: &Collection,
    record: &Record,
) -> StoreResult<()> {
    txn.put(collection, record.id.as_bytes(), encode(record)?)
}

fn get_shadow_in(txn: &dyn StoreTxn, id: RecordId) -> StoreResult<Option<Record>> {
    match txn.get(&keyspace::shadows(), id.as_bytes())? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn put_shadow_in(txn: &mut dyn StoreTxn, record: &Record) -> StoreResult<()> {
    txn.put(&keyspace::shadows(), record.id.as_bytes(), encode(record)?)
}
