//! Remote transport abstraction.

use crate::error::{SyncError, SyncResult};
use nestsync_protocol::{
    EntityType, PendingAction, PullRequest, PullResponse, PushOutcome, Revision,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

/// The contract a remote sync transport must satisfy.
///
/// The orchestrator depends only on these two operations, so any
/// conforming transport — real network, IPC, or a test double — can sit
/// behind the engine and the core can be exercised with zero network
/// stack. Implementations apply the configured per-call timeout and map
/// its expiry to [`SyncError::Timeout`].
pub trait SyncTransport: Send + Sync {
    /// Pulls remote changes for one collection since a cursor.
    fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse>;

    /// Pushes a single pending action.
    ///
    /// `Ok` means the server judged the action (acknowledged or
    /// permanently rejected); `Err` means it may never have arrived and
    /// the push will be retried.
    fn push_one(&self, action: &PendingAction) -> SyncResult<PushOutcome>;
}

/// A mock transport with scripted responses.
///
/// Pull responses are queued per collection; when a queue is empty the
/// transport answers with an empty changeset at the request's cursor.
/// Push outcomes are consumed from a global script; when the script is
/// empty every push is acknowledged with the next server revision. All
/// pushed actions are recorded in arrival order so tests can assert
/// per-entity FIFO.
#[derive(Debug, Default)]
pub struct MockTransport {
    pull_script: Mutex<HashMap<EntityType, VecDeque<SyncResult<PullResponse>>>>,
    push_script: Mutex<VecDeque<SyncResult<PushOutcome>>>,
    pushed: Mutex<Vec<PendingAction>>,
    next_rev: AtomicU64,
}

impl MockTransport {
    /// Creates a new mock transport that acknowledges everything.
    pub fn new() -> Self {
        Self {
            pull_script: Mutex::new(HashMap::new()),
            push_script: Mutex::new(VecDeque::new()),
            pushed: Mutex::new(Vec::new()),
            next_rev: AtomicU64::new(1),
        }
    }

    /// Queues a pull response for a collection.
    pub fn enqueue_pull(&self, collection: EntityType, response: PullResponse) {
        self.pull_script
            .lock()
            .entry(collection)
            .or_default()
            .push_back(Ok(response));
    }

    /// Queues a pull failure for a collection.
    pub fn enqueue_pull_error(&self, collection: EntityType, error: SyncError) {
        self.pull_script
            .lock()
            .entry(collection)
            .or_default()
            .push_back(Err(error));
    }

    /// Queues the outcome of the next push.
    pub fn enqueue_push(&self, outcome: PushOutcome) {
        self.push_script.lock().push_back(Ok(outcome));
    }

    /// Queues a failure for the next push.
    pub fn enqueue_push_error(&self, error: SyncError) {
        self.push_script.lock().push_back(Err(error));
    }

    /// Returns every action pushed so far, in arrival order.
    pub fn pushed_actions(&self) -> Vec<PendingAction> {
        self.pushed.lock().clone()
    }

    /// Returns the number of pushes attempted so far.
    pub fn push_count(&self) -> usize {
        self.pushed.lock().len()
    }
}

impl SyncTransport for MockTransport {
    fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse> {
        let mut script = self.pull_script.lock();
        match script.get_mut(&request.collection).and_then(VecDeque::pop_front) {
            Some(scripted) => scripted,
            None => Ok(PullResponse::empty(request.cursor)),
        }
    }

    fn push_one(&self, action: &PendingAction) -> SyncResult<PushOutcome> {
        self.pushed.lock().push(action.clone());
        match self.push_script.lock().pop_front() {
            Some(scripted) => scripted,
            None => Ok(PushOutcome::Acknowledged {
                new_rev: Revision::new(self.next_rev.fetch_add(1, Ordering::SeqCst)),
            }),
        }
    }
}
