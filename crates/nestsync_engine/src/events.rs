//! Events emitted by the sync engine.

use nestsync_protocol::{ConflictRecord, PendingAction};
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

/// Counters for one completed sync cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    /// Remote changes applied during the pull phase.
    pub pulled: u64,
    /// Pending actions acknowledged during the push phase.
    pub pushed: u64,
    /// Conflicts detected while applying.
    pub conflicts: u64,
    /// Actions moved to the dead-letter set.
    pub dead_lettered: u64,
    /// Wall-clock duration of the cycle.
    pub duration: Duration,
}

/// An event from the sync engine, consumed by UI and telemetry
/// collaborators.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A sync cycle began.
    CycleStarted,
    /// A sync cycle finished successfully.
    CycleCompleted(CycleStats),
    /// Divergent local and remote versions were reconciled.
    ConflictDetected(ConflictRecord),
    /// An action exhausted its retry budget or was permanently rejected
    /// and needs manual resolution.
    ActionDeadLettered(PendingAction),
}

/// Distributes sync events to subscribers.
///
/// Subscribers receive every event emitted after they subscribe;
/// disconnected receivers are pruned on the next emit.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Sender<SyncEvent>>>,
}

impl EventBus {
    /// Creates a new event bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> Receiver<SyncEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: SyncEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
