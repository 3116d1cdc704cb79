//! Pending actions: durable change-queue entries.

use crate::record::{EntityType, Record, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(Uuid);

impl ActionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the identifier as raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of a pending action.
///
/// A closed tagged union: each kind carries its statically defined
/// payload and nothing else. Unknown kinds cannot be constructed and are
/// rejected when decoding persisted or transported bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    /// A record created locally. Carries the full snapshot taken at
    /// enqueue time.
    Create {
        /// Snapshot of the created record.
        record: Record,
    },
    /// A record updated locally. Carries the full post-update snapshot.
    Update {
        /// Snapshot of the updated record.
        record: Record,
    },
    /// A record soft-deleted locally.
    Delete {
        /// Collection of the deleted record.
        entity_type: EntityType,
        /// Identifier of the deleted record.
        id: RecordId,
        /// When the deletion was applied locally.
        deleted_at: Timestamp,
    },
}

impl ActionKind {
    /// Returns the collection this action targets.
    pub fn entity_type(&self) -> &EntityType {
        match self {
            ActionKind::Create { record } | ActionKind::Update { record } => &record.entity_type,
            ActionKind::Delete { entity_type, .. } => entity_type,
        }
    }

    /// Returns the record this action targets.
    pub fn record_id(&self) -> RecordId {
        match self {
            ActionKind::Create { record } | ActionKind::Update { record } => record.id,
            ActionKind::Delete { id, .. } => *id,
        }
    }

    /// Returns a short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Create { .. } => "create",
            ActionKind::Update { .. } => "update",
            ActionKind::Delete { .. } => "delete",
        }
    }
}

/// A durable entry in the change queue.
///
/// Pending actions are created on every local mutation and removed only
/// when the transport acknowledges them, or moved to the dead-letter set
/// once `retry_count` reaches `max_retries`. They are never silently
/// dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Action identifier.
    pub id: ActionId,
    /// Queue sequence number. Assigned at enqueue; actions for the same
    /// entity push in `seq` order.
    pub seq: u64,
    /// What this action does.
    pub kind: ActionKind,
    /// When the action was enqueued.
    pub enqueued_at: Timestamp,
    /// Number of failed push attempts so far.
    pub retry_count: u32,
    /// Retry budget before the action is dead-lettered.
    pub max_retries: u32,
    /// Earliest time the action is eligible for another push attempt.
    pub next_eligible_at: Timestamp,
}

impl PendingAction {
    /// Creates a new pending action with a zero retry count.
    ///
    /// The queue assigns `seq` when the action is persisted.
    pub fn new(kind: ActionKind, now: Timestamp, max_retries: u32) -> Self {
        Self {
            id: ActionId::new(),
            seq: 0,
            kind,
            enqueued_at: now,
            retry_count: 0,
            max_retries,
            next_eligible_at: now,
        }
    }

    /// Returns the collection this action targets.
    pub fn entity_type(&self) -> &EntityType {
        self.kind.entity_type()
    }

    /// Returns the record this action targets.
    pub fn record_id(&self) -> RecordId {
        self.kind.record_id()
    }

    /// Returns true if the action may be pushed at `now`.
    pub fn is_eligible(&self, now: Timestamp) -> bool {
        self.next_eligible_at <= now
    }

    /// Records a failed attempt and schedules the next one.
    pub fn record_retry(&mut self, next_eligible_at: Timestamp) {
        self.retry_count += 1;
        self.next_eligible_at = next_eligible_at;
    }

    /// Returns true once the retry budget is spent.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}
