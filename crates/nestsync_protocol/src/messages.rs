//! Wire messages exchanged with a remote sync transport.

use crate::cursor::CursorToken;
use crate::record::{EntityType, Record, Revision};
use serde::{Deserialize, Serialize};

/// Request for remote changes to one collection since a cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Collection whose feed is being pulled.
    pub collection: EntityType,
    /// Last token this client successfully applied.
    pub cursor: CursorToken,
    /// Maximum number of changes to return.
    pub limit: u32,
}

impl PullRequest {
    /// Creates a new pull request.
    pub fn new(collection: EntityType, cursor: CursorToken, limit: u32) -> Self {
        Self {
            collection,
            cursor,
            limit,
        }
    }
}

/// Remote changes for one collection plus the cursor to resume from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Changed records, oldest first. Tombstones arrive as records with
    /// the deleted flag set.
    pub changes: Vec<Record>,
    /// Token to persist once every change in this batch is applied.
    pub new_cursor: CursorToken,
    /// True if more changes are available past `new_cursor`.
    pub has_more: bool,
}

impl PullResponse {
    /// Creates a new pull response.
    pub fn new(changes: Vec<Record>, new_cursor: CursorToken, has_more: bool) -> Self {
        Self {
            changes,
            new_cursor,
            has_more,
        }
    }

    /// An empty response leaving the cursor where it was.
    pub fn empty(cursor: CursorToken) -> Self {
        Self::new(Vec::new(), cursor, false)
    }
}

/// Outcome of pushing a single pending action.
///
/// Transport failures (timeouts, refused connections) are not outcomes;
/// they surface as errors and are retried. An outcome means the server
/// received and judged the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PushOutcome {
    /// The server applied the action.
    Acknowledged {
        /// Revision assigned to the record by the server.
        new_rev: Revision,
    },
    /// The server permanently rejected the action. Retrying cannot
    /// succeed; the action belongs in the dead-letter set.
    Rejected {
        /// Human-readable rejection reason.
        reason: String,
    },
}

impl PushOutcome {
    /// Returns true if the action was applied.
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, PushOutcome::Acknowledged { .. })
    }
}
