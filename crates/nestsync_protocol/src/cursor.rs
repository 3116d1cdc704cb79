//! Pull cursors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque token marking how far a collection's remote changes have been
/// pulled.
///
/// Tokens are issued by the remote service and only ever compared for
/// ordering by the engine, which enforces that a persisted cursor is
/// monotonically non-decreasing. `CursorToken::START` pulls from the
/// beginning of the feed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CursorToken(u64);

impl CursorToken {
    /// The beginning of a change feed.
    pub const START: CursorToken = CursorToken(0);

    /// Creates a token from its raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw token value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns true if this token marks the beginning of the feed.
    pub fn is_start(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cursor:{}", self.0)
    }
}
