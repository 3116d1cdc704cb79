//! Persisted pull cursors.

use crate::error::SyncResult;
use crate::keyspace;
use nestsync_protocol::{CursorToken, EntityType};
use nestsync_store::{LocalStore, LocalStoreExt, StoreTxn};
use std::sync::Arc;
use tracing::debug;

/// Durable per-collection pull cursors.
///
/// A cursor advances only forward and only after the corresponding
/// apply transaction has committed, so a restart resumes from the last
/// fully-applied batch instead of re-pulling history.
pub(crate) struct CursorStore<S> {
    store: Arc<S>,
}

impl<S: LocalStore> CursorStore<S> {
    pub(crate) fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns the persisted cursor for a collection, or the start of
    /// the feed.
    pub(crate) fn get(&self, collection: &EntityType) -> SyncResult<CursorToken> {
        let bytes = self
            .store
            .get(&keyspace::cursors(), collection.as_str().as_bytes())?;
        match bytes {
            Some(bytes) => Ok(keyspace::decode(&bytes)?),
            None => Ok(CursorToken::START),
        }
    }

    /// Persists `token` for a collection if it moves the cursor forward.
    ///
    /// Regressions are ignored: the persisted cursor is monotonically
    /// non-decreasing.
    pub(crate) fn advance(&self, collection: &EntityType, token: CursorToken) -> SyncResult<()> {
        self.store.with_txn(|txn| {
            let key = collection.as_str().as_bytes();
            let current = match txn.get(&keyspace::cursors(), key)? {
                Some(bytes) => keyspace::decode::<CursorToken>(&bytes)?,
                None => CursorToken::START,
            };
            if token <= current {
                if token < current {
                    debug!(
                        collection = collection.as_str(),
                        current = current.value(),
                        offered = token.value(),
                        "ignoring cursor regression"
                    );
                }
                return Ok(());
            }
            txn.put(&keyspace::cursors(), key, keyspace::encode(&token)?)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestsync_store::MemoryStore;

    fn cursor_store() -> CursorStore<MemoryStore> {
        CursorStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn starts_at_feed_start() {
        let cursors = cursor_store();
        let goals = EntityType::new("goal");
        assert_eq!(cursors.get(&goals).unwrap(), CursorToken::START);
    }

    #[test]
    fn advances_and_persists() {
        let cursors = cursor_store();
        let goals = EntityType::new("goal");

        cursors.advance(&goals, CursorToken::new(5)).unwrap();
        assert_eq!(cursors.get(&goals).unwrap(), CursorToken::new(5));

        cursors.advance(&goals, CursorToken::new(9)).unwrap();
        assert_eq!(cursors.get(&goals).unwrap(), CursorToken::new(9));
    }

    #[test]
    fn never_regresses() {
        let cursors = cursor_store();
        let goals = EntityType::new("goal");

        cursors.advance(&goals, CursorToken::new(9)).unwrap();
        cursors.advance(&goals, CursorToken::new(3)).unwrap();
        assert_eq!(cursors.get(&goals).unwrap(), CursorToken::new(9));
    }

    #[test]
    fn collections_are_independent() {
        let cursors = cursor_store();
        let goals = EntityType::new("goal");
        let documents = EntityType::new("document");

        cursors.advance(&goals, CursorToken::new(4)).unwrap();
        assert_eq!(cursors.get(&documents).unwrap(), CursorToken::START);
    }
}
