//! Local store trait definitions.

use crate::error::{StorageError, StoreResult};
use std::fmt;

/// Identifies a keyspace within the local store.
///
/// Application collections use their entity-type tag; the engine keeps
/// its own state in reserved `__sync/...` collections, versioned
/// independently of application data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Collection(String);

impl Collection {
    /// Creates a collection name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Collection {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Mutable view of the store inside a transaction.
///
/// Writes are staged and become visible to readers only when the
/// transaction body returns `Ok` and the commit applies. A body that
/// returns `Err` leaves the store untouched, so enqueue/apply/acknowledge
/// can never be observed half-done after a crash.
pub trait StoreTxn {
    /// Reads a value, observing writes staged earlier in this
    /// transaction.
    fn get(&self, collection: &Collection, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Stages a write.
    fn put(&mut self, collection: &Collection, key: &[u8], value: Vec<u8>) -> StoreResult<()>;

    /// Stages a removal.
    fn delete(&mut self, collection: &Collection, key: &[u8]) -> StoreResult<()>;

    /// Returns all live entries of a collection in key order, observing
    /// staged writes.
    fn scan(&self, collection: &Collection) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// A transactional record store consumed by the sync engine.
///
/// Implementations must provide serializable semantics per record:
/// concurrent transactions never interleave observably. The in-memory
/// implementation achieves this by serializing commits; an embedded
/// database would use its own transaction machinery.
pub trait LocalStore: Send + Sync {
    /// Runs `body` inside a transaction, committing iff it returns `Ok`.
    fn transaction(
        &self,
        body: &mut dyn FnMut(&mut dyn StoreTxn) -> StoreResult<()>,
    ) -> StoreResult<()>;

    /// Reads a committed value.
    fn get(&self, collection: &Collection, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Returns all committed entries of a collection in key order.
    fn scan(&self, collection: &Collection) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Returns keys of a collection whose last commit happened after the
    /// given store sequence, with their commit sequence.
    ///
    /// Used only for resolver diagnostics, never for correctness.
    fn changed_since(&self, collection: &Collection, since: u64) -> StoreResult<Vec<(Vec<u8>, u64)>>;

    /// Returns the store's latest commit sequence.
    fn latest_sequence(&self) -> StoreResult<u64>;
}

/// Convenience extension over [`LocalStore`].
pub trait LocalStoreExt: LocalStore {
    /// Runs a transaction body that returns a value.
    fn with_txn<R>(
        &self,
        body: impl FnOnce(&mut dyn StoreTxn) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut body = Some(body);
        let mut out: Option<R> = None;
        self.transaction(&mut |txn| {
            let body = body
                .take()
                .ok_or_else(|| StorageError::TransactionFailed("body re-entered".into()))?;
            out = Some(body(txn)?);
            Ok(())
        })?;
        out.ok_or_else(|| StorageError::TransactionFailed("body did not run".into()))
    }
}

impl<S: LocalStore + ?Sized> LocalStoreExt for S {}
