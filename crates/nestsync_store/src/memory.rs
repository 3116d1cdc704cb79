//! In-memory transactional store.

use crate::error::{StorageError, StoreResult};
use crate::store::{Collection, LocalStore, StoreTxn};
use parking_lot::Mutex;
use std::collections::BTreeMap;

type Key = (Collection, Vec<u8>);

#[derive(Debug, Default)]
struct Inner {
    data: BTreeMap<Key, Vec<u8>>,
    /// Commit sequence of the last write to each key (including
    /// deletions).
    seqs: BTreeMap<Key, u64>,
    next_seq: u64,
    fail_writes: bool,
}

/// An in-memory transactional store.
///
/// Suitable for unit tests, integration tests, and ephemeral engines.
/// Transactions stage their writes and commit atomically; the whole
/// store is serialized behind one lock, which gives the serializable
/// per-record semantics the engine contract requires without a separate
/// lock manager.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent transaction fail before running its body.
    ///
    /// Used by tests to exercise storage-failure paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Returns the number of live entries across all collections.
    pub fn len(&self) -> usize {
        self.inner.lock().data.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().data.is_empty()
    }
}

struct MemTxn<'a> {
    base: &'a BTreeMap<Key, Vec<u8>>,
    /// Staged writes; `None` stages a deletion.
    staged: BTreeMap<Key, Option<Vec<u8>>>,
}

impl StoreTxn for MemTxn<'_> {
    fn get(&self, collection: &Collection, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let full_key = (collection.clone(), key.to_vec());
        if let Some(staged) = self.staged.get(&full_key) {
            return Ok(staged.clone());
        }
        Ok(self.base.get(&full_key).cloned())
    }

    fn put(&mut self, collection: &Collection, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.staged
            .insert((collection.clone(), key.to_vec()), Some(value));
        Ok(())
    }

    fn delete(&mut self, collection: &Collection, key: &[u8]) -> StoreResult<()> {
        self.staged.insert((collection.clone(), key.to_vec()), None);
        Ok(())
    }

    fn scan(&self, collection: &Collection) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .base
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect();
        for ((c, k), staged) in &self.staged {
            if c != collection {
                continue;
            }
            match staged {
                Some(v) => {
                    merged.insert(k.clone(), v.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

impl LocalStore for MemoryStore {
    fn transaction(
        &self,
        body: &mut dyn FnMut(&mut dyn StoreTxn) -> StoreResult<()>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StorageError::backend("write failure injected"));
        }

        let staged = {
            let mut txn = MemTxn {
                base: &inner.data,
                staged: BTreeMap::new(),
            };
            body(&mut txn)?;
            txn.staged
        };

        if staged.is_empty() {
            return Ok(());
        }

        inner.next_seq += 1;
        let seq = inner.next_seq;
        for (key, staged_value) in staged {
            match staged_value {
                Some(value) => {
                    inner.data.insert(key.clone(), value);
                }
                None => {
                    inner.data.remove(&key);
                }
            }
            inner.seqs.insert(key, seq);
        }
        Ok(())
    }

    fn get(&self, collection: &Collection, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let inner = self.inner.lock();
        Ok(inner.data.get(&(collection.clone(), key.to_vec())).cloned())
    }

    fn scan(&self, collection: &Collection) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let inner = self.inner.lock();
        Ok(inner
            .data
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }

    fn changed_since(
        &self,
        collection: &Collection,
        since: u64,
    ) -> StoreResult<Vec<(Vec<u8>, u64)>> {
        let inner = self.inner.lock();
        let mut changed: Vec<(Vec<u8>, u64)> = inner
            .seqs
            .iter()
            .filter(|((c, _), seq)| c == collection && **seq > since)
            .map(|((_, k), seq)| (k.clone(), *seq))
            .collect();
        changed.sort_by_key(|(_, seq)| *seq);
        Ok(changed)
    }

    fn latest_sequence(&self) -> StoreResult<u64> {
        Ok(self.inner.lock().next_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStoreExt;

    fn goals() -> Collection {
        Collection::new("goal")
    }

    #[test]
    fn put_get_delete() {
        let store = MemoryStore::new();
        let c = goals();

        store
            .with_txn(|txn| txn.put(&c, b"a", vec![1, 2, 3]))
            .unwrap();
        assert_eq!(store.get(&c, b"a").unwrap(), Some(vec![1, 2, 3]));

        store.with_txn(|txn| txn.delete(&c, b"a")).unwrap();
        assert_eq!(store.get(&c, b"a").unwrap(), None);
    }

    #[test]
    fn failed_transaction_leaves_store_untouched() {
        let store = MemoryStore::new();
        let c = goals();
        store.with_txn(|txn| txn.put(&c, b"a", vec![1])).unwrap();

        let result: Result<(), _> = store.with_txn(|txn| {
            txn.put(&c, b"a", vec![9])?;
            txn.put(&c, b"b", vec![2])?;
            Err(StorageError::backend("boom"))
        });
        assert!(result.is_err());

        assert_eq!(store.get(&c, b"a").unwrap(), Some(vec![1]));
        assert_eq!(store.get(&c, b"b").unwrap(), None);
    }

    #[test]
    fn txn_reads_observe_staged_writes() {
        let store = MemoryStore::new();
        let c = goals();

        store
            .with_txn(|txn| {
                txn.put(&c, b"a", vec![7])?;
                assert_eq!(txn.get(&c, b"a")?, Some(vec![7]));
                txn.delete(&c, b"a")?;
                assert_eq!(txn.get(&c, b"a")?, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn scan_is_key_ordered_and_merged() {
        let store = MemoryStore::new();
        let c = goals();
        store
            .with_txn(|txn| {
                txn.put(&c, b"b", vec![2])?;
                txn.put(&c, b"a", vec![1])?;
                Ok(())
            })
            .unwrap();

        store
            .with_txn(|txn| {
                txn.put(&c, b"c", vec![3])?;
                let entries = txn.scan(&c)?;
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.clone()).collect();
                assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn changed_since_tracks_commits() {
        let store = MemoryStore::new();
        let c = goals();

        store.with_txn(|txn| txn.put(&c, b"a", vec![1])).unwrap();
        let mark = store.latest_sequence().unwrap();
        store.with_txn(|txn| txn.put(&c, b"b", vec![2])).unwrap();
        store.with_txn(|txn| txn.delete(&c, b"a")).unwrap();

        let changed = store.changed_since(&c, mark).unwrap();
        let keys: Vec<_> = changed.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"a".to_vec()]);
    }

    #[test]
    fn injected_write_failure() {
        let store = MemoryStore::new();
        let c = goals();
        store.set_fail_writes(true);
        let result = store.with_txn(|txn| txn.put(&c, b"a", vec![1]));
        assert!(matches!(result, Err(StorageError::Backend(_))));

        store.set_fail_writes(false);
        store.with_txn(|txn| txn.put(&c, b"a", vec![1])).unwrap();
    }
}
