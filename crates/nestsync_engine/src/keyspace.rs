//! Reserved store collections and persistence glue.
//!
//! Engine state lives in `__sync/...` collections, versioned
//! independently of application schemas so engine upgrades never force
//! an application data migration.

use nestsync_protocol::{from_cbor, to_cbor};
use nestsync_store::{Collection, StorageError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Queued pending actions, keyed by big-endian sequence number.
pub(crate) fn actions() -> Collection {
    Collection::new("__sync/actions")
}

/// Dead-lettered actions, keyed by action id.
pub(crate) fn dead_letter() -> Collection {
    Collection::new("__sync/dead_letter")
}

/// Engine counters (queue sequence), keyed by name.
pub(crate) fn meta() -> Collection {
    Collection::new("__sync/meta")
}

/// Per-collection pull cursors, keyed by entity-type tag.
pub(crate) fn cursors() -> Collection {
    Collection::new("__sync/cursors")
}

/// Last server-acknowledged version per record, keyed by record id.
pub(crate) fn shadows() -> Collection {
    Collection::new("__sync/shadows")
}

/// Conflict audit records, keyed by their stable audit key.
pub(crate) fn conflicts() -> Collection {
    Collection::new("__sync/conflicts")
}

/// Encodes a value for persistence inside a store transaction.
pub(crate) fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    to_cbor(value).map_err(|e| StorageError::corrupted(e.to_string()))
}

/// Decodes a persisted value inside a store transaction.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    from_cbor(bytes).map_err(|e| StorageError::corrupted(e.to_string()))
}
