//! Versioned application records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Tag identifying an entity collection (e.g. `goal`, `profile`,
/// `document`).
///
/// The engine treats the tag as opaque; the application decides which
/// collections exist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    /// Creates an entity type tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Unique identifier of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the identifier as raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque marker of the last server revision a record reflects.
///
/// Revisions are assigned by the remote service and only ever compared
/// for ordering; `Revision::NONE` means the record has never been synced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Marker for a record that has never been acknowledged remotely.
    pub const NONE: Revision = Revision(0);

    /// Creates a revision from its raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns true if this record has never been synced.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw revision value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Wall-clock timestamp in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Returns the current wall-clock timestamp.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(millis)
    }

    /// Creates a timestamp from raw milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the raw millisecond value.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns this timestamp advanced by `millis`.
    pub fn plus_millis(&self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Returns the later of `self` and `other` advanced past `other`.
    ///
    /// Used to stamp mutations so `modified_at` strictly increases even
    /// when the wall clock stalls or runs backwards.
    pub fn bumped_past(&self, other: Timestamp) -> Self {
        Self(self.0.max(other.0.saturating_add(1)))
    }
}

/// A single field value inside a record.
///
/// A closed union: applications pick from these shapes and nothing else,
/// so every conforming transport and store can handle every payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// UTF-8 text.
    Text(String),
    /// Signed integer (amounts are stored in minor units).
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// Raw bytes (document blobs reference these).
    Bytes(Vec<u8>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// A versioned application entity.
///
/// Records are owned by the local store and mutated either by user
/// actions or by the sync engine applying remote changes. Deletion is a
/// tombstone (`deleted = true`), never a missing row, so a delete can
/// propagate and cannot be resurrected by a concurrent update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier.
    pub id: RecordId,
    /// Entity collection this record belongs to.
    pub entity_type: EntityType,
    /// Field map.
    pub fields: BTreeMap<String, FieldValue>,
    /// Last mutation timestamp. Strictly increases on every applied
    /// mutation.
    pub modified_at: Timestamp,
    /// Last server revision this record reflects.
    pub remote_rev: Revision,
    /// Tombstone flag.
    pub deleted: bool,
}

impl Record {
    /// Creates a new, never-synced record.
    pub fn new(entity_type: EntityType, fields: BTreeMap<String, FieldValue>) -> Self {
        Self {
            id: RecordId::new(),
            entity_type,
            fields,
            modified_at: Timestamp::now(),
            remote_rev: Revision::NONE,
            deleted: false,
        }
    }

    /// Sets a field value, returning the record for chaining.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Returns a field value, if present.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns true if this record is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.deleted
    }

    /// Converts this record into its tombstone, clearing the fields.
    pub fn into_tombstone(mut self, deleted_at: Timestamp) -> Self {
        self.deleted = true;
        self.fields.clear();
        self.modified_at = deleted_at;
        self
    }
}
