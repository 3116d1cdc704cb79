//! # NestSync Protocol
//!
//! Protocol types and CBOR codecs for NestSync.
//!
//! This crate defines the data model shared between the sync engine, the
//! local store, and any conforming remote transport:
//! - Versioned records with field maps and tombstones
//! - Pending actions (the durable change queue entry)
//! - Opaque pull cursors
//! - Pull/push wire messages
//! - Conflict resolutions and audit records
//!
//! All types serialize to CBOR. Payloads on the wire use the same
//! representation as payloads at rest, so a transport never needs to
//! re-encode what the engine hands it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod codec;
mod conflict;
mod cursor;
mod messages;
mod record;

pub use action::{ActionId, ActionKind, PendingAction};
pub use codec::{from_cbor, to_cbor, CodecError, CodecResult};
pub use conflict::{ConflictRecord, MergePolicy, Resolution, ResolutionKind};
pub use cursor::CursorToken;
pub use messages::{PullRequest, PullResponse, PushOutcome};
pub use record::{EntityType, FieldValue, Record, RecordId, Revision, Timestamp};
