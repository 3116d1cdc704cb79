//! # NestSync Store
//!
//! The Local Store contract consumed by the NestSync engine, plus an
//! in-memory transactional implementation.
//!
//! The engine never touches storage-engine internals (indexing, paging,
//! files); it only needs transactional get/put/delete over opaque byte
//! values, keyed by collection + key, and a changed-since query for
//! diagnostics. Any store meeting that contract — an embedded database,
//! an FFI bridge, or [`MemoryStore`] — can host the engine.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod store;

pub use error::{StorageError, StoreResult};
pub use memory::MemoryStore;
pub use store::{Collection, LocalStore, LocalStoreExt, StoreTxn};
