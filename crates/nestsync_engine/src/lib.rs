//! # NestSync Engine
//!
//! Offline-first sync engine for NestSync.
//!
//! This crate provides:
//! - Durable change queue with per-entity FIFO and a dead-letter set
//! - Deterministic three-way conflict resolution
//! - Pull-then-push sync orchestration as an explicit state machine
//! - Retry with bounded exponential backoff
//! - Transport and network-monitor abstractions with test doubles
//!
//! ## Architecture
//!
//! The engine implements a **pull-then-push** synchronization model:
//! 1. Pull remote changes first (the server is authoritative)
//! 2. Reconcile them into the local store through the conflict resolver
//! 3. Push queued local mutations to the server
//!
//! The engine consumes narrow Local Store, Transport, and Network
//! Monitor contracts, so the whole core runs against in-memory doubles
//! with zero network stack.
//!
//! ## Key Invariants
//!
//! - Pull always happens before push
//! - A cursor advances only after its apply transaction commits
//! - Actions for one entity push in enqueue order
//! - No pending action disappears except by acknowledgment or
//!   dead-letter transition

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cursor;
mod driver;
mod error;
mod events;
mod keyspace;
mod monitor;
mod orchestrator;
mod queue;
mod resolver;
mod transport;

pub use config::{BackoffConfig, SyncConfig};
pub use driver::SyncDriver;
pub use error::{SyncError, SyncResult};
pub use events::{CycleStats, EventBus, SyncEvent};
pub use monitor::{NetworkMonitor, ToggleMonitor};
pub use orchestrator::{
    CycleOutcome, SyncOrchestrator, SyncState, SyncStats, SyncStatus, SyncTrigger,
};
pub use queue::{ChangeQueue, RequeueOutcome};
pub use resolver::Resolver;
pub use transport::{MockTransport, SyncTransport};
