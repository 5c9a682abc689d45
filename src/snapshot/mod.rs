//! Snapshot Module
//!
//! Compacting checkpoints of the whole Store.
//!
//! ## Responsibilities
//! - Serialize the Store under a consistent lock
//! - Commit atomically (write temp file, fsync, rename over `data.dat`)
//! - Empty the WAL only after the rename committed
//! - Drive snapshots on a fixed interval
//!
//! ## File Format
//! ```text
//! ┌───────────┬─────────────┬──────────────────┬───────────┬─────────────┐
//! │ Magic (4) │ Version (2) │ Payload Len (8)  │ CRC32 (4) │   Payload   │
//! └───────────┴─────────────┴──────────────────┴───────────┴─────────────┘
//! ```
//! The payload is the bincode encoding of the key → values map.
//!
//! ## Crash points
//! - before the rename: the old snapshot and the full WAL are intact
//! - after the rename, before truncation: the WAL only holds records
//!   already folded into the new snapshot; replaying them is harmless
//! - after truncation: the snapshot alone is the state

mod format;
mod manager;
mod scheduler;

pub use format::{decode_snapshot, encode_snapshot, HEADER_SIZE, MAGIC, VERSION};
pub use manager::{SnapshotManager, SnapshotStats};
pub use scheduler::SnapshotScheduler;
