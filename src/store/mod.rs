//! Store Module
//!
//! The in-memory mapping from key to an ordered list of string values.
//!
//! ## Responsibilities
//! - Thread-safe get/set/delete
//! - Whole-value replacement on write (no partial field updates)
//! - Guard-based access for callers that must hold the lock across
//!   several steps (durable writes, snapshots)
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in a parking_lot RwLock:
//! - Ordered keys give a deterministic snapshot encoding
//! - Readers run concurrently, writers are exclusive

mod table;

pub use table::{Store, StoreReadGuard, StoreWriteGuard};

/// The full mapping held by a Store (and persisted by a snapshot)
pub type StoreMap = std::collections::BTreeMap<String, Vec<String>>;
