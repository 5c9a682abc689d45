//! # CachedKV
//!
//! An in-memory key-value store with:
//! - An ordered list of strings per key
//! - A line-oriented TCP protocol
//! - Write-Ahead Logging (WAL) for durability
//! - Periodic compacting snapshots that retire the WAL
//! - Crash recovery from the last snapshot plus the WAL
//! - Topic publish/subscribe
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (one thread per connection)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Engine::execute                             │
//! │         (exhaustive dispatch, durability gate)               │
//! └──────┬──────────────┬──────────────────────────┬────────────┘
//!        │              │                          │
//!        ▼              ▼                          ▼
//!  ┌───────────┐  ┌─────────────┐          ┌─────────────┐
//!  │    WAL    │  │    Store    │          │   PubSub    │
//!  │ (append)  │  │  (RwLock)   │          │  (bounded)  │
//!  └─────┬─────┘  └──────┬──────┘          └─────────────┘
//!        │ truncate      │ serialize
//!        └───────┬───────┘
//!                ▼
//!        ┌───────────────┐
//!        │   Snapshot    │
//!        │ (tmp→rename)  │
//!        └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod protocol;
pub mod wal;
pub mod snapshot;
pub mod recovery;
pub mod pubsub;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CacheError, Result};
pub use config::Config;
pub use engine::{Engine, Reply, WalMode};
pub use store::Store;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CachedKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
