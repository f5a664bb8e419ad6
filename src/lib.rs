//! # kvlog
//!
//! An HTTP key-value store whose state is rebuilt from a transaction log:
//! - Append-only transaction log with file and Postgres backends
//! - Asynchronous, strictly ordered persistence through a single worker
//! - Ordered replay at startup before any traffic is served
//! - Many-reader/single-writer in-memory store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Server                            │
//! │              PUT / GET / DELETE /v1/key/{key}               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                │
//! │                (RwLock<HashMap>, then log)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ write_put / write_delete
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 TransactionLogger                           │
//! │          (bounded queue ─▶ single worker)                   │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │   FileBackend   │                │ PostgresBackend │
//!   └─────────────────┘                └─────────────────┘
//! ```
//!
//! At startup the [`replay::ReplayDriver`] reads the whole log back into the
//! store, then starts the logger's worker.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod tlog;
pub mod store;
pub mod replay;
pub mod network;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
