//! Error types for kvlog
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for kvlog operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("No such key")]
    KeyNotFound,

    #[error("Invalid key: keys must be non-empty")]
    InvalidKey,

    // -------------------------------------------------------------------------
    // Transaction Log Errors
    // -------------------------------------------------------------------------
    #[error("Transaction log corrupted at line {line}: {reason}")]
    Corrupt { line: u64, reason: String },

    #[error("Transaction log out of order: sequence {found} follows {previous}")]
    OutOfOrder { previous: u64, found: u64 },

    #[error("Invalid event type: {0}")]
    InvalidEventType(u8),

    #[error("Transaction log persist failed: {0}")]
    Persist(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Transaction logger is not running")]
    LoggerNotRunning,

    #[error("Transaction logger is already running")]
    AlreadyRunning,

    #[error("Transaction logger queue closed")]
    LoggerClosed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
