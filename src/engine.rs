//! Engine Module
//!
//! Owns the store and the transaction logger for one process.
//!
//! ## Responsibilities
//! - Open the configured durable medium
//! - Rebuild the store through the replay driver
//! - Hand the live store to the HTTP layer

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::replay::{ReplayDriver, ReplaySummary};
use crate::store::Store;
use crate::tlog::{PersistReceipt, TransactionLogger};

/// A replayed, live store and its logger
///
/// Cloning is cheap; clones share the same store and logger.
#[derive(Clone)]
pub struct Engine {
    store: Arc<Store>,
    logger: Arc<TransactionLogger>,
    summary: ReplaySummary,
}

impl Engine {
    /// Open the durable medium from `config`, replay it and go live
    ///
    /// On startup:
    /// 1. Open/verify the backend (fatal on failure)
    /// 2. Replay every persisted event into a fresh store (fatal on failure)
    /// 3. Start the persistence worker and the error drain
    pub async fn open(config: &Config) -> Result<Self> {
        let logger = TransactionLogger::open(config).await?;
        Self::start(logger).await
    }

    /// Replay and go live over an already-constructed logger
    pub async fn start(logger: TransactionLogger) -> Result<Self> {
        let logger = Arc::new(logger);
        let store = Arc::new(Store::new(Arc::clone(&logger)));

        let mut driver = ReplayDriver::new(Arc::clone(&store), Arc::clone(&logger));
        let summary = driver.start().await?;

        Ok(Self {
            store,
            logger,
            summary,
        })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub async fn put(&self, key: &str, value: &str) -> Result<PersistReceipt> {
        self.store.put(key, value).await
    }

    pub fn get(&self, key: &str) -> Result<String> {
        self.store.get(key)
    }

    pub async fn delete(&self, key: &str) -> Result<PersistReceipt> {
        self.store.delete(key).await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn logger(&self) -> &Arc<TransactionLogger> {
        &self.logger
    }

    /// What the startup replay found
    pub fn replay_summary(&self) -> ReplaySummary {
        self.summary
    }
}
