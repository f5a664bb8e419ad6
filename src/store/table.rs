//! Store implementation
//!
//! HashMap-based store with RwLock for concurrency.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{KvError, Result};
use crate::tlog::{Event, EventType, PersistReceipt, TransactionLogger};

/// In-memory key-value store fronting a transaction logger
///
/// ## Concurrency:
/// - `get` takes the read lock; any number may run together
/// - `put`/`delete`/`apply` take the write lock, exclusive of everything
/// - The lock covers only the map mutation. The logger is notified after
///   release, so a reader can see a value before its event is enqueued.
pub struct Store {
    data: RwLock<HashMap<String, String>>,
    logger: Arc<TransactionLogger>,
}

impl Store {
    /// Create an empty store that logs mutations to `logger`
    pub fn new(logger: Arc<TransactionLogger>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            logger,
        }
    }

    // =========================================================================
    // Client Operations
    // =========================================================================

    /// Insert or overwrite a key, then enqueue a PUT event
    ///
    /// Returns once the event is queued. Await the receipt to learn whether
    /// it reached durable storage.
    pub async fn put(&self, key: &str, value: &str) -> Result<PersistReceipt> {
        self.check_writable(key)?;

        {
            let mut data = self.data.write();
            data.insert(key.to_string(), value.to_string());
        }

        self.logger.write_put(key, value).await
    }

    /// Get the value for a key (read lock)
    pub fn get(&self, key: &str) -> Result<String> {
        let data = self.data.read();
        data.get(key).cloned().ok_or(KvError::KeyNotFound)
    }

    /// Remove a key if present, then enqueue a DELETE event
    ///
    /// Deleting an absent key is not an error and is still logged.
    pub async fn delete(&self, key: &str) -> Result<PersistReceipt> {
        self.check_writable(key)?;

        {
            let mut data = self.data.write();
            data.remove(key);
        }

        self.logger.write_delete(key).await
    }

    /// Rejects writes the logger could never record
    fn check_writable(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(KvError::InvalidKey);
        }
        if !self.logger.is_running() {
            return Err(KvError::LoggerNotRunning);
        }
        Ok(())
    }

    // =========================================================================
    // Replay
    // =========================================================================

    /// Apply a replayed event without logging it
    pub fn apply(&self, event: &Event) {
        let mut data = self.data.write();
        match event.event_type {
            EventType::Put => {
                data.insert(event.key.clone(), event.value.clone());
            }
            EventType::Delete => {
                data.remove(&event.key);
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.data.read().clone()
    }

    pub fn logger(&self) -> &Arc<TransactionLogger> {
        &self.logger
    }
}
