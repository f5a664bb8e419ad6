//! Transaction Log Module
//!
//! Durable, append-only record of every mutation applied to the store.
//!
//! ## Responsibilities
//! - Accept events asynchronously and persist them in enqueue order
//! - Assign each persisted event a monotonically increasing sequence
//! - Replay every persisted event in sequence order at startup
//! - Surface persistence failures out of band
//!
//! ## Backends
//! ```text
//!                 ┌────────────────────┐
//!   write_put ───▶│ TransactionLogger  │───▶ errors()
//!   write_delete ▶│  (bounded queue,   │
//!                 │   single worker)   │───▶ read_events()
//!                 └─────────┬──────────┘
//!                           │ dyn LogBackend
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!       ┌─────────────┐          ┌───────────────┐
//!       │ FileBackend │          │PostgresBackend│
//!       │ (one line / │          │ (transactions │
//!       │   event)    │          │    table)     │
//!       └─────────────┘          └───────────────┘
//! ```

mod event;
mod file;
mod line;
mod logger;
mod postgres;

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{KvError, Result};

pub use event::{Event, EventType};
pub use file::FileBackend;
pub use line::{decode_line, encode_line};
pub use logger::{PersistReceipt, TransactionLogger};
pub use postgres::PostgresBackend;

/// A durable medium the transaction log can be written to and replayed from
///
/// The logger never calls `append` and `replay` concurrently on the same
/// backend.
#[async_trait]
pub trait LogBackend: Send + 'static {
    /// Persist one event and return the sequence assigned to it
    async fn append(&mut self, event: &Event) -> Result<u64>;

    /// Push every persisted event into `sink`, oldest first
    ///
    /// Stops early without error when the sink reports the consumer is gone.
    async fn replay(&mut self, sink: &mut ReplaySink) -> Result<()>;

    /// Short backend name for logging
    fn name(&self) -> &'static str;
}

/// Receiving side handed to [`LogBackend::replay`]
///
/// Enforces strictly ascending sequences (gaps allowed) and records the
/// highest sequence seen.
pub struct ReplaySink {
    tx: mpsc::Sender<Event>,
    previous: u64,
    last_sequence: Arc<AtomicU64>,
}

impl ReplaySink {
    pub(crate) fn new(tx: mpsc::Sender<Event>, last_sequence: Arc<AtomicU64>) -> Self {
        Self {
            tx,
            previous: 0,
            last_sequence,
        }
    }

    /// Forward one event
    ///
    /// Returns `Ok(false)` once the consumer has dropped its receiver.
    pub async fn push(&mut self, event: Event) -> Result<bool> {
        if event.sequence <= self.previous {
            return Err(KvError::OutOfOrder {
                previous: self.previous,
                found: event.sequence,
            });
        }
        self.previous = event.sequence;
        self.last_sequence.fetch_max(event.sequence, Ordering::SeqCst);

        Ok(self.tx.send(event).await.is_ok())
    }
}
