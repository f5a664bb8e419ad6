//! Transaction Logger
//!
//! Owns a [`LogBackend`] and drives the asynchronous write pipeline.
//!
//! ## Lifecycle
//! ```text
//! open/new ──▶ read_events() (replay) ──▶ run() ──▶ write_put / write_delete
//! ```
//!
//! Writes issued before `run()` are rejected. Once running, a single worker
//! task drains a bounded queue, so events reach the medium in exactly the
//! order they were enqueued no matter how many callers are writing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::{mpsc, oneshot, Mutex};

use crate::config::{BackendConfig, Config};
use crate::error::{KvError, Result};

use super::{Event, FileBackend, LogBackend, PostgresBackend, ReplaySink};

type SharedBackend = Arc<Mutex<Box<dyn LogBackend>>>;

/// An event waiting in the queue plus the channel used to report its fate
struct Pending {
    event: Event,
    ack: oneshot::Sender<Result<u64>>,
}

/// Handle for one enqueued write
///
/// Dropping it is fine; the write still happens. Awaiting [`wait`] yields the
/// assigned sequence once the event is durable, or the persistence failure.
///
/// [`wait`]: PersistReceipt::wait
#[derive(Debug)]
#[must_use = "a receipt does not wait for durability unless awaited"]
pub struct PersistReceipt {
    rx: oneshot::Receiver<Result<u64>>,
}

impl PersistReceipt {
    /// Wait until the event has been persisted (or has failed to be)
    pub async fn wait(self) -> Result<u64> {
        self.rx.await.map_err(|_| KvError::LoggerClosed)?
    }
}

/// Asynchronous, ordered transaction logger over a pluggable backend
pub struct TransactionLogger {
    /// Shared by the replay task and the persistence worker, never at once
    backend: SharedBackend,

    /// Backend name, cached for logging without taking the lock
    backend_name: &'static str,

    queue_capacity: usize,

    /// Producer side of the persistence queue; set exactly once by `run()`
    events: OnceLock<mpsc::Sender<Pending>>,

    errors_tx: mpsc::Sender<KvError>,
    errors_rx: parking_lot::Mutex<Option<mpsc::Receiver<KvError>>>,

    /// Highest sequence replayed or persisted
    last_sequence: Arc<AtomicU64>,
}

impl TransactionLogger {
    /// Open the backend selected by `config` and wrap it in a logger
    ///
    /// Fails if the durable medium cannot be reached, verified or created.
    pub async fn open(config: &Config) -> Result<Self> {
        let backend: Box<dyn LogBackend> = match &config.backend {
            BackendConfig::File { path } => Box::new(FileBackend::open(path).await?),
            BackendConfig::Postgres(params) => Box::new(PostgresBackend::connect(params).await?),
        };

        Ok(Self::new(backend, config.queue_capacity, config.error_capacity))
    }

    /// Wrap an already-opened backend
    pub fn new(backend: Box<dyn LogBackend>, queue_capacity: usize, error_capacity: usize) -> Self {
        let (errors_tx, errors_rx) = mpsc::channel(error_capacity.max(1));
        let backend_name = backend.name();

        tracing::info!(
            backend = backend_name,
            queue_capacity,
            "Transaction logger created"
        );

        Self {
            backend: Arc::new(Mutex::new(backend)),
            backend_name,
            queue_capacity: queue_capacity.max(1),
            events: OnceLock::new(),
            errors_tx,
            errors_rx: parking_lot::Mutex::new(Some(errors_rx)),
            last_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    // =========================================================================
    // Producer API
    // =========================================================================

    /// Enqueue a PUT event for persistence
    ///
    /// Suspends only while the queue is full.
    pub async fn write_put(&self, key: &str, value: &str) -> Result<PersistReceipt> {
        self.enqueue(Event::put(key, value)).await
    }

    /// Enqueue a DELETE event for persistence
    ///
    /// Suspends only while the queue is full.
    pub async fn write_delete(&self, key: &str) -> Result<PersistReceipt> {
        self.enqueue(Event::delete(key)).await
    }

    async fn enqueue(&self, event: Event) -> Result<PersistReceipt> {
        let queue = self.events.get().ok_or(KvError::LoggerNotRunning)?;
        let (ack, rx) = oneshot::channel();

        queue
            .send(Pending { event, ack })
            .await
            .map_err(|_| KvError::LoggerClosed)?;

        Ok(PersistReceipt { rx })
    }

    // =========================================================================
    // Live Mode
    // =========================================================================

    /// Start the persistence worker
    ///
    /// Must be called once, after replay. Requires a tokio runtime.
    pub fn run(&self) -> Result<()> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.events.set(tx).map_err(|_| KvError::AlreadyRunning)?;

        tokio::spawn(persist_loop(
            Arc::clone(&self.backend),
            rx,
            self.errors_tx.clone(),
            Arc::clone(&self.last_sequence),
        ));

        tracing::info!(backend = self.backend_name, "Transaction logger running");
        Ok(())
    }

    /// Whether `run()` has been called
    pub fn is_running(&self) -> bool {
        self.events.get().is_some()
    }

    /// Take the stream of persistence failures
    ///
    /// Returns `None` after the first call. The worker waits for this stream
    /// to be drained once its buffer is full.
    pub fn errors(&self) -> Option<mpsc::Receiver<KvError>> {
        self.errors_rx.lock().take()
    }

    // =========================================================================
    // Replay
    // =========================================================================

    /// Start a replay pass over the whole medium
    ///
    /// Events arrive in ascending sequence order on the first receiver. At
    /// most one error arrives on the second. Both close when the pass ends.
    pub fn read_events(&self) -> (mpsc::Receiver<Event>, mpsc::Receiver<KvError>) {
        let (event_tx, event_rx) = mpsc::channel(self.queue_capacity);
        let (error_tx, error_rx) = mpsc::channel(1);

        let backend = Arc::clone(&self.backend);
        let last_sequence = Arc::clone(&self.last_sequence);

        tokio::spawn(async move {
            let mut sink = ReplaySink::new(event_tx, last_sequence);
            let mut backend = backend.lock().await;

            if let Err(e) = backend.replay(&mut sink).await {
                tracing::error!(backend = backend.name(), error = %e, "Replay pass failed");
                let _ = error_tx.send(e).await;
            }
        });

        (event_rx, error_rx)
    }

    /// Highest sequence replayed or persisted so far (0 if none)
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }
}

/// Persistence worker: one event at a time, in queue order
async fn persist_loop(
    backend: SharedBackend,
    mut queue: mpsc::Receiver<Pending>,
    errors: mpsc::Sender<KvError>,
    last_sequence: Arc<AtomicU64>,
) {
    while let Some(Pending { event, ack }) = queue.recv().await {
        let result = {
            let mut backend = backend.lock().await;
            backend.append(&event).await
        };

        match result {
            Ok(sequence) => {
                last_sequence.fetch_max(sequence, Ordering::SeqCst);
                tracing::debug!(
                    sequence,
                    event_type = ?event.event_type,
                    key = %event.key,
                    "Event persisted"
                );
                let _ = ack.send(Ok(sequence));
            }
            Err(e) => {
                // Dropped, not retried. The caller learns about it only here.
                tracing::warn!(key = %event.key, error = %e, "Failed to persist event");
                let _ = ack.send(Err(KvError::Persist(e.to_string())));

                if errors.send(e).await.is_err() {
                    tracing::error!("Persistence error stream closed; error discarded");
                }
            }
        }
    }

    tracing::debug!("Persistence queue closed, worker exiting");
}
