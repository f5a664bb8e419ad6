//! Replay Driver
//!
//! Rebuilds the store from the transaction log at startup, then switches the
//! logger into live mode.
//!
//! ## States
//! ```text
//! Idle ──▶ Replaying ──┬──▶ Live
//!                      └──▶ Fatal
//! ```
//!
//! Replay stops at the first error: a log that cannot be read completely is
//! never served from.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{KvError, Result};
use crate::store::Store;
use crate::tlog::{EventType, TransactionLogger};

/// Where the driver is in the startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayPhase {
    Idle,
    Replaying,
    Live,
    Fatal,
}

/// Result of a replay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Number of events applied
    pub events_replayed: u64,

    pub puts: u64,

    pub deletes: u64,

    /// Highest sequence seen in the log (0 for an empty log)
    pub last_sequence: u64,
}

/// Drives one store/logger pair from `Idle` to `Live`
pub struct ReplayDriver {
    store: Arc<Store>,
    logger: Arc<TransactionLogger>,
    phase: ReplayPhase,
}

impl ReplayDriver {
    pub fn new(store: Arc<Store>, logger: Arc<TransactionLogger>) -> Self {
        Self {
            store,
            logger,
            phase: ReplayPhase::Idle,
        }
    }

    pub fn phase(&self) -> ReplayPhase {
        self.phase
    }

    /// Replay, then go live
    ///
    /// On error the driver ends in `Fatal` and the logger is left idle.
    pub async fn start(&mut self) -> Result<ReplaySummary> {
        let summary = match self.replay().await {
            Ok(summary) => summary,
            Err(e) => {
                self.phase = ReplayPhase::Fatal;
                tracing::error!(error = %e, "Transaction log replay failed");
                return Err(e);
            }
        };

        if let Err(e) = self.go_live() {
            self.phase = ReplayPhase::Fatal;
            return Err(e);
        }

        tracing::info!(
            events = summary.events_replayed,
            puts = summary.puts,
            deletes = summary.deletes,
            last_sequence = summary.last_sequence,
            keys = self.store.len(),
            "Transaction log replayed"
        );

        Ok(summary)
    }

    /// Apply every persisted event to the store, failing on the first error
    pub async fn replay(&mut self) -> Result<ReplaySummary> {
        self.phase = ReplayPhase::Replaying;

        let (mut events, mut errors) = self.logger.read_events();
        let mut summary = ReplaySummary::default();
        let mut errors_open = true;

        loop {
            tokio::select! {
                biased;

                received = errors.recv(), if errors_open => match received {
                    Some(e) => return Err(e),
                    None => errors_open = false,
                },

                received = events.recv() => match received {
                    Some(event) => {
                        self.store.apply(&event);
                        summary.events_replayed += 1;
                        summary.last_sequence = event.sequence;
                        match event.event_type {
                            EventType::Put => summary.puts += 1,
                            EventType::Delete => summary.deletes += 1,
                        }
                    }
                    None => break,
                },
            }
        }

        // The event stream can close just before the terminal error lands.
        if errors_open {
            if let Some(e) = errors.recv().await {
                return Err(e);
            }
        }

        Ok(summary)
    }

    /// Start the persistence worker and a task that logs its failures
    fn go_live(&mut self) -> Result<()> {
        self.logger.run()?;

        match self.logger.errors() {
            Some(errors) => {
                tokio::spawn(drain_errors(errors));
            }
            None => {
                tracing::debug!("Persistence error stream already taken; not draining");
            }
        }

        self.phase = ReplayPhase::Live;
        Ok(())
    }
}

/// Logs persistence failures for the lifetime of the process
async fn drain_errors(mut errors: mpsc::Receiver<KvError>) {
    while let Some(e) = errors.recv().await {
        tracing::error!(error = %e, "Transaction log write failed");
    }
}
