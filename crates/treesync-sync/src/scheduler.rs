//! Poll scheduler - drives the change feed on a fixed interval
//!
//! The [`PollScheduler`] reads the change feed every `poll_interval` and
//! forwards each non-empty batch to the collaborator applying remote changes
//! to the document tree.
//!
//! ## Flow
//!
//! ```text
//! interval tick ──→ SyncEngine::get_changes ──→ mpsc::Sender<Vec<Change>>
//!       ▲                                               │ sent
//!       │                                               ▼
//!       └──────────────────────────── SyncEngine::set_applied_changes
//! ```
//!
//! The loop stops when the `CancellationToken` fires or the receiver is
//! dropped. A failed cycle is logged and skipped; the next tick tries again.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use treesync_core::config::SyncConfig;
use treesync_core::domain::{Change, ChangeBatch};

use crate::engine::SyncEngine;

/// Capacity of the change channel
const CHANNEL_CAPACITY: usize = 16;

/// Periodically polls the change feed of a resolved workspace
pub struct PollScheduler {
    engine: Arc<SyncEngine>,
    changes_tx: mpsc::Sender<Vec<Change>>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl PollScheduler {
    /// Creates a new `PollScheduler`
    ///
    /// # Arguments
    /// * `engine` - Engine whose workspace is polled
    /// * `poll_interval` - Delay between two polls
    /// * `shutdown` - Token stopping the loop when cancelled
    ///
    /// # Returns
    /// The scheduler and the receiving end of the change channel.
    pub fn new(
        engine: Arc<SyncEngine>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::Receiver<Vec<Change>>) {
        let (changes_tx, changes_rx) = mpsc::channel(CHANNEL_CAPACITY);
        info!(
            poll_ms = poll_interval.as_millis() as u64,
            "Creating poll scheduler"
        );
        let scheduler = Self {
            engine,
            changes_tx,
            poll_interval,
            shutdown,
        };
        (scheduler, changes_rx)
    }

    /// Creates a scheduler polling every `sync.poll_interval` seconds
    pub fn from_config(
        engine: Arc<SyncEngine>,
        config: &SyncConfig,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::Receiver<Vec<Change>>) {
        Self::new(engine, Duration::from_secs(config.poll_interval), shutdown)
    }

    /// Runs until the token is cancelled or the receiver is dropped
    ///
    /// The first poll happens immediately.
    pub async fn run(self) {
        info!("Poll scheduler starting");

        let mut timer = tokio::time::interval(self.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, poll scheduler stopping");
                    break;
                }
                _ = timer.tick() => {
                    if !self.poll_once().await {
                        info!("Change receiver dropped, poll scheduler stopping");
                        break;
                    }
                }
            }
        }

        info!("Poll scheduler stopped");
    }

    /// Runs one cycle; returns false once nobody listens for changes
    ///
    /// The page token only moves past a batch after the batch has been
    /// handed to the receiver, so an undelivered batch is read again.
    async fn poll_once(&self) -> bool {
        let batch = match self.engine.get_changes().await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "Change poll failed, skipping cycle"
                );
                return !self.changes_tx.is_closed();
            }
        };

        if batch.is_empty() {
            debug!("No remote changes");
            self.commit(&batch).await;
            return !self.changes_tx.is_closed();
        }

        debug!(count = batch.len(), "Forwarding remote changes");
        let delivered = self.changes_tx.send(batch.changes.clone()).await.is_ok();
        if delivered {
            self.commit(&batch).await;
        }
        delivered
    }

    /// Saves the batch's page token; on failure the batch is redelivered
    async fn commit(&self, batch: &ChangeBatch) {
        if let Err(e) = self.engine.set_applied_changes(batch).await {
            warn!(error = %e, "Could not save page token, changes will be read again");
        }
    }
}
