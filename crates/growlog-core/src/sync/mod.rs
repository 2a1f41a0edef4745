//! Flush triggers.
//!
//! The queue never schedules itself. [`FlushTrigger`] is the piece a client
//! runs alongside it: one flush shortly after start-up, then one on every
//! offline to online transition.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::auth::IdentityProvider;
use crate::queue::{FlushOutcome, OfflineWriteQueue};
use crate::remote::UpsertService;
use crate::storage::LocalBuffer;

pub struct FlushTrigger<B, R, I> {
    queue: Arc<OfflineWriteQueue<B, R, I>>,
    initial_delay: Duration,
}

impl<B, R, I> FlushTrigger<B, R, I>
where
    B: LocalBuffer + 'static,
    R: UpsertService + 'static,
    I: IdentityProvider + 'static,
{
    pub fn new(queue: Arc<OfflineWriteQueue<B, R, I>>) -> Self {
        let initial_delay = queue.config().initial_flush_delay;
        Self {
            queue,
            initial_delay,
        }
    }

    #[must_use]
    pub const fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Drive flushes until the connectivity signal closes.
    ///
    /// The queue holds a signal handle itself, so in practice this runs until
    /// the task is dropped or aborted.
    pub async fn run(self) {
        // Subscribe first so a reconnect during the settle delay is not missed
        let mut transitions = self.queue.connectivity().transitions();

        tokio::time::sleep(self.initial_delay).await;
        if self.queue.connectivity().is_online() && self.queue.queue_length() > 0 {
            self.flush("start-up").await;
        }

        while let Some(reconnect) = transitions.next().await {
            tracing::debug!("Handling reconnect #{}", reconnect);
            self.flush("reconnect").await;
        }
    }

    /// Run on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn flush(&self, reason: &str) {
        match self.queue.flush().await {
            Ok(FlushOutcome::Flushed { count }) => {
                tracing::info!("{} flush sent {} records", reason, count);
            }
            Ok(FlushOutcome::Skipped(skip)) => {
                tracing::debug!("{} flush skipped: {}", reason, skip);
            }
            Err(error) => {
                tracing::warn!("{} flush failed: {}", reason, error);
            }
        }
    }
}
