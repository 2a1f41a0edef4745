//! Offline write queue.
//!
//! The [`LocalBuffer`] slot is the source of truth. Every change re-reads
//! the slot, applies itself and writes it back in one buffer update before
//! returning, so several queues over the same buffer (separate processes
//! sharing one database, say) see each other's records. [`OfflineWriteQueue::flush`]
//! sends the current contents to the remote store as one batch and, once
//! the store accepts it, removes exactly those records. Records appended
//! while a flush is in flight stay queued for the next one.

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;

use crate::auth::IdentityProvider;
use crate::config::QueueConfig;
use crate::connectivity::ConnectivitySignal;
use crate::error::{Error, Result};
use crate::models::{QueuedRecord, SyncStatus};
use crate::remote::{RemoteError, UpsertOptions, UpsertService};
use crate::storage::LocalBuffer;

/// Why a flush failed. The queue is untouched in every case.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("Could not update local queue: {0}")]
    Persistence(#[from] Error),
}

/// Why a flush had nothing to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushSkip {
    Empty,
    Offline,
    NoIdentity,
    AlreadyFlushing,
}

impl fmt::Display for FlushSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Empty => "queue is empty",
            Self::Offline => "offline",
            Self::NoIdentity => "not signed in",
            Self::AlreadyFlushing => "another flush is in progress",
        };
        f.write_str(reason)
    }
}

/// Result of a flush that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The store accepted `count` records and they left the queue
    Flushed { count: usize },
    /// Nothing was sent
    Skipped(FlushSkip),
}

pub struct OfflineWriteQueue<B, R, I> {
    buffer: B,
    remote: R,
    identity: I,
    connectivity: ConnectivitySignal,
    config: QueueConfig,
    records: Mutex<Vec<QueuedRecord>>,
    flushing: AtomicBool,
    status: watch::Sender<SyncStatus>,
}

impl<B, R, I> OfflineWriteQueue<B, R, I>
where
    B: LocalBuffer,
    R: UpsertService,
    I: IdentityProvider,
{
    /// Open the queue stored in `buffer` with the default configuration
    pub fn open(
        buffer: B,
        remote: R,
        identity: I,
        connectivity: ConnectivitySignal,
    ) -> Result<Self> {
        Self::open_with_config(
            buffer,
            remote,
            identity,
            connectivity,
            QueueConfig::default(),
        )
    }

    /// Open the queue stored in `buffer`, starting empty if the slot was
    /// never written
    pub fn open_with_config(
        buffer: B,
        remote: R,
        identity: I,
        connectivity: ConnectivitySignal,
        config: QueueConfig,
    ) -> Result<Self> {
        let records = load_records(&buffer, &config.storage_key)?;
        let last_sync_time = load_last_sync(&buffer, &config.last_sync_key())?;
        tracing::debug!(
            "Opened offline queue '{}' with {} pending records",
            config.storage_key,
            records.len()
        );

        let (status, _rx) = watch::channel(SyncStatus {
            is_syncing: false,
            queue_length: records.len(),
            last_sync_time,
        });

        Ok(Self {
            buffer,
            remote,
            identity,
            connectivity,
            config,
            records: Mutex::new(records),
            flushing: AtomicBool::new(false),
            status,
        })
    }

    /// Append a record and persist the queue before returning.
    ///
    /// Returns the new queue length. If the buffer write fails the error is
    /// returned and the queue is left as it was.
    pub fn enqueue(&self, mut record: QueuedRecord) -> Result<usize> {
        record.validate()?;
        record.ensure_sync_key();

        let queue_length = match self.rewrite(|persisted| persisted.push(record.clone())) {
            Ok(queue_length) => queue_length,
            Err(error) => {
                tracing::warn!("Failed to persist offline queue: {}", error);
                return Err(error);
            }
        };
        tracing::debug!("Queued record, {} pending", queue_length);
        Ok(queue_length)
    }

    /// Send everything queued so far to the remote store as one batch.
    pub async fn flush(&self) -> std::result::Result<FlushOutcome, SyncError> {
        if self.reload()?.is_empty() {
            return Ok(FlushOutcome::Skipped(FlushSkip::Empty));
        }
        if !self.connectivity.is_online() {
            tracing::debug!("Skipping flush while offline");
            return Ok(FlushOutcome::Skipped(FlushSkip::Offline));
        }
        let Some(_guard) = FlushGuard::acquire(&self.flushing, &self.status) else {
            tracing::debug!("Flush already in progress");
            return Ok(FlushOutcome::Skipped(FlushSkip::AlreadyFlushing));
        };

        let snapshot = self.reload()?;
        if snapshot.is_empty() {
            return Ok(FlushOutcome::Skipped(FlushSkip::Empty));
        }

        let Some(identity) = self.identity.resolve_identity().await else {
            tracing::debug!("No signed-in identity, postponing flush");
            return Ok(FlushOutcome::Skipped(FlushSkip::NoIdentity));
        };

        let mut batch = snapshot.clone();
        for record in &mut batch {
            record.backfill_owner(&identity.user_id);
        }

        if let Err(error) = self
            .remote
            .upsert(&identity, &batch, UpsertOptions::default())
            .await
        {
            tracing::warn!(
                "Flush of {} records failed, keeping them queued: {}",
                batch.len(),
                error
            );
            return Err(error.into());
        }

        let count = batch.len();
        let synced_at = Utc::now();
        let remaining = self.remove_flushed(&snapshot)?;
        self.persist_last_sync(synced_at);

        self.status
            .send_modify(|status| status.last_sync_time = Some(synced_at));
        tracing::info!("Flushed {} records, {} still pending", count, remaining);
        Ok(FlushOutcome::Flushed { count })
    }

    /// Number of records in the last persisted queue
    pub fn queue_length(&self) -> usize {
        self.status.borrow().queue_length
    }

    /// Current sync status
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Receive every future status change
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Copy of the persisted records, oldest first
    pub fn pending(&self) -> Result<Vec<QueuedRecord>> {
        self.reload()
    }

    pub const fn connectivity(&self) -> &ConnectivitySignal {
        &self.connectivity
    }

    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Drop the records a flush sent, matched one for one against the
    /// persisted queue. Everything else stays, wherever it came from.
    fn remove_flushed(&self, flushed: &[QueuedRecord]) -> Result<usize> {
        self.rewrite(|persisted| {
            let mut unmatched: Vec<&QueuedRecord> = flushed.iter().collect();
            persisted.retain(|record| {
                match unmatched.iter().position(|sent| *sent == record) {
                    Some(index) => {
                        unmatched.swap_remove(index);
                        false
                    }
                    None => true,
                }
            });
        })
    }

    /// Apply `change` to the persisted queue and write it back.
    ///
    /// The in-memory copy and the published length are updated before the
    /// records lock is released, so they always match the last write.
    fn rewrite(&self, mut change: impl FnMut(&mut Vec<QueuedRecord>)) -> Result<usize> {
        let mut records = self.lock_records()?;
        let mut written = None;
        self.buffer.update(
            &self.config.storage_key,
            &mut |current: Option<String>| -> Result<String> {
                let mut persisted = decode_records(current.as_deref())?;
                change(&mut persisted);
                let serialized = serde_json::to_string(&persisted)?;
                written = Some(persisted);
                Ok(serialized)
            },
        )?;
        if let Some(written) = written {
            *records = written;
        }

        let queue_length = records.len();
        self.status
            .send_modify(|status| status.queue_length = queue_length);
        Ok(queue_length)
    }

    /// Replace the in-memory copy with what the buffer holds now
    fn reload(&self) -> Result<Vec<QueuedRecord>> {
        let mut records = self.lock_records()?;
        *records = load_records(&self.buffer, &self.config.storage_key)?;

        let queue_length = records.len();
        self.status.send_if_modified(|status| {
            let changed = status.queue_length != queue_length;
            status.queue_length = queue_length;
            changed
        });
        Ok(records.clone())
    }

    fn persist_last_sync(&self, synced_at: DateTime<Utc>) {
        // The records already left the queue; a lost timestamp only affects display
        if let Err(error) = self
            .buffer
            .set(&self.config.last_sync_key(), &synced_at.to_rfc3339())
        {
            tracing::warn!("Failed to persist last sync time: {}", error);
        }
    }

    fn lock_records(&self) -> Result<MutexGuard<'_, Vec<QueuedRecord>>> {
        self.records
            .lock()
            .map_err(|error| Error::Storage(format!("offline queue lock poisoned: {error}")))
    }
}

/// Marks a flush in progress; clears the flag and `is_syncing` on drop,
/// including when the flush future is cancelled.
struct FlushGuard<'a> {
    flushing: &'a AtomicBool,
    status: &'a watch::Sender<SyncStatus>,
}

impl<'a> FlushGuard<'a> {
    fn acquire(flushing: &'a AtomicBool, status: &'a watch::Sender<SyncStatus>) -> Option<Self> {
        flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        status.send_modify(|status| status.is_syncing = true);
        Some(Self { flushing, status })
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.status.send_modify(|status| status.is_syncing = false);
        self.flushing.store(false, Ordering::Release);
    }
}

fn load_records(buffer: &impl LocalBuffer, key: &str) -> Result<Vec<QueuedRecord>> {
    decode_records(buffer.get(key)?.as_deref())
}

fn decode_records(raw: Option<&str>) -> Result<Vec<QueuedRecord>> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(raw)?),
        _ => Ok(Vec::new()),
    }
}

fn load_last_sync(buffer: &impl LocalBuffer, key: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = buffer.get(key)? else {
        return Ok(None);
    };
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => Ok(Some(parsed.with_timezone(&Utc))),
        Err(error) => {
            tracing::warn!("Ignoring unreadable last sync time '{}': {}", raw, error);
            Ok(None)
        }
    }
}
