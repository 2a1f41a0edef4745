//! Test doubles for the remote store and the local buffer

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::auth::{Identity, StaticIdentity};
use crate::connectivity::ConnectivitySignal;
use crate::error::{Error, Result};
use crate::models::QueuedRecord;
use crate::remote::{RemoteError, RemoteResult, UpsertOptions, UpsertService};
use crate::storage::{LocalBuffer, MemoryBuffer};

use super::OfflineWriteQueue;

pub type TestQueue = OfflineWriteQueue<MemoryBuffer, FakeStore, StaticIdentity>;

/// Lets a test hold an upsert open until it releases it
#[derive(Default)]
pub struct Gate {
    pub started: Notify,
    pub release: Notify,
}

/// Remote store that records batches and keeps rows keyed by `sync_key`
#[derive(Clone, Default)]
pub struct FakeStore {
    batches: Arc<Mutex<Vec<Vec<QueuedRecord>>>>,
    rows: Arc<Mutex<BTreeMap<String, QueuedRecord>>>,
    failing: Arc<AtomicBool>,
    gate: Option<Arc<Gate>>,
}

impl FakeStore {
    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<QueuedRecord>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn stored_keys(&self) -> Vec<String> {
        self.rows.lock().unwrap().keys().cloned().collect()
    }
}

impl UpsertService for FakeStore {
    async fn upsert(
        &self,
        _identity: &Identity,
        records: &[QueuedRecord],
        options: UpsertOptions,
    ) -> RemoteResult<()> {
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        self.batches.lock().unwrap().push(records.to_vec());
        let mut rows = self.rows.lock().unwrap();
        for record in records {
            let key = record
                .sync_key
                .clone()
                .expect("flushed records always carry a sync key");
            if options.ignore_duplicates && rows.contains_key(&key) {
                continue;
            }
            rows.insert(key, record.clone());
        }
        Ok(())
    }
}

/// Buffer whose writes fail while `set_failing(true)` is in effect
#[derive(Clone, Default)]
pub struct FlakyBuffer {
    inner: MemoryBuffer,
    failing: Arc<AtomicBool>,
}

impl FlakyBuffer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl LocalBuffer for FlakyBuffer {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Storage("disk I/O error".to_string()));
        }
        self.inner.set(key, value)
    }
}

pub fn record(timestamp: &str) -> QueuedRecord {
    QueuedRecord::new(timestamp)
        .with_field("target_id", "tray-3")
        .with_field("ph", 6.1)
}

pub fn open_queue(
    buffer: MemoryBuffer,
    store: FakeStore,
    identity: StaticIdentity,
    online: bool,
) -> TestQueue {
    OfflineWriteQueue::open(buffer, store, identity, ConnectivitySignal::new(online)).unwrap()
}

pub fn farmer() -> StaticIdentity {
    StaticIdentity::new(Identity::new("farmerA").with_access_token("token"))
}
