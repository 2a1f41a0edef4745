//! Observable sync status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the offline queue's sync state.
///
/// Only the queue mutates this; everything else receives copies through
/// [`crate::queue::OfflineWriteQueue::subscribe`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// A flush is currently in flight
    pub is_syncing: bool,
    /// Records waiting for remote acceptance
    pub queue_length: usize,
    /// Completion time of the last fully-successful flush
    pub last_sync_time: Option<DateTime<Utc>>,
}
