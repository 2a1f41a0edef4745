//! Remote upsert service.
//!
//! The queue hands whole batches to an [`UpsertService`]; the store resolves
//! duplicates on the conflict key, so replaying a batch is harmless.

mod supabase;

use std::future::Future;

use thiserror::Error;

use crate::auth::Identity;
use crate::models::{QueuedRecord, SYNC_KEY_FIELD};

pub use supabase::SupabaseUpsertClient;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote store rejected the batch: {message} ({status})")]
    Api { status: u16, message: String },
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// How the store treats rows whose conflict key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOptions {
    /// Column the store deduplicates on
    pub conflict_key: &'static str,
    /// Keep the stored row instead of overwriting it
    pub ignore_duplicates: bool,
}

impl Default for UpsertOptions {
    fn default() -> Self {
        Self {
            conflict_key: SYNC_KEY_FIELD,
            ignore_duplicates: false,
        }
    }
}

/// Batched, idempotent insert into the remote store
pub trait UpsertService: Send + Sync {
    /// Submit `records` as a single batch on behalf of `identity`.
    ///
    /// Either the whole batch is accepted or an error is returned.
    fn upsert(
        &self,
        identity: &Identity,
        records: &[QueuedRecord],
        options: UpsertOptions,
    ) -> impl Future<Output = RemoteResult<()>> + Send;
}
