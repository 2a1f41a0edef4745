//! Runtime configuration.
//!
//! [`RemoteConfig`] says where flushed records go; [`QueueConfig`] tunes the
//! local side of the queue. Clients resolve both from whatever sources they
//! have (profile files, environment) and pass them in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::DEFAULT_CAPACITY_BYTES;
use crate::util::{is_http_url, normalize_text_option};

/// Table observations are upserted into when none is configured
pub const DEFAULT_TABLE: &str = "observations";
/// Buffer slot the queue lives in
pub const DEFAULT_STORAGE_KEY: &str = "growlog.offline_queue";
/// Settle time before the start-up flush
pub const DEFAULT_INITIAL_FLUSH_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Supabase URL and anon key must be configured together")]
    Incomplete,
    #[error("'{field}' must include http:// or https://")]
    InvalidUrl { field: &'static str },
    #[error("Table name '{0}' may only contain letters, digits, and underscores")]
    InvalidTable(String),
}

/// Remote store location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub table: String,
}

impl RemoteConfig {
    /// Resolve from optional parts.
    ///
    /// Returns `Ok(None)` when neither URL nor key is set, and an error when
    /// only one of them is.
    pub fn resolve(
        supabase_url: Option<String>,
        supabase_anon_key: Option<String>,
        table: Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let supabase_url = normalize_text_option(supabase_url);
        let supabase_anon_key = normalize_text_option(supabase_anon_key);

        let (supabase_url, supabase_anon_key) = match (supabase_url, supabase_anon_key) {
            (None, None) => return Ok(None),
            (Some(url), Some(key)) => (url, key),
            _ => return Err(ConfigError::Incomplete),
        };

        if !is_http_url(&supabase_url) {
            return Err(ConfigError::InvalidUrl {
                field: "supabase_url",
            });
        }

        let table = normalize_text_option(table).unwrap_or_else(|| DEFAULT_TABLE.to_string());
        validate_table_name(&table)?;

        Ok(Some(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            table,
        }))
    }

    /// Health endpoint used to probe reachability
    pub fn health_url(&self) -> String {
        format!("{}/auth/v1/health", self.supabase_url)
    }
}

/// Local queue tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Buffer slot holding the serialized queue
    pub storage_key: String,
    /// Byte capacity of the local buffer
    pub capacity_bytes: usize,
    /// Delay before the start-up flush
    pub initial_flush_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            initial_flush_delay: DEFAULT_INITIAL_FLUSH_DELAY,
        }
    }
}

impl QueueConfig {
    /// Companion slot holding the last successful flush time
    pub fn last_sync_key(&self) -> String {
        format!("{}.last_sync", self.storage_key)
    }
}

fn validate_table_name(table: &str) -> Result<(), ConfigError> {
    if !table.is_empty()
        && table
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        Ok(())
    } else {
        Err(ConfigError::InvalidTable(table.to_string()))
    }
}
