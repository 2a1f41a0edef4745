use std::io;

use growlog_core::agronomy::AgronomyError;
use growlog_core::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] growlog_core::Error),
    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Agronomy(#[from] AgronomyError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Sync is not configured. Run `growlog config init` + `growlog auth login`, or set GROWLOG_SUPABASE_URL and GROWLOG_SUPABASE_ANON_KEY."
    )]
    SyncNotConfigured,
}
