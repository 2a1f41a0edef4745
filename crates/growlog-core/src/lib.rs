//! growlog-core - Core library for growlog
//!
//! This crate contains the offline write queue and everything it talks to:
//! the durable local buffer, the Supabase upsert client, identity resolution,
//! and the connectivity signal. The CLI (and any future client) is a thin
//! surface over these pieces.

pub mod agronomy;
pub mod auth;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod models;
pub mod queue;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{derive_sync_key, FieldValue, QueuedRecord, SyncStatus};
pub use queue::{FlushOutcome, FlushSkip, OfflineWriteQueue, SyncError};
