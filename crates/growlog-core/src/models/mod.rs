//! Data models for growlog

mod record;
mod status;

pub use record::{
    derive_sync_key, FieldValue, QueuedRecord, CREATED_AT_FIELD, OWNER_FIELD, RESERVED_FIELDS,
    SYNC_KEY_FIELD,
};
pub use status::SyncStatus;
