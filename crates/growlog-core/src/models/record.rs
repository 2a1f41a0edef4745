//! Queued record model

use std::collections::BTreeMap;
use std::fmt;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Wire name of the owner field
pub const OWNER_FIELD: &str = "user_id";
/// Wire name of the conflict key field
pub const SYNC_KEY_FIELD: &str = "sync_key";
/// Wire name of the creation timestamp field
pub const CREATED_AT_FIELD: &str = "created_at";

/// Field names a payload may not use
pub const RESERVED_FIELDS: [&str; 3] = [OWNER_FIELD, SYNC_KEY_FIELD, CREATED_AT_FIELD];

/// Build the remote conflict key for a record.
///
/// The key is `owner_id + "_" + creation_timestamp` and is the only thing the
/// remote store uses to recognise a replayed write.
pub fn derive_sync_key(owner_id: &str, creation_timestamp: &str) -> String {
    format!("{owner_id}_{creation_timestamp}")
}

/// A scalar payload value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A write waiting for remote acceptance.
///
/// Serializes as one flat JSON object: the payload fields plus `created_at`,
/// `user_id` and `sync_key`. That is both the local buffer format and the
/// row shape sent to the remote table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedRecord {
    /// Observation time (RFC 3339), set by the caller and never rewritten
    #[serde(rename = "created_at")]
    pub creation_timestamp: String,
    /// Identity that produced the record, back-filled at flush when unknown
    #[serde(rename = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Remote conflict key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_key: Option<String>,
    /// Caller-defined observation fields
    #[serde(flatten)]
    pub payload: BTreeMap<String, FieldValue>,
}

impl QueuedRecord {
    /// Create a record observed at `creation_timestamp` with no fields yet
    #[must_use]
    pub fn new(creation_timestamp: impl Into<String>) -> Self {
        Self {
            creation_timestamp: creation_timestamp.into(),
            owner_id: None,
            sync_key: None,
            payload: BTreeMap::new(),
        }
    }

    /// Create a record stamped with the current time
    #[must_use]
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    }

    /// Set the owner
    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Add a payload field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    /// Check the record can be queued.
    ///
    /// The timestamp must be present and RFC 3339; payload keys must be
    /// non-empty and must not shadow the queue's own fields. A preset
    /// `sync_key` needs an owner and must be the one derived from it.
    pub fn validate(&self) -> Result<()> {
        if self.creation_timestamp.trim().is_empty() {
            return Err(Error::InvalidInput(
                "creation timestamp must not be empty".to_string(),
            ));
        }
        DateTime::parse_from_rfc3339(&self.creation_timestamp).map_err(|error| {
            Error::InvalidInput(format!(
                "creation timestamp '{}' is not RFC 3339: {error}",
                self.creation_timestamp
            ))
        })?;

        for name in self.payload.keys() {
            if name.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "payload field names must not be empty".to_string(),
                ));
            }
            if RESERVED_FIELDS.contains(&name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "payload field '{name}' is reserved"
                )));
            }
        }

        if let Some(sync_key) = self.sync_key.as_deref() {
            let Some(owner_id) = self.owner_id.as_deref() else {
                return Err(Error::InvalidInput(
                    "sync key set without an owner".to_string(),
                ));
            };
            let expected = derive_sync_key(owner_id, &self.creation_timestamp);
            if sync_key != expected {
                return Err(Error::InvalidInput(format!(
                    "sync key '{sync_key}' does not match '{expected}'"
                )));
            }
        }
        Ok(())
    }

    /// Compute `sync_key` from the owner when the owner is known and the key
    /// is not yet set.
    pub fn ensure_sync_key(&mut self) {
        if self.sync_key.is_none() {
            if let Some(owner_id) = self.owner_id.as_deref() {
                self.sync_key = Some(derive_sync_key(owner_id, &self.creation_timestamp));
            }
        }
    }

    /// Stamp a missing owner and compute a missing key.
    ///
    /// A key stored without an owner is recomputed for the new owner.
    pub fn backfill_owner(&mut self, owner_id: &str) {
        if self.owner_id.is_none() {
            self.owner_id = Some(owner_id.to_string());
            self.sync_key = Some(derive_sync_key(owner_id, &self.creation_timestamp));
        }
        self.ensure_sync_key();
    }

    /// Look up a payload field
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.payload.get(name)
    }
}
