//! In-memory buffer

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{check_capacity, slot_size, LocalBuffer, DEFAULT_CAPACITY_BYTES};
use crate::error::{Error, Result};

/// Process-local buffer.
///
/// Clones share the same slots, so a test can drop a queue and open a new
/// one over a clone to simulate a reload.
#[derive(Debug, Clone)]
pub struct MemoryBuffer {
    slots: Arc<Mutex<HashMap<String, String>>>,
    capacity: usize,
}

impl MemoryBuffer {
    /// Create an empty buffer with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY_BYTES)
    }

    /// Create an empty buffer holding at most `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|error| Error::Storage(format!("memory buffer lock poisoned: {error}")))
    }

    fn store(&self, slots: &mut HashMap<String, String>, key: &str, value: &str) -> Result<()> {
        let others: usize = slots
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, stored)| slot_size(existing, stored))
            .sum();
        check_capacity(others + slot_size(key, value), self.capacity)?;

        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl Default for MemoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBuffer for MemoryBuffer {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.lock()?;
        self.store(&mut slots, key, value)
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<String>,
    ) -> Result<()> {
        let mut slots = self.lock()?;
        let next = apply(slots.get(key).cloned())?;
        self.store(&mut slots, key, &next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_slot_reads_as_none() {
        let buffer = MemoryBuffer::new();
        assert_eq!(buffer.get("queue").unwrap(), None);
    }

    #[test]
    fn clones_share_slots() {
        let buffer = MemoryBuffer::new();
        let other = buffer.clone();
        buffer.set("queue", "[]").unwrap();
        assert_eq!(other.get("queue").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn oversized_write_keeps_previous_value() {
        let buffer = MemoryBuffer::with_capacity(16);
        buffer.set("k", "small").unwrap();

        let error = buffer.set("k", "this value is far too large").unwrap_err();
        assert!(matches!(error, Error::QuotaExceeded { capacity: 16, .. }));
        assert_eq!(buffer.get("k").unwrap().as_deref(), Some("small"));
        // The rejected write left no partial usage behind
        buffer.set("o", "123456789").unwrap();
    }

    #[test]
    fn overwrite_does_not_double_count() {
        let buffer = MemoryBuffer::with_capacity(10);
        buffer.set("k", "12345678").unwrap();
        buffer.set("k", "87654321").unwrap();
        assert_eq!(buffer.get("k").unwrap().as_deref(), Some("87654321"));
    }

    #[test]
    fn update_builds_on_stored_value() {
        let buffer = MemoryBuffer::new();
        buffer
            .update("k", &mut |current| {
                assert_eq!(current, None);
                Ok("a".to_string())
            })
            .unwrap();
        buffer
            .update("k", &mut |current| Ok(format!("{}b", current.unwrap_or_default())))
            .unwrap();
        assert_eq!(buffer.get("k").unwrap().as_deref(), Some("ab"));
    }

    #[test]
    fn failed_update_writes_nothing() {
        let buffer = MemoryBuffer::new();
        buffer.set("k", "kept").unwrap();

        let error = buffer
            .update("k", &mut |_| Err(Error::InvalidInput("rejected".to_string())))
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert_eq!(buffer.get("k").unwrap().as_deref(), Some("kept"));
    }
}
