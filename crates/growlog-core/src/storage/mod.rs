//! Durable local buffer
//!
//! The offline queue persists itself through the [`LocalBuffer`] trait: a
//! handful of named string slots that survive restarts. [`SqliteBuffer`] is
//! the on-device implementation; [`MemoryBuffer`] backs tests and ephemeral
//! sessions.

mod memory;
mod migrations;
mod sqlite;

use std::sync::Arc;

use crate::error::{Error, Result};

pub use memory::MemoryBuffer;
pub use sqlite::SqliteBuffer;

/// Default buffer capacity, matching the usual browser storage quota
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

/// Key-value slot storage that survives restarts
pub trait LocalBuffer: Send + Sync {
    /// Read a slot, `None` when it was never written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a slot.
    ///
    /// Must either store the whole value or fail leaving the previous value
    /// in place.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Replace a slot with a value computed from its current contents.
    ///
    /// `apply` sees the stored value (`None` when never written). Nothing is
    /// written if it fails. Implementations hold their write lock across the
    /// read and the write, so concurrent writers to the slot cannot
    /// interleave between them.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<String>,
    ) -> Result<()> {
        let next = apply(self.get(key)?)?;
        self.set(key, &next)
    }
}

impl<T: LocalBuffer + ?Sized> LocalBuffer for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<String>,
    ) -> Result<()> {
        (**self).update(key, apply)
    }
}

/// Size a slot occupies against the buffer capacity
pub(crate) const fn slot_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Fail with [`Error::QuotaExceeded`] if `needed` does not fit
pub(crate) fn check_capacity(needed: usize, capacity: usize) -> Result<()> {
    if needed > capacity {
        Err(Error::QuotaExceeded { needed, capacity })
    } else {
        Ok(())
    }
}
