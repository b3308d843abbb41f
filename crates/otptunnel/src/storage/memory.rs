#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use otptunnel_core::PadId;

use super::{CursorStore, PersistedPadState, StorageError};

/// In-memory cursor store for testing and single-run sessions.
///
/// State is wrapped in `Arc<Mutex<>>` to allow Clone and concurrent access.
/// Thread-safe through the mutex, but uses `lock().expect()` which panics
/// if the mutex is poisoned - acceptable for test code.
#[derive(Clone, Default)]
pub struct MemoryCursorStore {
    inner: Arc<Mutex<HashMap<PadId, PersistedPadState>>>,
}

impl MemoryCursorStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for MemoryCursorStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    fn load(&self, pad_id: PadId) -> Result<Option<PersistedPadState>, StorageError> {
        Ok(self.inner.lock().expect("Mutex poisoned").get(&pad_id).copied())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    fn store(&self, pad_id: PadId, state: &PersistedPadState) -> Result<(), StorageError> {
        self.inner.lock().expect("Mutex poisoned").insert(pad_id, *state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use otptunnel_core::Pad;

    use super::*;

    #[test]
    fn store_and_load_round_trip() {
        let store = MemoryCursorStore::new();
        let pad_id = Pad::new(vec![1, 2, 3]).id();

        assert_eq!(store.load(pad_id).unwrap(), None);

        let state = PersistedPadState { cursor: 7, pad_len: 16 };
        store.store(pad_id, &state).unwrap();
        assert_eq!(store.load(pad_id).unwrap(), Some(state));

        // Clones share the same underlying map.
        let clone = store.clone();
        assert_eq!(clone.load(pad_id).unwrap(), Some(state));
    }
}
