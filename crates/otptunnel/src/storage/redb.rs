//! Redb-backed durable cursor storage.
//!
//! Uses Redb's ACID transactions with copy-on-write for crash safety: the
//! recorded cursor either reflects the pre-write or post-write state, never
//! a torn value. A stale (lower) cursor after a crash wastes pad on the
//! next resume handshake; a corrupted (higher-than-true) cursor is what the
//! transactional store exists to prevent, since it is the value that guards
//! against reuse.

use std::{path::Path, sync::Arc};

use otptunnel_core::PadId;
use redb::{Database, TableDefinition};

use super::{CursorStore, PersistedPadState, StorageError};

/// Table: pad_state
/// Key: pad SHA-256 fingerprint [32 bytes]
/// Value: CBOR-encoded `PersistedPadState`
const PAD_STATE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("pad_state");

/// Durable cursor store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbCursorStore {
    db: Arc<Database>,
}

impl RedbCursorStore {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(PAD_STATE).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl CursorStore for RedbCursorStore {
    fn load(&self, pad_id: PadId) -> Result<Option<PersistedPadState>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(PAD_STATE).map_err(|e| StorageError::Io(e.to_string()))?;

        let Some(raw) = table
            .get(pad_id.as_bytes().as_slice())
            .map_err(|e| StorageError::Io(e.to_string()))?
        else {
            return Ok(None);
        };

        let state: PersistedPadState = ciborium::from_reader(raw.value())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(Some(state))
    }

    fn store(&self, pad_id: PadId, state: &PersistedPadState) -> Result<(), StorageError> {
        let mut raw = Vec::new();
        ciborium::into_writer(state, &mut raw)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let mut table =
                txn.open_table(PAD_STATE).map_err(|e| StorageError::Io(e.to_string()))?;
            table
                .insert(pad_id.as_bytes().as_slice(), raw.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }
}
