//! Cursor persistence for resumable sessions.
//!
//! Trait-based abstraction for recording how much of a pad has been
//! consumed. The trait is synchronous: writes happen at session setup and
//! teardown, never on the frame hot path. State is keyed by the pad's
//! SHA-256 fingerprint, so a cursor recorded for one pad can never be
//! applied to a different pad.

mod memory;
mod redb;

use otptunnel_core::PadId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::{memory::MemoryCursorStore, redb::RedbCursorStore};

/// Persisted consumption state for one pad.
///
/// `pad_len` is recorded alongside the cursor as a cheap consistency check:
/// a fingerprint collision is not a realistic failure mode, but a truncated
/// or swapped pad file is, and a mismatched length catches it before any
/// pad byte is risked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPadState {
    /// First unused pad offset at the time of persistence.
    pub cursor: u64,
    /// Total length of the pad the cursor belongs to.
    pub pad_len: u64,
}

/// Errors from cursor persistence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Underlying I/O or database failure.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// CBOR encoding/decoding failure.
    #[error("storage serialization error: {0}")]
    Serialization(String),

    /// Persisted state does not belong to the loaded pad.
    #[error("pad mismatch: recorded pad length {recorded}, loaded pad is {actual} bytes")]
    PadMismatch {
        /// Pad length in the persisted record
        recorded: u64,
        /// Length of the pad actually loaded
        actual: u64,
    },
}

/// Storage abstraction for persisted pad cursors.
///
/// Must be `Clone` (shared between setup and teardown paths), `Send + Sync`
/// (the teardown runs on the driver task), and synchronous. Implementations
/// typically share internal state via `Arc`, so clones access the same
/// underlying store.
pub trait CursorStore: Clone + Send + Sync + 'static {
    /// Load the persisted state for `pad_id`. `None` if never recorded.
    fn load(&self, pad_id: PadId) -> Result<Option<PersistedPadState>, StorageError>;

    /// Record `state` for `pad_id`, overwriting any previous record.
    ///
    /// The cursor must only ever move forward across stores for the same
    /// pad; callers enforce this by persisting only from a gracefully
    /// closed session.
    fn store(&self, pad_id: PadId, state: &PersistedPadState) -> Result<(), StorageError>;
}
