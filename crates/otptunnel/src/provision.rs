//! Pad provisioning and resume policy.
//!
//! How both endpoints obtained identical pad files is out of scope (an
//! out-of-band exchange); this module only loads the local copy and decides
//! the starting cursor. With [`ResumePolicy::Resume`] the cursor recorded
//! for this exact pad (by SHA-256 fingerprint) is loaded from a
//! [`CursorStore`], so a restarted process continues where it stopped
//! instead of re-consuming the front of the pad.

use std::path::Path;

use otptunnel_core::{Pad, PadStore};
use tracing::{debug, info};

use crate::{
    error::TunnelError,
    storage::{CursorStore, PersistedPadState, StorageError},
};

/// Whether a session starts fresh or resumes a persisted cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePolicy {
    /// Start at offset 0, ignoring any persisted state.
    Fresh,
    /// Resume from the cursor recorded for this pad, if any.
    Resume,
}

/// Load a pad from a file.
///
/// # Errors
///
/// - [`TunnelError::Channel`] on I/O failure
/// - [`TunnelError::Config`] if the file is empty
pub fn load_pad(path: impl AsRef<Path>) -> Result<Pad, TunnelError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    if bytes.is_empty() {
        return Err(TunnelError::Config(format!("pad file {} is empty", path.display())));
    }

    let pad = Pad::new(bytes);
    debug!(pad_id = %pad.id(), len = pad.len(), "loaded pad");

    Ok(pad)
}

/// Build a [`PadStore`] over `pad` according to the resume policy.
///
/// # Errors
///
/// - [`TunnelError::Storage`] with [`StorageError::PadMismatch`] if the
///   persisted record belongs to a pad of a different length
/// - [`TunnelError::Session`] if the recorded cursor lies beyond the pad
pub fn open_store<C: CursorStore>(
    pad: Pad,
    policy: ResumePolicy,
    cursors: &C,
) -> Result<PadStore, TunnelError> {
    if policy == ResumePolicy::Fresh {
        return Ok(PadStore::new(pad));
    }

    let Some(state) = cursors.load(pad.id())? else {
        info!(pad_id = %pad.id(), "no persisted cursor, starting fresh");
        return Ok(PadStore::new(pad));
    };

    if state.pad_len != pad.len() as u64 {
        return Err(StorageError::PadMismatch {
            recorded: state.pad_len,
            actual: pad.len() as u64,
        }
        .into());
    }

    info!(pad_id = %pad.id(), cursor = state.cursor, "resuming persisted cursor");
    let store = PadStore::resume(pad, state.cursor).map_err(otptunnel_core::SessionError::from)?;

    Ok(store)
}

/// Record the store's cursor for a future resumed session.
///
/// Call only after a graceful close; a faulted session's pad is suspect
/// past the last confirmed-good offset and must not be resumed blindly.
///
/// # Errors
///
/// - [`TunnelError::Storage`] on persistence failure
pub fn persist_cursor<C: CursorStore>(store: &PadStore, cursors: &C) -> Result<(), TunnelError> {
    let state = PersistedPadState { cursor: store.offset(), pad_len: store.pad_len() };
    cursors.store(store.pad_id(), &state)?;

    debug!(pad_id = %store.pad_id(), cursor = state.cursor, "persisted cursor");
    Ok(())
}
