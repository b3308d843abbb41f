//! Pad storage and atomic consumption accounting.
//!
//! The pad is an immutable byte blob; the only mutable state in the whole
//! core is the consumption cursor marking the first unused byte. The cursor
//! is an `AtomicU64` advanced exclusively through compare-and-swap loops,
//! so reservation issuance and cursor advancement are one indivisible step:
//! no interleaving of concurrent callers can produce overlapping
//! reservations, and no lock exists to be held across an await point.
//!
//! The commit order is advance-then-hand-out. A crash after the advance but
//! before the ciphertext leaves the process merely wastes pad bytes.
//! Wasting pad is acceptable; reuse is not.

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::PadError;

/// SHA-256 fingerprint identifying a pad.
///
/// Used as the key for persisted cursor state, so a cursor recorded for one
/// pad can never be applied to a different pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PadId([u8; 32]);

impl PadId {
    /// Raw 32-byte fingerprint.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for PadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// An immutable one-time pad.
///
/// Never mutated after construction; only indexed. The bytes are zeroized
/// when the pad is dropped.
pub struct Pad {
    bytes: Vec<u8>,
    id: PadId,
}

impl Pad {
    /// Take ownership of pad material.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let id = PadId(hasher.finalize().into());
        Self { bytes, id }
    }

    /// Total pad length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the pad holds no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 fingerprint of the pad material.
    #[must_use]
    pub fn id(&self) -> PadId {
        self.id
    }
}

impl Drop for Pad {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Pad {
    // Never print pad material.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pad").field("len", &self.bytes.len()).field("id", &self.id).finish()
    }
}

/// A transient, non-owning view into a reserved pad range.
///
/// Returned by [`PadStore::reserve`] and consumed immediately by the
/// cipher. Reservations are disjoint by construction: the cursor only
/// advances, so no two reservations can ever cover the same byte.
#[derive(Debug, Clone, Copy)]
pub struct PadReservation<'a> {
    start: u64,
    bytes: &'a [u8],
}

impl<'a> PadReservation<'a> {
    /// Pad offset of the first reserved byte.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// One past the last reserved offset.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + self.bytes.len() as u64
    }

    /// The reserved pad bytes.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Number of reserved bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the reservation is zero-length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Owner of the pad bytes and the durable next-unused-offset cursor.
///
/// `reserve` is the sole offset-allocating operation in the system: no
/// caller may compute an offset and consume pad at it ad hoc. `peek` gives
/// read-only access to ranges already committed, for retransmission and
/// duplicate verification only.
///
/// Thread-safe: share via `Arc`. All cursor updates are single CAS steps.
#[derive(Debug)]
pub struct PadStore {
    pad: Pad,
    cursor: AtomicU64,
}

impl PadStore {
    /// Create a store over `pad` with the cursor at offset 0.
    #[must_use]
    pub fn new(pad: Pad) -> Self {
        Self { pad, cursor: AtomicU64::new(0) }
    }

    /// Create a store with the cursor already at `offset` (resumed session).
    ///
    /// # Errors
    ///
    /// - [`PadError::OutOfRange`] if `offset` lies beyond the pad end
    pub fn resume(pad: Pad, offset: u64) -> Result<Self, PadError> {
        if offset > pad.len() as u64 {
            return Err(PadError::OutOfRange { start: offset, length: 0, cursor: 0 });
        }
        Ok(Self { pad, cursor: AtomicU64::new(offset) })
    }

    /// Atomically reserve the next `n` unused pad bytes.
    ///
    /// The cursor check and advance are a single CAS step, so concurrent
    /// reservations never overlap. On failure the cursor is untouched:
    /// partial pad is never handed out split across two reservations.
    ///
    /// # Errors
    ///
    /// - [`PadError::Exhausted`] if fewer than `n` unused bytes remain
    pub fn reserve(&self, n: usize) -> Result<PadReservation<'_>, PadError> {
        let pad_len = self.pad.len() as u64;

        let start = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cursor| {
                let end = cursor.checked_add(n as u64)?;
                (end <= pad_len).then_some(end)
            })
            .map_err(|cursor| PadError::Exhausted { requested: n, remaining: pad_len - cursor })?;

        Ok(PadReservation {
            start,
            bytes: &self.pad.bytes[start as usize..start as usize + n],
        })
    }

    /// Reserve `n` bytes, but only if the cursor currently sits at `offset`.
    ///
    /// Used by the inbound path: a frame declares the offset it was
    /// encrypted at, and decryption must consume exactly that range. If a
    /// concurrent outbound reservation moved the cursor first, the CAS
    /// fails and the caller treats the frame as desynchronized.
    ///
    /// # Errors
    ///
    /// - [`PadError::Exhausted`] if the range extends beyond the pad end
    /// - [`PadError::CursorMoved`] if the cursor is not at `offset`
    pub fn reserve_at(&self, offset: u64, n: usize) -> Result<PadReservation<'_>, PadError> {
        let pad_len = self.pad.len() as u64;
        let end = offset
            .checked_add(n as u64)
            .filter(|end| *end <= pad_len)
            .ok_or(PadError::Exhausted {
                requested: n,
                remaining: pad_len.saturating_sub(self.offset()),
            })?;

        self.cursor
            .compare_exchange(offset, end, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|actual| PadError::CursorMoved { expected: offset, actual })?;

        Ok(PadReservation {
            start: offset,
            bytes: &self.pad.bytes[offset as usize..offset as usize + n],
        })
    }

    /// Read-only access to an already-reserved range.
    ///
    /// Re-derives a committed reservation when a write must be retried
    /// after a transport failure, or verifies a suspected duplicate frame.
    /// Never advances the cursor; never grants access past it.
    ///
    /// # Errors
    ///
    /// - [`PadError::OutOfRange`] if the range extends beyond the cursor
    pub fn peek(&self, offset: u64, length: usize) -> Result<&[u8], PadError> {
        let cursor = self.offset();
        let in_range = offset
            .checked_add(length as u64)
            .is_some_and(|end| end <= cursor);

        if !in_range {
            return Err(PadError::OutOfRange { start: offset, length, cursor });
        }

        Ok(&self.pad.bytes[offset as usize..offset as usize + length])
    }

    /// Jump the cursor forward to `target` without handing out the bytes.
    ///
    /// Used during the handshake to adopt a peer's higher starting offset.
    /// The skipped bytes are wasted, which is acceptable; moving backward
    /// never is.
    ///
    /// # Errors
    ///
    /// - [`PadError::Exhausted`] if `target` lies beyond the pad end
    /// - [`PadError::SkipBackward`] if `target` is behind the cursor
    pub fn skip_to(&self, target: u64) -> Result<(), PadError> {
        let pad_len = self.pad.len() as u64;
        if target > pad_len {
            let cursor = self.offset();
            return Err(PadError::Exhausted {
                requested: (target - cursor) as usize,
                remaining: pad_len - cursor,
            });
        }

        self.cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cursor| {
                (cursor <= target).then_some(target)
            })
            .map(|_| ())
            .map_err(|cursor| PadError::SkipBackward { cursor, target })
    }

    /// Current cursor position (first unused pad byte).
    ///
    /// Observability only: reservations always go through [`Self::reserve`]
    /// or [`Self::reserve_at`], never through an offset computed from this.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Total pad length in bytes.
    #[must_use]
    pub fn pad_len(&self) -> u64 {
        self.pad.len() as u64
    }

    /// Unused bytes left in the pad.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.pad_len() - self.offset()
    }

    /// Whether every pad byte has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Fingerprint of the underlying pad.
    #[must_use]
    pub fn pad_id(&self) -> PadId {
        self.pad.id()
    }
}
