//! Error types for the otptunnel core.
//!
//! Strongly-typed errors per layer: pad accounting, cipher contract
//! violations, and session protocol failures. Anything touching pad-reuse
//! risk is fail-closed and non-retryable; the only forgiven condition is an
//! exact duplicate retransmission, which is handled inside the session and
//! never surfaces as an error.

use thiserror::Error;

use crate::session::SessionState;

/// Errors from pad reservation and access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PadError {
    /// Not enough unused pad left to satisfy the reservation.
    ///
    /// The cursor is left untouched: pad bytes are never handed out split
    /// across two reservations. Exhaustion is the designed end of the pad's
    /// usable life, not a condition to recover from.
    #[error("pad exhausted: requested {requested} bytes, {remaining} remaining")]
    Exhausted {
        /// Bytes requested
        requested: usize,
        /// Unused bytes left in the pad
        remaining: u64,
    },

    /// Requested range was never reserved or lies beyond the cursor.
    #[error("pad range out of range: [{start}, {start}+{length}) with cursor at {cursor}")]
    OutOfRange {
        /// Start of the requested range
        start: u64,
        /// Length of the requested range
        length: usize,
        /// Current cursor position
        cursor: u64,
    },

    /// A positional reservation lost the race: the cursor is no longer at
    /// the expected offset.
    #[error("pad cursor moved: expected {expected}, cursor at {actual}")]
    CursorMoved {
        /// Offset the caller expected the cursor to be at
        expected: u64,
        /// Actual cursor position observed
        actual: u64,
    },

    /// A forward skip targeted an offset behind the cursor.
    ///
    /// The cursor is monotonic; moving it backward would re-expose consumed
    /// pad bytes.
    #[error("pad skip rejected: cursor at {cursor}, target {target} is behind it")]
    SkipBackward {
        /// Current cursor position
        cursor: u64,
        /// Requested (stale) target offset
        target: u64,
    },
}

/// Errors from the cipher combine contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Input and pad slice lengths differ.
    ///
    /// This is a programming-contract violation, never coerced: zero-padding
    /// would leak plaintext structure, and silent truncation would misalign
    /// the pad offset for every later frame.
    #[error("length mismatch: input is {input} bytes, pad slice is {pad} bytes")]
    LengthMismatch {
        /// Input length
        input: usize,
        /// Pad slice length
        pad: usize,
    },
}

/// Errors from the session state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Operation not valid in the current state.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the error occurred
        state: SessionState,
        /// Operation that was attempted
        operation: String,
    },

    /// Peer offered a starting offset this side has already consumed past.
    ///
    /// Accepting it would let the peer encrypt under pad bytes already used
    /// here, so the session refuses to pass any data.
    #[error("stale offer: peer wants to start at {peer}, local cursor already at {local}")]
    StaleOffer {
        /// Local cursor position
        local: u64,
        /// Peer's offered starting offset
        peer: u64,
    },

    /// Peer offered a starting offset beyond the end of the pad.
    #[error("offer beyond pad: peer wants to start at {peer}, pad is {pad_len} bytes")]
    OfferBeyondPad {
        /// Peer's offered starting offset
        peer: u64,
        /// Total pad length
        pad_len: u64,
    },

    /// Inbound frame offset disagrees with the local cursor and is not an
    /// exact duplicate of an already-processed frame. Unrecoverable.
    #[error("offset mismatch: expected {expected}, frame declares {actual}")]
    OffsetMismatch {
        /// Locally expected next offset
        expected: u64,
        /// Offset declared by the frame
        actual: u64,
    },

    /// Session is in the terminal Faulted state; no further pad is consumed
    /// and nothing is delivered.
    #[error("session faulted")]
    Faulted,

    /// Pad accounting failure.
    #[error(transparent)]
    Pad(#[from] PadError),

    /// Cipher contract violation.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}
