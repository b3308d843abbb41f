//! Error types for wire-format parsing and encoding.

use thiserror::Error;

/// Convenience alias for protocol-layer results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire data.
///
/// All of these indicate either a truncated buffer (caller should wait for
/// more bytes when reading from a stream) or a malformed/hostile peer
/// (session must be torn down). The streaming [`crate::FrameDecoder`] never
/// surfaces truncation as an error; it suspends instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer too short to contain a frame header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes available
        actual: usize,
    },

    /// Frame header claims more ciphertext than the buffer holds.
    #[error("frame truncated: header claims {expected} ciphertext bytes, got {actual}")]
    FrameTruncated {
        /// Ciphertext length declared by the header
        expected: usize,
        /// Ciphertext bytes actually available
        actual: usize,
    },

    /// Declared ciphertext length exceeds the allowed maximum.
    ///
    /// Enforced before any allocation so a hostile peer cannot force the
    /// receiver to reserve unbounded memory.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared ciphertext length
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Handshake offer shorter than its fixed 8-byte encoding.
    #[error("truncated handshake offer: expected 8 bytes, got {actual}")]
    TruncatedOffer {
        /// Number of bytes available
        actual: usize,
    },
}
