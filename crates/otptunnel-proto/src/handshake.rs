//! Handshake offer message.
//!
//! Before any framed traffic, each peer sends exactly one [`Offer`]
//! declaring the pad offset it intends to start consuming from. The offer
//! is a bare 8-byte big-endian integer; there is no version negotiation in
//! this minimal wire format (a versioned hello is the extension point).

use crate::errors::{ProtocolError, Result};

/// Starting-offset declaration exchanged once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offer {
    /// First pad offset the sender intends to consume
    pub start_offset: u64,
}

impl Offer {
    /// Size of the serialized offer (8 bytes).
    pub const SIZE: usize = 8;

    /// Create an offer starting at `start_offset`.
    #[must_use]
    pub fn new(start_offset: u64) -> Self {
        Self { start_offset }
    }

    /// Serialize to the 8-byte wire form.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        self.start_offset.to_be_bytes()
    }

    /// Parse an offer from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::TruncatedOffer`] if fewer than 8 bytes are
    ///   available
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some(head) = bytes.get(..Self::SIZE) else {
            return Err(ProtocolError::TruncatedOffer { actual: bytes.len() });
        };

        let mut raw = [0u8; Self::SIZE];
        raw.copy_from_slice(head);

        Ok(Self { start_offset: u64::from_be_bytes(raw) })
    }
}
