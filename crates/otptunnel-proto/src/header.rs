//! Frame header with zero-copy parsing.
//!
//! The header is a fixed 12-byte structure serialized as raw big-endian
//! binary: the pad offset the ciphertext was encrypted at, followed by the
//! ciphertext length. Fields are stored as byte arrays so the struct has no
//! alignment requirements and any 12-byte buffer can be reinterpreted as a
//! header without copying.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Fixed 12-byte frame header (big-endian network byte order).
///
/// Layout on the wire: `offset: u64 BE | length: u32 BE`.
///
/// # Security
///
/// All bit patterns are structurally valid, so casting untrusted network
/// bytes cannot cause undefined behavior. [`FrameHeader::from_bytes`]
/// rejects lengths above [`FrameHeader::MAX_CIPHERTEXT_LEN`] before the
/// caller allocates anything, bounding memory use against a hostile peer.
/// The header carries no authentication; offset validation happens in the
/// session layer.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    /// Pad offset of the first ciphertext byte (u64 BE)
    offset: [u8; 8],
    /// Ciphertext length in bytes (u32 BE)
    length: [u8; 4],
}

impl FrameHeader {
    /// Size of the serialized header (12 bytes).
    pub const SIZE: usize = 12;

    /// Hard upper bound on ciphertext length (16 MB).
    ///
    /// [`crate::FrameDecoder`] may be configured with a lower limit; this
    /// constant is the ceiling enforced everywhere, including encode.
    pub const MAX_CIPHERTEXT_LEN: u32 = 16 * 1024 * 1024;

    /// Create a header for ciphertext of `length` bytes at pad `offset`.
    #[must_use]
    pub fn new(offset: u64, length: u32) -> Self {
        Self { offset: offset.to_be_bytes(), length: length.to_be_bytes() }
    }

    /// Parse a header from the front of `bytes` (zero-copy).
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooShort`] if fewer than 12 bytes are
    ///   available
    /// - [`ProtocolError::FrameTooLarge`] if the declared length exceeds
    ///   [`Self::MAX_CIPHERTEXT_LEN`]
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        let length = u32::from_be_bytes(header.length);
        if length > Self::MAX_CIPHERTEXT_LEN {
            return Err(ProtocolError::FrameTooLarge {
                size: length as usize,
                max: Self::MAX_CIPHERTEXT_LEN as usize,
            });
        }

        Ok(header)
    }

    /// Serialize the header to its 12-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Pad offset of the first ciphertext byte.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from_be_bytes(self.offset)
    }

    /// Ciphertext length in bytes.
    #[must_use]
    pub fn length(&self) -> u32 {
        u32::from_be_bytes(self.length)
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("offset", &self.offset())
            .field("length", &self.length())
            .finish()
    }
}

impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn header_size() {
        assert_eq!(std::mem::size_of::<FrameHeader>(), FrameHeader::SIZE);
        assert_eq!(FrameHeader::SIZE, 12);
    }

    proptest! {
        #[test]
        fn header_round_trip(offset in any::<u64>(), length in 0..=FrameHeader::MAX_CIPHERTEXT_LEN) {
            let header = FrameHeader::new(offset, length);
            let bytes = header.to_bytes();
            let parsed = FrameHeader::from_bytes(&bytes).expect("should parse");
            prop_assert_eq!(parsed.offset(), offset);
            prop_assert_eq!(parsed.length(), length);
        }
    }

    #[test]
    fn big_endian_layout() {
        let header = FrameHeader::new(0x0102_0304_0506_0708, 0x0A0B_0C0D);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[8..], &[0x0A, 0x0B, 0x0C, 0x0D]);
    }

    #[test]
    fn reject_short_buffer() {
        let short = [0u8; 7];
        let result = FrameHeader::from_bytes(&short);
        assert_eq!(result, Err(ProtocolError::FrameTooShort { expected: 12, actual: 7 }));
    }

    #[test]
    fn reject_oversized_length() {
        let header = FrameHeader::new(0, FrameHeader::MAX_CIPHERTEXT_LEN + 1);
        let bytes = header.to_bytes();
        let result = FrameHeader::from_bytes(&bytes);
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }
}
