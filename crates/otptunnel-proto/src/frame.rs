//! Frame type combining header and ciphertext.
//!
//! A `Frame` is one length-delimited, offset-tagged unit of ciphertext on
//! the wire. It is a pure data holder; pad accounting and offset validation
//! live in the session layer.

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame.
///
/// Layout on the wire:
/// `[FrameHeader: 12 bytes] + [ciphertext: variable]`
///
/// # Invariants
///
/// - Size Limit: `ciphertext.len()` MUST NOT exceed
///   [`FrameHeader::MAX_CIPHERTEXT_LEN`]. Violations are rejected during
///   encoding and decoding.
///
/// # Security
///
/// Provides structural validity only. The declared offset is NOT verified
/// here; the session compares it against the local pad cursor. The
/// ciphertext carries no integrity tag, so a corrupted same-length frame
/// decodes successfully and decrypts to garbage. A per-frame MAC is the
/// documented extension point for deployments that need tamper detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Pad offset the ciphertext was encrypted at
    pub offset: u64,

    /// Raw ciphertext bytes
    pub ciphertext: Bytes,
}

impl Frame {
    /// Create a new frame.
    #[must_use]
    pub fn new(offset: u64, ciphertext: impl Into<Bytes>) -> Self {
        Self { offset, ciphertext: ciphertext.into() }
    }

    /// Ciphertext length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ciphertext.len()
    }

    /// Whether the frame carries no ciphertext.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    /// Total size of the frame on the wire (header + ciphertext).
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.ciphertext.len()
    }

    /// Encode the frame into `dst`.
    ///
    /// Writes: `[header (12 bytes)] + [ciphertext (variable)]`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooLarge`] if the ciphertext exceeds
    ///   [`FrameHeader::MAX_CIPHERTEXT_LEN`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.ciphertext.len() > FrameHeader::MAX_CIPHERTEXT_LEN as usize {
            return Err(ProtocolError::FrameTooLarge {
                size: self.ciphertext.len(),
                max: FrameHeader::MAX_CIPHERTEXT_LEN as usize,
            });
        }

        let header = FrameHeader::new(self.offset, self.ciphertext.len() as u32);
        dst.put_slice(&header.to_bytes());
        dst.put_slice(&self.ciphertext);

        Ok(())
    }

    /// Decode exactly one frame from the front of `bytes`.
    ///
    /// One-shot counterpart of [`crate::FrameDecoder`] for callers that
    /// already hold a complete buffer. Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooShort`] if the buffer cannot hold a header
    /// - [`ProtocolError::FrameTooLarge`] if the declared length exceeds the
    ///   maximum
    /// - [`ProtocolError::FrameTruncated`] if the ciphertext is shorter than
    ///   the header claims
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;

        let length = header.length() as usize;
        let available = bytes.len() - FrameHeader::SIZE;
        if available < length {
            return Err(ProtocolError::FrameTruncated { expected: length, actual: available });
        }

        let ciphertext =
            Bytes::copy_from_slice(&bytes[FrameHeader::SIZE..FrameHeader::SIZE + length]);

        Ok(Self { offset: header.offset(), ciphertext })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn frame_round_trip(offset in any::<u64>(), ciphertext in prop::collection::vec(any::<u8>(), 0..512)) {
            let frame = Frame::new(offset, ciphertext);

            let mut wire = Vec::new();
            frame.encode(&mut wire).expect("should encode");
            prop_assert_eq!(wire.len(), frame.encoded_len());

            let parsed = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame, parsed);
        }
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let frame = Frame::new(7, vec![1, 2, 3]);
        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();
        wire.extend_from_slice(&[0xFF; 20]);

        let parsed = Frame::decode(&wire).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn reject_truncated_ciphertext() {
        let frame = Frame::new(0, vec![9u8; 100]);
        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();

        // Chop the ciphertext short of what the header claims.
        let result = Frame::decode(&wire[..FrameHeader::SIZE + 40]);
        assert_eq!(result, Err(ProtocolError::FrameTruncated { expected: 100, actual: 40 }));
    }

    #[test]
    fn reject_oversized_encode() {
        // Construct the frame directly; only encode enforces the limit.
        let big = Bytes::from(vec![0u8; FrameHeader::MAX_CIPHERTEXT_LEN as usize + 1]);
        let frame = Frame { offset: 0, ciphertext: big };

        let mut wire = Vec::new();
        assert!(matches!(frame.encode(&mut wire), Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[test]
    fn empty_frame_is_twelve_bytes() {
        let frame = Frame::new(42, Vec::new());
        assert!(frame.is_empty());
        assert_eq!(frame.len(), 0);

        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();
        assert_eq!(wire.len(), FrameHeader::SIZE);

        let parsed = Frame::decode(&wire).unwrap();
        assert_eq!(parsed.offset, 42);
        assert!(parsed.is_empty());
    }
}
