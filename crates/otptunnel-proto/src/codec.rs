//! Incremental frame decoder for ordered byte streams.
//!
//! A transport delivers bytes in arbitrary chunk sizes: a frame may arrive
//! split across many reads, or several frames may arrive in one. The
//! [`FrameDecoder`] accumulates fed bytes and yields complete frames,
//! suspending (returning `Ok(None)`) on partial arrival rather than
//! erroring.

use bytes::{Buf, BytesMut};

use crate::{
    Frame, FrameHeader,
    errors::{ProtocolError, Result},
};

/// Streaming decoder that extracts frames from an ordered byte source.
///
/// Feed raw transport bytes with [`FrameDecoder::feed`], then drain complete
/// frames with [`FrameDecoder::next_frame`] until it returns `Ok(None)`.
///
/// # Security
///
/// The declared ciphertext length is checked against the configured maximum
/// before the decoder waits for (or allocates) the ciphertext, so a hostile
/// peer cannot use a huge length field to pin unbounded memory.
#[derive(Debug)]
pub struct FrameDecoder {
    /// Accumulated bytes not yet consumed as frames
    buf: BytesMut,
    /// Maximum accepted ciphertext length
    max_frame_size: u32,
}

impl FrameDecoder {
    /// Create a decoder with the protocol's hard size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_size(FrameHeader::MAX_CIPHERTEXT_LEN)
    }

    /// Create a decoder that rejects ciphertext longer than `max_frame_size`.
    ///
    /// `max_frame_size` is clamped to [`FrameHeader::MAX_CIPHERTEXT_LEN`].
    #[must_use]
    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            max_frame_size: max_frame_size.min(FrameHeader::MAX_CIPHERTEXT_LEN),
        }
    }

    /// Append raw bytes read from the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet consumed as frames.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Try to extract the next complete frame.
    ///
    /// Returns `Ok(None)` if the buffer holds only part of a frame; the
    /// caller should read more bytes from the transport and feed again.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooLarge`] if a header declares a ciphertext
    ///   length above the configured maximum. The decoder is poisoned at
    ///   this point: the stream cannot be re-synchronized, the session must
    ///   be torn down.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.buf.len() < FrameHeader::SIZE {
            return Ok(None);
        }

        let header = *FrameHeader::from_bytes(&self.buf)?;

        let length = header.length() as usize;
        if length > self.max_frame_size as usize {
            return Err(ProtocolError::FrameTooLarge {
                size: length,
                max: self.max_frame_size as usize,
            });
        }

        if self.buf.len() < FrameHeader::SIZE + length {
            // Partial arrival: reserve space for the rest and suspend.
            self.buf.reserve(FrameHeader::SIZE + length - self.buf.len());
            return Ok(None);
        }

        self.buf.advance(FrameHeader::SIZE);
        let ciphertext = self.buf.split_to(length).freeze();

        Ok(Some(Frame { offset: header.offset(), ciphertext }))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(frame: &Frame) -> Vec<u8> {
        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();
        wire
    }

    #[test]
    fn whole_frame_in_one_feed() {
        let frame = Frame::new(5, vec![1, 2, 3, 4]);
        let mut decoder = FrameDecoder::new();

        decoder.feed(&encode(&frame));
        assert_eq!(decoder.next_frame().unwrap(), Some(frame));
        assert_eq!(decoder.next_frame().unwrap(), None);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn byte_at_a_time() {
        let frame = Frame::new(99, b"partial arrival".to_vec());
        let wire = encode(&frame);
        let mut decoder = FrameDecoder::new();

        for byte in &wire[..wire.len() - 1] {
            decoder.feed(std::slice::from_ref(byte));
            assert_eq!(decoder.next_frame().unwrap(), None);
        }

        decoder.feed(&wire[wire.len() - 1..]);
        assert_eq!(decoder.next_frame().unwrap(), Some(frame));
    }

    #[test]
    fn multiple_frames_in_one_feed() {
        let a = Frame::new(0, vec![1, 2]);
        let b = Frame::new(2, vec![3, 4, 5]);
        let c = Frame::new(5, Vec::new());

        let mut wire = encode(&a);
        wire.extend(encode(&b));
        wire.extend(encode(&c));

        let mut decoder = FrameDecoder::new();
        decoder.feed(&wire);

        assert_eq!(decoder.next_frame().unwrap(), Some(a));
        assert_eq!(decoder.next_frame().unwrap(), Some(b));
        assert_eq!(decoder.next_frame().unwrap(), Some(c));
        assert_eq!(decoder.next_frame().unwrap(), None);
    }

    #[test]
    fn oversized_length_rejected_before_ciphertext_arrives() {
        let mut decoder = FrameDecoder::with_max_frame_size(16);

        // Header declares 17 bytes; only the header is fed.
        let header = FrameHeader::new(0, 17);
        decoder.feed(&header.to_bytes());

        let result = decoder.next_frame();
        assert_eq!(result, Err(ProtocolError::FrameTooLarge { size: 17, max: 16 }));
    }

    #[test]
    fn max_frame_size_clamped_to_hard_limit() {
        let decoder = FrameDecoder::with_max_frame_size(u32::MAX);
        assert_eq!(decoder.max_frame_size, FrameHeader::MAX_CIPHERTEXT_LEN);
    }
}
