//! Property-based tests for frame encoding/decoding and the streaming
//! decoder.
//!
//! These verify the wire format for ALL valid inputs, not just specific
//! examples: round-trip identity, and that the streaming decoder recovers
//! the exact frame sequence no matter how the transport fragments the
//! bytes.

use otptunnel_proto::{Frame, FrameDecoder};
use proptest::prelude::*;

/// Strategy for generating arbitrary frames with ciphertext up to 1 KB.
fn arbitrary_frame() -> impl Strategy<Value = Frame> {
    (any::<u64>(), prop::collection::vec(any::<u8>(), 0..1024))
        .prop_map(|(offset, ciphertext)| Frame::new(offset, ciphertext))
}

#[test]
fn prop_frame_encode_decode_roundtrip() {
    proptest!(|(frame in arbitrary_frame())| {
        let mut wire = Vec::new();
        frame.encode(&mut wire).expect("encode should succeed");

        let decoded = Frame::decode(&wire).expect("decode should succeed");

        // PROPERTY: Round-trip must be identity
        prop_assert_eq!(decoded, frame);
    });
}

#[test]
fn prop_decoder_recovers_sequence_under_fragmentation() {
    proptest!(|(
        frames in prop::collection::vec(arbitrary_frame(), 1..8),
        chunk_size in 1usize..64,
    )| {
        let mut wire = Vec::new();
        for frame in &frames {
            frame.encode(&mut wire).expect("encode should succeed");
        }

        // Feed the concatenated stream in fixed-size chunks, draining
        // complete frames as they become available.
        let mut decoder = FrameDecoder::new();
        let mut recovered = Vec::new();
        for chunk in wire.chunks(chunk_size) {
            decoder.feed(chunk);
            while let Some(frame) = decoder.next_frame().expect("stream is well-formed") {
                recovered.push(frame);
            }
        }

        // PROPERTY: Fragmentation must not change the frame sequence
        prop_assert_eq!(recovered, frames);
        prop_assert_eq!(decoder.buffered(), 0);
    });
}
