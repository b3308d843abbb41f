//! Fuzz target for Frame::decode
//!
//! This fuzzer tests frame decoding with arbitrary byte sequences to find:
//! - Parser crashes or panics
//! - Integer overflows in length calculations
//! - Buffer over-reads
//! - Declared lengths that bypass validation
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use otptunnel_proto::Frame;

fuzz_target!(|data: &[u8]| {
    // Attempt to decode arbitrary bytes as a frame
    // This should never panic, only return Err for invalid data
    if let Ok(frame) = Frame::decode(data) {
        // Anything that decodes must re-encode to the bytes it consumed
        let mut encoded = Vec::with_capacity(frame.encoded_len());
        frame.encode(&mut encoded).unwrap();
        assert_eq!(&encoded[..], &data[..frame.encoded_len()]);
    }
});
