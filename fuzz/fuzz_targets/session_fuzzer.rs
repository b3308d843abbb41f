//! Fuzz target for the tunnel session state machine
//!
//! Drives a session through arbitrary operation sequences and checks the
//! pad-safety invariants that hold in every state:
//!
//! - The cursor never moves backward and never passes the pad end
//! - No two emitted frames ever overlap in pad range
//! - A faulted session refuses all traffic
//! - No operation panics, whatever the state

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use otptunnel_core::{Pad, PadStore, SessionAction, SessionConfig, SessionState, TunnelSession};
use otptunnel_proto::{Frame, Offer};

const PAD_LEN: usize = 256;

#[derive(Debug, Arbitrary)]
enum Op {
    Start,
    HandleOffer { start_offset: u16 },
    SendPlaintext { data: Vec<u8> },
    HandleFrame { offset: u16, ciphertext: Vec<u8> },
    Close,
}

fuzz_target!(|ops: Vec<Op>| {
    let store = Arc::new(PadStore::new(Pad::new(vec![0x5Au8; PAD_LEN])));
    let mut session = TunnelSession::new(Arc::clone(&store), SessionConfig::default());

    let mut last_cursor = 0u64;
    let mut sent_ranges: Vec<(u64, u64)> = Vec::new();

    for op in ops {
        let before_fault = session.state() == SessionState::Faulted;

        let result = match op {
            Op::Start => session.start(),
            Op::HandleOffer { start_offset } => {
                session.handle_offer(Offer::new(u64::from(start_offset)))
            },
            Op::SendPlaintext { data } => session.send_plaintext(&data),
            Op::HandleFrame { offset, ciphertext } => {
                session.handle_frame(&Frame::new(u64::from(offset), Bytes::from(ciphertext)))
            },
            Op::Close => Ok(session.close("fuzz")),
        };

        if before_fault {
            assert!(!matches!(result, Ok(ref actions) if actions.iter().any(|a| matches!(
                a,
                SessionAction::SendFrame(_) | SessionAction::Deliver(_)
            ))));
        }

        if let Ok(actions) = result {
            for action in actions {
                if let SessionAction::SendFrame(frame) = action {
                    let start = frame.offset;
                    let end = start + frame.len() as u64;
                    assert!(end <= PAD_LEN as u64);
                    for &(s, e) in &sent_ranges {
                        assert!(end <= s || start >= e, "overlapping pad ranges emitted");
                    }
                    sent_ranges.push((start, end));
                }
            }
        }

        let cursor = store.offset();
        assert!(cursor >= last_cursor, "cursor moved backward");
        assert!(cursor <= PAD_LEN as u64, "cursor passed pad end");
        last_cursor = cursor;
    }
});
