//! Wire format for the otptunnel protocol.
//!
//! The protocol is deliberately minimal. After a single 8-byte handshake
//! message ([`Offer`]), the stream is a sequence of frames:
//!
//! ```text
//! [offset: u64 BE] [length: u32 BE] [ciphertext: length bytes]
//! ```
//!
//! The `offset` is the pad position the ciphertext was encrypted at. It
//! doubles as the synchronization token between the two peers: a receiver
//! that observes an unexpected offset knows the pads have diverged.
//!
//! There is no magic number, version byte, or integrity tag in this layout;
//! adding a versioned header and a per-frame MAC are the documented
//! extension points.

mod codec;
mod errors;
mod frame;
mod handshake;
mod header;

pub use codec::FrameDecoder;
pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use handshake::Offer;
pub use header::FrameHeader;
