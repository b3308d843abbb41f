//! Sans-IO core of the otptunnel protocol.
//!
//! An otptunnel session encrypts a byte stream with a one-time pad: a
//! shared, finite block of secret bytes consumed strictly once by the two
//! endpoints. The hard part is not the cipher (a byte-wise XOR) but the
//! management of the pad as a depleting, synchronized resource:
//!
//! - [`PadStore`] owns the pad bytes and the single consumption cursor.
//!   Reservations are atomic compare-and-swap steps, so no interleaving of
//!   concurrent callers can hand the same pad byte out twice, and a crash
//!   after a reservation wastes pad rather than reusing it.
//! - [`cipher`] applies the stateless XOR combine.
//! - [`TunnelSession`] is the per-connection state machine. It performs no
//!   I/O; methods return [`SessionAction`]s for a driver to execute
//!   (the action pattern), which keeps the protocol logic pure and directly
//!   testable.
//!
//! The state machine is deliberately conservative: the only automatic
//! recovery is discarding a byte-exact retransmission of a frame already
//! processed. Every other desynchronization routes to a terminal Faulted
//! state, because any guess risks either pad reuse (fatal to
//! confidentiality) or silent data loss.

pub mod cipher;
mod error;
mod pad;
mod session;

pub use error::{CipherError, PadError, SessionError};
pub use pad::{Pad, PadId, PadReservation, PadStore};
pub use session::{SessionAction, SessionConfig, SessionState, TunnelSession};
