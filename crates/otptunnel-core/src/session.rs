//! Tunnel session state machine.
//!
//! Drives the pad store, cipher, and frame types for one connection. Uses
//! the action pattern: methods return [`SessionAction`]s for a driver to
//! execute, keeping the state machine pure (no I/O) and directly testable.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────────┐  offers agree  ┌────────┐  offset mismatch  ┌───────────┐
//! │ Handshaking │───────────────>│ Active │──────────────────>│ Resyncing │
//! └─────────────┘                └────────┘<──────────────────└───────────┘
//!       │                          │    │      exact duplicate     │
//!       │ stale offer              │    │ close / exhausted        │ anything else
//!       ↓                          ↓    ↓                          ↓
//!  ┌─────────┐                ┌─────────┐ ┌────────┐          ┌─────────┐
//!  │ Faulted │                │ Faulted │ │ Closed │          │ Faulted │
//!  └─────────┘                └─────────┘ └────────┘          └─────────┘
//! ```
//!
//! Both directions consume one shared cursor in lockstep: sending reserves
//! at the cursor, and an inbound frame must declare exactly the cursor
//! position. The only tolerated deviation is a byte-exact retransmission of
//! a frame already processed, which is discarded without consuming pad.
//! Every other mismatch is ambiguous and routes to the terminal Faulted
//! state - a guess would risk pad reuse or silent data loss.

use std::{collections::VecDeque, sync::Arc};

use bytes::Bytes;
use otptunnel_proto::{Frame, Offer};

use crate::{
    cipher,
    error::{PadError, SessionError},
    pad::PadStore,
};

/// Default number of processed inbound frames kept for duplicate detection.
pub const DEFAULT_REPLAY_WINDOW: usize = 32;

/// Actions returned by the session state machine.
///
/// The driver (runtime tunnel or test harness) executes these:
/// - `SendOffer` / `SendFrame`: serialize and write to the channel
/// - `Deliver`: hand decrypted plaintext to the application
/// - `Close`: tear down the transport with the given reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send this handshake offer to the peer
    SendOffer(Offer),

    /// Send this frame to the peer
    SendFrame(Frame),

    /// Deliver this decrypted plaintext to the application
    Deliver(Bytes),

    /// Close the connection with this reason
    Close {
        /// Reason for closing the connection
        reason: String,
    },
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Exchanging starting-offset offers
    Handshaking,
    /// Steady-state duplex relay
    Active,
    /// Evaluating an offset mismatch against the duplicate-tolerance rule
    Resyncing,
    /// Graceful shutdown; cursor may be persisted for resumption
    Closed,
    /// Terminal failure; no further pad is consumed, nothing is delivered
    Faulted,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Number of processed inbound frames retained for duplicate detection.
    ///
    /// A retransmission older than this window cannot be verified as exact
    /// and therefore faults the session.
    pub replay_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { replay_window: DEFAULT_REPLAY_WINDOW }
    }
}

/// Per-connection state machine multiplexing an application byte stream
/// over the encrypted channel.
///
/// Owns the session lifecycle and nothing else: pad accounting lives in the
/// shared [`PadStore`], wire encoding in `otptunnel-proto`, and I/O in the
/// driver. All pad-consuming paths go through the store's atomic reserve
/// operations, so a session abort at any point wastes at most the in-flight
/// reservation and can never reuse a byte.
#[derive(Debug)]
pub struct TunnelSession {
    /// Current state
    state: SessionState,
    /// Configuration
    config: SessionConfig,
    /// Shared pad store (both directions consume from it)
    pad: Arc<PadStore>,
    /// Recently processed inbound frames, oldest first, for duplicate
    /// detection: (offset, ciphertext)
    replay_ledger: VecDeque<(u64, Bytes)>,
}

impl TunnelSession {
    /// Create a session in [`SessionState::Handshaking`] over `pad`.
    #[must_use]
    pub fn new(pad: Arc<PadStore>, config: SessionConfig) -> Self {
        Self { state: SessionState::Handshaking, config, pad, replay_ledger: VecDeque::new() }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The pad store this session consumes from.
    #[must_use]
    pub fn pad(&self) -> &Arc<PadStore> {
        &self.pad
    }

    /// Whether the cursor may be persisted for a future session.
    ///
    /// Only a gracefully closed session qualifies. After a fault the pad
    /// past the last confirmed-good offset is suspect and must not be
    /// resumed blindly.
    #[must_use]
    pub fn may_persist_cursor(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Begin the handshake by offering the local cursor position.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] if not in Handshaking state
    pub fn start(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        self.require_state(SessionState::Handshaking, "start")?;

        Ok(vec![SessionAction::SendOffer(Offer::new(self.pad.offset()))])
    }

    /// Process the peer's starting-offset offer.
    ///
    /// Agreement rule: a peer offering at or ahead of the local cursor is
    /// accepted, skipping the local cursor forward if needed (the skipped
    /// bytes are wasted, which is acceptable). A peer offering behind the
    /// local cursor would encrypt under pad bytes already consumed here, so
    /// the session faults and refuses to pass any application data.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] if not in Handshaking state
    /// - [`SessionError::StaleOffer`] (session faulted) if the peer's
    ///   offset is behind the local cursor
    /// - [`SessionError::OfferBeyondPad`] (session faulted) if the peer's
    ///   offset lies past the pad end
    pub fn handle_offer(&mut self, offer: Offer) -> Result<Vec<SessionAction>, SessionError> {
        self.require_state(SessionState::Handshaking, "handle_offer")?;

        let local = self.pad.offset();
        let peer = offer.start_offset;

        if peer > self.pad.pad_len() {
            self.state = SessionState::Faulted;
            return Err(SessionError::OfferBeyondPad { peer, pad_len: self.pad.pad_len() });
        }

        if peer < local {
            self.state = SessionState::Faulted;
            return Err(SessionError::StaleOffer { local, peer });
        }

        if peer > local {
            self.pad.skip_to(peer)?;
        }

        self.state = SessionState::Active;
        Ok(vec![])
    }

    /// Encrypt one outbound application chunk and emit its frame.
    ///
    /// Reserves pad of matching length (committing the cursor advance
    /// before any ciphertext exists), encrypts, and returns the frame at
    /// the reserved offset. Empty chunks produce no frame and consume no
    /// pad.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] if not in Active state
    /// - [`SessionError::Faulted`] if the session has faulted
    /// - [`SessionError::Pad`] with [`PadError::Exhausted`] if the pad
    ///   cannot cover the chunk; the session transitions to Closed (pad
    ///   exhaustion is the designed end of its life, not a fault)
    pub fn send_plaintext(&mut self, plaintext: &[u8]) -> Result<Vec<SessionAction>, SessionError> {
        self.require_state(SessionState::Active, "send_plaintext")?;

        if plaintext.is_empty() {
            return Ok(vec![]);
        }

        let reservation = match self.pad.reserve(plaintext.len()) {
            Ok(reservation) => reservation,
            Err(err @ PadError::Exhausted { .. }) => {
                self.state = SessionState::Closed;
                return Err(err.into());
            },
            Err(err) => return Err(err.into()),
        };

        let ciphertext = cipher::encrypt(plaintext, reservation.bytes())?;

        Ok(vec![SessionAction::SendFrame(Frame::new(reservation.start(), ciphertext))])
    }

    /// Process one inbound frame.
    ///
    /// The frame's declared offset must equal the local cursor; on match
    /// the range is reserved atomically, decrypted, and delivered. On
    /// mismatch the session passes through Resyncing: a byte-exact replay
    /// of a frame already processed is discarded silently (no pad
    /// consumed), anything else faults.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] if not in Active state
    /// - [`SessionError::Faulted`] if the session has faulted
    /// - [`SessionError::OffsetMismatch`] (session faulted) on any
    ///   non-duplicate desynchronization
    /// - [`SessionError::Pad`] with [`PadError::Exhausted`] if the frame
    ///   extends beyond the pad end; the session transitions to Closed
    pub fn handle_frame(&mut self, frame: &Frame) -> Result<Vec<SessionAction>, SessionError> {
        self.require_state(SessionState::Active, "handle_frame")?;

        let expected = self.pad.offset();

        if frame.offset != expected {
            return self.resync(frame, expected);
        }

        // Keepalive/no-op: nothing to decrypt, no pad consumed.
        if frame.is_empty() {
            return Ok(vec![]);
        }

        let reservation = match self.pad.reserve_at(expected, frame.len()) {
            Ok(reservation) => reservation,
            Err(err @ PadError::Exhausted { .. }) => {
                self.state = SessionState::Closed;
                return Err(err.into());
            },
            Err(PadError::CursorMoved { actual, .. }) => {
                // An outbound reservation raced us between the offset check
                // and the CAS. The streams are interleaved ambiguously.
                self.state = SessionState::Faulted;
                return Err(SessionError::OffsetMismatch { expected: actual, actual: frame.offset });
            },
            Err(err) => return Err(err.into()),
        };

        let plaintext = cipher::decrypt(&frame.ciphertext, reservation.bytes())?;

        self.record_processed(frame);

        Ok(vec![SessionAction::Deliver(Bytes::from(plaintext))])
    }

    /// Re-derive an already-sent frame for transport-level retransmission.
    ///
    /// Retries must never reserve fresh pad for the same logical plaintext;
    /// this recomputes the ciphertext from the committed range via `peek`.
    /// The caller supplies the original plaintext and the offset the
    /// original send reserved.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] if not in Active state
    /// - [`SessionError::Pad`] with [`PadError::OutOfRange`] if the range
    ///   was never reserved
    pub fn replay_frame(&self, offset: u64, plaintext: &[u8]) -> Result<Frame, SessionError> {
        self.require_state(SessionState::Active, "replay_frame")?;

        let pad_slice = self.pad.peek(offset, plaintext.len())?;
        let ciphertext = cipher::encrypt(plaintext, pad_slice)?;

        Ok(Frame::new(offset, ciphertext))
    }

    /// Gracefully close the session.
    ///
    /// Idempotent; a faulted session stays faulted.
    pub fn close(&mut self, reason: &str) -> Vec<SessionAction> {
        if matches!(self.state, SessionState::Faulted | SessionState::Closed) {
            return vec![];
        }

        self.state = SessionState::Closed;
        vec![SessionAction::Close { reason: reason.to_string() }]
    }

    /// Evaluate an offset mismatch against the duplicate-tolerance rule.
    ///
    /// Tolerated: the frame's range lies strictly behind the cursor AND a
    /// ledger entry records the identical offset and ciphertext, proving
    /// the peer retransmitted a frame already fully processed. The pad is
    /// fixed, so identical ciphertext at the same offset implies identical
    /// plaintext after decrypt; no pad is re-consumed and nothing is
    /// re-delivered.
    fn resync(&mut self, frame: &Frame, expected: u64) -> Result<Vec<SessionAction>, SessionError> {
        self.state = SessionState::Resyncing;

        let is_replay = frame.offset < expected
            && self
                .replay_ledger
                .iter()
                .any(|(offset, ciphertext)| *offset == frame.offset && *ciphertext == frame.ciphertext);

        if is_replay {
            self.state = SessionState::Active;
            return Ok(vec![]);
        }

        self.state = SessionState::Faulted;
        Err(SessionError::OffsetMismatch { expected, actual: frame.offset })
    }

    /// Record a processed inbound frame, trimming the ledger to the window.
    fn record_processed(&mut self, frame: &Frame) {
        if self.config.replay_window == 0 {
            return;
        }

        self.replay_ledger.push_back((frame.offset, frame.ciphertext.clone()));
        while self.replay_ledger.len() > self.config.replay_window {
            self.replay_ledger.pop_front();
        }
    }

    fn require_state(&self, required: SessionState, operation: &str) -> Result<(), SessionError> {
        if self.state == SessionState::Faulted {
            return Err(SessionError::Faulted);
        }

        if self.state != required {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: operation.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::pad::Pad;

    use super::*;

    fn session_over(pad_bytes: Vec<u8>) -> TunnelSession {
        let store = Arc::new(PadStore::new(Pad::new(pad_bytes)));
        TunnelSession::new(store, SessionConfig::default())
    }

    fn activate(session: &mut TunnelSession) {
        let local = session.pad().offset();
        session.start().unwrap();
        session.handle_offer(Offer::new(local)).unwrap();
        assert_eq!(session.state(), SessionState::Active);
    }

    fn sent_frame(actions: Vec<SessionAction>) -> Frame {
        match actions.as_slice() {
            [SessionAction::SendFrame(frame)] => frame.clone(),
            other => unreachable!("expected single SendFrame, got {other:?}"),
        }
    }

    #[test]
    fn handshake_at_matching_offsets() {
        let mut session = session_over(vec![0u8; 8]);

        let actions = session.start().unwrap();
        assert_eq!(actions, vec![SessionAction::SendOffer(Offer::new(0))]);

        let actions = session.handle_offer(Offer::new(0)).unwrap();
        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn handshake_adopts_higher_peer_offset() {
        let mut session = session_over(vec![0u8; 16]);
        session.start().unwrap();

        session.handle_offer(Offer::new(5)).unwrap();
        assert_eq!(session.state(), SessionState::Active);
        // Bytes [0, 5) are wasted, never reused.
        assert_eq!(session.pad().offset(), 5);
    }

    #[test]
    fn handshake_faults_on_stale_offer() {
        let store = Arc::new(PadStore::new(Pad::new(vec![0u8; 16])));
        store.skip_to(6).unwrap();
        let mut session = TunnelSession::new(store, SessionConfig::default());
        session.start().unwrap();

        let result = session.handle_offer(Offer::new(3));
        assert_eq!(result.unwrap_err(), SessionError::StaleOffer { local: 6, peer: 3 });
        assert_eq!(session.state(), SessionState::Faulted);

        // Terminal: everything after the fault is refused.
        assert_eq!(session.send_plaintext(b"x").unwrap_err(), SessionError::Faulted);
    }

    #[test]
    fn handshake_faults_on_offer_beyond_pad() {
        let mut session = session_over(vec![0u8; 4]);
        session.start().unwrap();

        let result = session.handle_offer(Offer::new(5));
        assert_eq!(result.unwrap_err(), SessionError::OfferBeyondPad { peer: 5, pad_len: 4 });
        assert_eq!(session.state(), SessionState::Faulted);
    }

    #[test]
    fn send_reserves_encrypts_and_frames() {
        let mut session = session_over((0u8..16).collect());
        activate(&mut session);

        let frame = sent_frame(session.send_plaintext(b"hi").unwrap());
        assert_eq!(frame.offset, 0);
        assert_eq!(&frame.ciphertext[..], &[b'h' ^ 0, b'i' ^ 1]);
        assert_eq!(session.pad().offset(), 2);

        let frame = sent_frame(session.send_plaintext(b"there").unwrap());
        assert_eq!(frame.offset, 2);
        assert_eq!(session.pad().offset(), 7);
    }

    #[test]
    fn empty_send_consumes_nothing() {
        let mut session = session_over(vec![0u8; 4]);
        activate(&mut session);

        assert!(session.send_plaintext(b"").unwrap().is_empty());
        assert_eq!(session.pad().offset(), 0);
    }

    #[test]
    fn receive_delivers_in_lockstep() {
        let mut alice = session_over(vec![0xAA; 16]);
        let mut bob = session_over(vec![0xAA; 16]);
        activate(&mut alice);
        activate(&mut bob);

        let frame = sent_frame(alice.send_plaintext(b"hello").unwrap());

        let actions = bob.handle_frame(&frame).unwrap();
        assert_eq!(actions, vec![SessionAction::Deliver(Bytes::from_static(b"hello"))]);
        assert_eq!(bob.pad().offset(), 5);
        assert_eq!(bob.state(), SessionState::Active);
    }

    #[test]
    fn duplicate_frame_delivered_exactly_once() {
        let mut alice = session_over(vec![0x5C; 16]);
        let mut bob = session_over(vec![0x5C; 16]);
        activate(&mut alice);
        activate(&mut bob);

        let frame = sent_frame(alice.send_plaintext(b"hello").unwrap());

        let first = bob.handle_frame(&frame).unwrap();
        assert_eq!(first.len(), 1);

        // Transport-level retry: identical frame arrives again.
        let second = bob.handle_frame(&frame).unwrap();
        assert!(second.is_empty(), "duplicate must not be re-delivered");
        assert_eq!(bob.state(), SessionState::Active);
        assert_eq!(bob.pad().offset(), 5, "duplicate must not consume pad");
    }

    #[test]
    fn stale_but_different_frame_faults() {
        let mut alice = session_over(vec![0x5C; 16]);
        let mut bob = session_over(vec![0x5C; 16]);
        activate(&mut alice);
        activate(&mut bob);

        let frame = sent_frame(alice.send_plaintext(b"hello").unwrap());
        bob.handle_frame(&frame).unwrap();

        // Same offset, different bytes: not a retransmission, unrecoverable.
        let forged = Frame::new(0, vec![1, 2, 3, 4, 5]);
        let result = bob.handle_frame(&forged);
        assert_eq!(result.unwrap_err(), SessionError::OffsetMismatch { expected: 5, actual: 0 });
        assert_eq!(bob.state(), SessionState::Faulted);
    }

    #[test]
    fn frame_ahead_of_cursor_faults() {
        let store = Arc::new(PadStore::new(Pad::new(vec![0u8; 32])));
        store.skip_to(10).unwrap();
        let mut session = TunnelSession::new(store, SessionConfig::default());
        session.start().unwrap();
        session.handle_offer(Offer::new(10)).unwrap();

        let frame = Frame::new(15, vec![0u8; 4]);
        let result = session.handle_frame(&frame);
        assert_eq!(result.unwrap_err(), SessionError::OffsetMismatch { expected: 10, actual: 15 });
        assert_eq!(session.state(), SessionState::Faulted);

        // Faulted sessions emit no further plaintext.
        assert_eq!(session.handle_frame(&frame).unwrap_err(), SessionError::Faulted);
    }

    #[test]
    fn empty_frame_at_cursor_is_ignored() {
        let mut session = session_over(vec![0u8; 8]);
        activate(&mut session);

        let actions = session.handle_frame(&Frame::new(0, Vec::new())).unwrap();
        assert!(actions.is_empty());
        assert_eq!(session.pad().offset(), 0);
    }

    #[test]
    fn exhaustion_closes_the_session() {
        let mut session = session_over(vec![0u8; 4]);
        activate(&mut session);

        session.send_plaintext(b"abcd").unwrap();
        let result = session.send_plaintext(b"e");
        assert!(matches!(result.unwrap_err(), SessionError::Pad(PadError::Exhausted { .. })));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.may_persist_cursor());
    }

    #[test]
    fn replay_frame_reuses_committed_pad() {
        let mut session = session_over((0u8..16).collect());
        activate(&mut session);

        let original = sent_frame(session.send_plaintext(b"hi").unwrap());

        // Retry after a transport failure: same bytes, no fresh reserve.
        let replayed = session.replay_frame(original.offset, b"hi").unwrap();
        assert_eq!(replayed, original);
        assert_eq!(session.pad().offset(), 2);

        // A range never reserved is refused.
        let result = session.replay_frame(10, b"hi");
        assert!(matches!(result.unwrap_err(), SessionError::Pad(PadError::OutOfRange { .. })));
    }

    #[test]
    fn fault_blocks_cursor_persistence() {
        let mut session = session_over(vec![0u8; 8]);
        activate(&mut session);

        session.handle_frame(&Frame::new(7, vec![0])).unwrap_err();
        assert_eq!(session.state(), SessionState::Faulted);
        assert!(!session.may_persist_cursor());

        // close() on a faulted session does not mask the fault.
        assert!(session.close("late close").is_empty());
        assert_eq!(session.state(), SessionState::Faulted);
    }

    #[test]
    fn graceful_close() {
        let mut session = session_over(vec![0u8; 8]);
        activate(&mut session);

        let actions = session.close("done");
        assert_eq!(actions, vec![SessionAction::Close { reason: "done".to_string() }]);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.may_persist_cursor());

        // Idempotent.
        assert!(session.close("again").is_empty());
    }

    #[test]
    fn replay_ledger_is_bounded() {
        let mut alice = session_over(vec![0u8; 64]);
        let bob_store = Arc::new(PadStore::new(Pad::new(vec![0u8; 64])));
        let mut bob = TunnelSession::new(bob_store, SessionConfig { replay_window: 2 });
        bob.start().unwrap();
        bob.handle_offer(Offer::new(0)).unwrap();
        activate(&mut alice);

        let first = sent_frame(alice.send_plaintext(b"aa").unwrap());
        bob.handle_frame(&first).unwrap();
        for chunk in [b"bb", b"cc"] {
            let frame = sent_frame(alice.send_plaintext(chunk).unwrap());
            bob.handle_frame(&frame).unwrap();
        }

        // The first frame has aged out of the 2-entry window; its replay can
        // no longer be verified as exact, so it faults.
        let result = bob.handle_frame(&first);
        assert!(matches!(result.unwrap_err(), SessionError::OffsetMismatch { .. }));
        assert_eq!(bob.state(), SessionState::Faulted);
    }
}
