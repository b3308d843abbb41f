//! One-time-pad encrypted tunnel runtime.
//!
//! Bridges the sans-IO protocol core (`otptunnel-core`) to real I/O: an
//! async driver that multiplexes an application byte stream over any
//! ordered, reliable channel (`AsyncRead + AsyncWrite`), pad-file
//! provisioning, and durable cursor persistence for resumable sessions.
//!
//! # Architecture
//!
//! The protocol logic stays in [`otptunnel_core::TunnelSession`]; this
//! crate only executes the actions it returns. [`tunnel::establish`]
//! performs the offset handshake and spawns a driver task that owns the
//! session, returning a [`tunnel::TunnelHandle`] with plain
//! `send`/`recv`/`close` semantics over mpsc channels.
//!
//! Persistence is policy-driven ([`provision::ResumePolicy`]): a resumed
//! session loads the cursor recorded under the pad's fingerprint from a
//! [`storage::CursorStore`], so progress against a pad survives process
//! restarts without ever rewinding.

pub mod provision;
pub mod storage;
pub mod tunnel;

mod error;

pub use error::TunnelError;
