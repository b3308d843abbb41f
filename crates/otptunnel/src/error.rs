//! Error type for the tunnel runtime.
//!
//! Wraps the layered core errors and adds the runtime-only concerns:
//! channel I/O, cursor storage, and configuration. Channel failures close
//! the session without internal retry; the only tolerated retransmission
//! handling lives in the session's duplicate-frame path.

use otptunnel_core::SessionError;
use otptunnel_proto::ProtocolError;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by the tunnel runtime.
#[derive(Error, Debug)]
pub enum TunnelError {
    /// I/O failure on the underlying channel.
    #[error("channel error: {0}")]
    Channel(#[from] std::io::Error),

    /// Protocol state machine failure (fault, exhaustion, bad handshake).
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Malformed wire data from the peer.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Cursor persistence failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid runtime configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The tunnel task ended before the operation completed.
    #[error("tunnel closed")]
    Closed,
}
