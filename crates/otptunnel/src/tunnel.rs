//! Async tunnel driver.
//!
//! Executes the actions of a [`TunnelSession`] against a real channel: any
//! `AsyncRead + AsyncWrite` pair (a TCP stream in the binary,
//! `tokio::io::duplex` in tests). This is a thin layer that moves bytes;
//! all protocol decisions stay in the sans-IO session.
//!
//! [`establish`] performs the blocking offset handshake, then spawns a
//! single driver task that owns the session and services both directions
//! with `select!`. Pad reservations are lock-free atomics inside the
//! session, so no lock is ever held across an await point; a cancelled
//! task wastes at most the reservation in flight, never reuses it.

use bytes::Bytes;
use otptunnel_core::{SessionAction, TunnelSession};
use otptunnel_proto::{FrameDecoder, Offer};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::error::TunnelError;

/// Read buffer size for the channel pump.
const READ_BUF_SIZE: usize = 8192;

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// Maximum accepted inbound ciphertext length per frame.
    pub max_frame_size: u32,
    /// Capacity of the application-facing mpsc channels.
    pub channel_capacity: usize,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self { max_frame_size: 64 * 1024, channel_capacity: 32 }
    }
}

/// Handle to an established tunnel.
///
/// Plaintext written with [`TunnelHandle::send`] is encrypted and framed by
/// the driver task; decrypted peer plaintext arrives via
/// [`TunnelHandle::recv`]. Dropping the handle (or calling
/// [`TunnelHandle::close`]) shuts the tunnel down gracefully.
pub struct TunnelHandle {
    /// Plaintext chunks to encrypt and send.
    to_peer: mpsc::Sender<Bytes>,
    /// Decrypted plaintext received from the peer.
    from_peer: mpsc::Receiver<Bytes>,
    /// Driver task; resolves to the final pad cursor.
    driver: JoinHandle<Result<u64, TunnelError>>,
}

impl TunnelHandle {
    /// Queue one plaintext chunk for encrypted transmission.
    ///
    /// # Errors
    ///
    /// - [`TunnelError::Closed`] if the driver task has ended
    pub async fn send(&self, plaintext: Bytes) -> Result<(), TunnelError> {
        self.to_peer.send(plaintext).await.map_err(|_| TunnelError::Closed)
    }

    /// Receive the next decrypted chunk from the peer.
    ///
    /// Returns `None` once the tunnel has shut down and all delivered
    /// plaintext has been drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.from_peer.recv().await
    }

    /// Shut down gracefully and wait for the driver to finish.
    ///
    /// Returns the final pad cursor on success, suitable for persistence.
    ///
    /// # Errors
    ///
    /// Any session, protocol, or channel error the driver ended with.
    pub async fn close(self) -> Result<u64, TunnelError> {
        drop(self.to_peer);
        drop(self.from_peer);
        self.driver.await.map_err(|_| TunnelError::Closed)?
    }
}

/// Perform the offset handshake over `channel` and spawn the driver.
///
/// Writes the local offer, reads the peer's, and lets the session decide
/// whether the offsets are compatible (adopting a higher peer offset,
/// refusing a stale one). Only after agreement does any application data
/// flow.
///
/// # Errors
///
/// - [`TunnelError::Channel`] on handshake I/O failure
/// - [`TunnelError::Session`] if the offers are incompatible
pub async fn establish<S>(
    channel: S,
    mut session: TunnelSession,
    config: TunnelConfig,
) -> Result<TunnelHandle, TunnelError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(channel);

    for action in session.start()? {
        if let SessionAction::SendOffer(offer) = action {
            writer.write_all(&offer.to_bytes()).await?;
            writer.flush().await?;
        }
    }

    let mut raw = [0u8; Offer::SIZE];
    reader.read_exact(&mut raw).await?;
    let peer_offer = Offer::from_bytes(&raw)?;
    session.handle_offer(peer_offer)?;

    info!(
        offset = session.pad().offset(),
        remaining = session.pad().remaining(),
        "tunnel established"
    );

    let (to_peer_tx, to_peer_rx) = mpsc::channel(config.channel_capacity);
    let (from_peer_tx, from_peer_rx) = mpsc::channel(config.channel_capacity);

    let driver =
        tokio::spawn(run_tunnel(reader, writer, session, config, to_peer_rx, from_peer_tx));

    Ok(TunnelHandle { to_peer: to_peer_tx, from_peer: from_peer_rx, driver })
}

/// Pump both directions until shutdown or failure.
///
/// Single task servicing application-to-channel and channel-to-application,
/// so the session needs no synchronization beyond the pad store's atomics.
/// Returns the final pad cursor.
async fn run_tunnel<R, W>(
    mut reader: R,
    mut writer: W,
    mut session: TunnelSession,
    config: TunnelConfig,
    mut outbound: mpsc::Receiver<Bytes>,
    inbound: mpsc::Sender<Bytes>,
) -> Result<u64, TunnelError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut decoder = FrameDecoder::with_max_frame_size(config.max_frame_size);
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        tokio::select! {
            chunk = outbound.recv() => match chunk {
                Some(plaintext) => {
                    let actions = session.send_plaintext(&plaintext).inspect_err(|err| {
                        error!(%err, "outbound send refused");
                    })?;
                    execute(actions, &mut writer, &inbound).await?;
                },
                None => {
                    // Application dropped the handle: graceful shutdown.
                    execute(session.close("local close"), &mut writer, &inbound).await?;
                    writer.shutdown().await?;
                    break;
                },
            },
            read = reader.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    // Peer EOF is the close signal in this wire format.
                    execute(session.close("peer closed"), &mut writer, &inbound).await?;
                    break;
                }

                decoder.feed(&buf[..n]);
                while let Some(frame) = decoder.next_frame()? {
                    let actions = session.handle_frame(&frame).inspect_err(|err| {
                        error!(%err, offset = frame.offset, "inbound frame rejected");
                    })?;

                    if actions.is_empty() && !frame.is_empty() {
                        warn!(offset = frame.offset, "discarded duplicate retransmission");
                    }

                    execute(actions, &mut writer, &inbound).await?;
                }
            },
        }
    }

    Ok(session.pad().offset())
}

/// Execute session actions: frames out, plaintext up, close reasons logged.
async fn execute<W: AsyncWrite + Unpin>(
    actions: Vec<SessionAction>,
    writer: &mut W,
    inbound: &mpsc::Sender<Bytes>,
) -> Result<(), TunnelError> {
    for action in actions {
        match action {
            SessionAction::SendFrame(frame) => {
                let mut wire = Vec::with_capacity(frame.encoded_len());
                frame.encode(&mut wire)?;
                writer.write_all(&wire).await?;
                writer.flush().await?;
                debug!(offset = frame.offset, len = frame.len(), "frame sent");
            },
            SessionAction::Deliver(plaintext) => {
                if inbound.send(plaintext).await.is_err() {
                    // Application stopped reading; plaintext is dropped but
                    // the pad bytes were already correctly consumed.
                    debug!("application receiver gone, discarding plaintext");
                }
            },
            SessionAction::SendOffer(offer) => {
                writer.write_all(&offer.to_bytes()).await?;
                writer.flush().await?;
            },
            SessionAction::Close { reason } => {
                info!(%reason, "tunnel closing");
            },
        }
    }

    Ok(())
}
