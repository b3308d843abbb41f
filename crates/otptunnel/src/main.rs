//! One-time-pad tunnel binary.
//!
//! Bridges stdin/stdout to a pad-encrypted TCP tunnel. Both peers must
//! hold byte-identical pad files.
//!
//! # Usage
//!
//! ```bash
//! # Listening side
//! otptunnel --listen 0.0.0.0:7000 --pad shared.pad --state cursors.redb
//!
//! # Connecting side
//! otptunnel --connect peer:7000 --pad shared.pad --state cursors.redb
//! ```

use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use otptunnel::{
    provision::{self, ResumePolicy},
    storage::{CursorStore, MemoryCursorStore, RedbCursorStore},
    tunnel::{self, TunnelConfig},
};
use otptunnel_core::{Pad, SessionConfig, TunnelSession};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// One-time-pad encrypted tunnel
#[derive(Parser, Debug)]
#[command(name = "otptunnel")]
#[command(about = "Pipe stdin/stdout through a one-time-pad encrypted TCP tunnel")]
#[command(version)]
struct Args {
    /// Listen for one inbound peer on this address
    #[arg(long, conflicts_with = "connect")]
    listen: Option<String>,

    /// Connect to a listening peer at this address
    #[arg(long)]
    connect: Option<String>,

    /// Path to the shared pad file
    #[arg(short, long)]
    pad: String,

    /// Path to the cursor database (omit to keep no durable cursor)
    #[arg(short, long)]
    state: Option<String>,

    /// Start at pad offset 0, ignoring any persisted cursor
    #[arg(long)]
    fresh: bool,

    /// Maximum accepted inbound ciphertext length per frame
    #[arg(long, default_value = "65536")]
    max_frame_size: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    if args.listen.is_none() && args.connect.is_none() {
        return Err("one of --listen or --connect is required".into());
    }

    let pad = provision::load_pad(&args.pad)?;
    let policy = if args.fresh { ResumePolicy::Fresh } else { ResumePolicy::Resume };

    match &args.state {
        Some(path) => {
            let cursors = RedbCursorStore::open(path)?;
            run(&args, pad, policy, &cursors).await
        },
        None => {
            if policy == ResumePolicy::Resume {
                tracing::warn!("no --state path given, cursor will not survive restarts");
            }
            run(&args, pad, ResumePolicy::Fresh, &MemoryCursorStore::new()).await
        },
    }
}

/// Open the pad store, establish the tunnel, pump stdio, persist on close.
async fn run<C: CursorStore>(
    args: &Args,
    pad: Pad,
    policy: ResumePolicy,
    cursors: &C,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(provision::open_store(pad, policy, cursors)?);

    tracing::info!(
        pad_id = %store.pad_id(),
        offset = store.offset(),
        remaining = store.remaining(),
        "pad opened"
    );

    let session = TunnelSession::new(Arc::clone(&store), SessionConfig::default());

    let stream = if let Some(addr) = &args.listen {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("listening on {}", listener.local_addr()?);
        let (stream, peer) = listener.accept().await?;
        tracing::info!(%peer, "peer connected");
        stream
    } else if let Some(addr) = &args.connect {
        tracing::info!("connecting to {addr}");
        TcpStream::connect(addr).await?
    } else {
        unreachable!("argument presence checked in main");
    };

    let config = TunnelConfig { max_frame_size: args.max_frame_size, ..TunnelConfig::default() };
    let mut handle = tunnel::establish(stream, session, config).await?;

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut buf = vec![0u8; 8192];

    loop {
        tokio::select! {
            read = stdin.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    break;
                }
                handle.send(Bytes::copy_from_slice(&buf[..n])).await?;
            },
            chunk = handle.recv() => match chunk {
                Some(plaintext) => {
                    stdout.write_all(&plaintext).await?;
                    stdout.flush().await?;
                },
                None => break,
            },
        }
    }

    let final_cursor = handle.close().await?;
    tracing::info!(cursor = final_cursor, "tunnel closed");

    // A faulted tunnel returns Err above and never reaches this point, so
    // the cursor recorded here is always confirmed-good.
    provision::persist_cursor(&store, cursors)?;

    Ok(())
}
