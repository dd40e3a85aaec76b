//! Connection lifecycle: one accepted socket from registration through teardown.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures::StreamExt;
use metrics::{counter, gauge};
use stomp_core::{CodecError, ConnectionId, FrameCodec};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ConnectionLimits;
use crate::context::ProtocolContext;
use crate::metrics::{CONNECTIONS_ACTIVE, CONNECTIONS_TOTAL};
use crate::protocol::StompProtocol;

use super::connection::TcpConnectionHandle;

/// Drive one connection until `DISCONNECT`, a protocol error, peer closure,
/// or server shutdown.
///
/// 1. Registers a [`TcpConnectionHandle`] for the socket
/// 2. Spawns the writer task draining the handle's queue
/// 3. Feeds every decoded frame to a [`StompProtocol`]
/// 4. Tears the connection down and waits for the writer to flush
#[instrument(skip_all, fields(conn_id = %connection_id))]
pub async fn run_connection(
    stream: TcpStream,
    connection_id: ConnectionId,
    ctx: ProtocolContext,
    limits: ConnectionLimits,
    shutdown: CancellationToken,
) {
    let peer = stream.peer_addr().ok();
    let (reader, writer) = stream.into_split();

    let (tx, rx) = mpsc::channel::<Bytes>(limits.send_queue_capacity);
    let closed = CancellationToken::new();
    let handle = Arc::new(TcpConnectionHandle::new(tx, closed.clone()));
    if let Err(error) = ctx.registry.register(connection_id, handle.clone()) {
        warn!(%error, "connection registration failed");
        return;
    }

    let started = Instant::now();
    info!(?peer, "connection opened");
    counter!(CONNECTIONS_TOTAL).increment(1);
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);

    let writer_task = tokio::spawn(write_frames(writer, rx, closed.clone()));

    let codec = match limits.max_frame_size {
        Some(limit) => FrameCodec::with_max_frame_size(limit),
        None => FrameCodec::new(),
    };
    let mut frames = FramedRead::new(reader, codec);
    let mut protocol = StompProtocol::new(connection_id, ctx);

    loop {
        tokio::select! {
            biased;
            () = closed.cancelled() => break,
            () = shutdown.cancelled() => {
                info!("server shutting down, closing connection");
                break;
            }
            next = frames.next() => match next {
                Some(Ok(text)) => {
                    protocol.process(&text);
                    if protocol.should_terminate() {
                        break;
                    }
                }
                Some(Err(CodecError::FrameTooLarge { limit })) => {
                    protocol.reject_oversized(limit);
                    break;
                }
                Some(Err(CodecError::Io(error))) => {
                    debug!(%error, "read failed");
                    break;
                }
                None => {
                    debug!("peer closed the connection");
                    break;
                }
            }
        }
    }

    if !protocol.should_terminate() {
        protocol.connection_lost();
    }
    if let Err(error) = writer_task.await {
        warn!(%error, "writer task failed");
    }

    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
    info!(
        dropped_frames = handle.dropped_frames(),
        duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "connection closed"
    );
}

/// Write queued frames until the handle is closed, then flush what is left
/// and shut the socket down.
async fn write_frames(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Bytes>,
    closed: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            frame = rx.recv() => match frame {
                Some(bytes) => {
                    if let Err(error) = writer.write_all(&bytes).await {
                        debug!(%error, "write failed");
                        return;
                    }
                }
                None => break,
            },
            () = closed.cancelled() => {
                while let Ok(bytes) = rx.try_recv() {
                    if let Err(error) = writer.write_all(&bytes).await {
                        debug!(%error, "write failed while flushing");
                        return;
                    }
                }
                break;
            }
        }
    }
    let _ = writer.shutdown().await;
}
