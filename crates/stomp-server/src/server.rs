//! `StompServer`: TCP listener accepting STOMP connections.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::counter;
use stomp_core::ConnectionId;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::context::ProtocolContext;
use crate::errors::ServerError;
use crate::metrics::CONNECTIONS_REFUSED_TOTAL;
use crate::transport::run_connection;

/// Pause after a failed `accept` so descriptor exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bound TCP listener plus the shared protocol context.
pub struct StompServer {
    listener: TcpListener,
    config: ServerConfig,
    ctx: ProtocolContext,
    next_connection_id: AtomicU64,
}

impl StompServer {
    /// Bind the listener described by `config`.
    pub async fn bind(config: ServerConfig, ctx: ProtocolContext) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        info!(addr = %listener.local_addr()?, "STOMP server listening");
        Ok(Self {
            listener,
            config,
            ctx,
            next_connection_id: AtomicU64::new(0),
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shared registry, credential store, and message-id sequence.
    pub fn context(&self) -> &ProtocolContext {
        &self.ctx
    }

    /// Accept connections until `shutdown` fires, then wait for every
    /// connection task to wind down.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        let limits = self.config.limits();

        loop {
            let accepted = tokio::select! {
                () = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };
            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(error) => {
                    warn!(%error, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            tasks.retain(|task| !task.is_finished());
            if tasks.len() >= self.config.max_connections {
                warn!(%peer, limit = self.config.max_connections, "connection limit reached, refusing");
                counter!(CONNECTIONS_REFUSED_TOTAL).increment(1);
                drop(stream);
                continue;
            }

            let connection_id = self.next_connection_id();
            tasks.push(tokio::spawn(run_connection(
                stream,
                connection_id,
                self.ctx.clone(),
                limits,
                shutdown.clone(),
            )));
        }

        info!(open = tasks.len(), "listener stopped, closing connections");
        let _ = futures::future::join_all(tasks).await;
        info!("STOMP server stopped");
    }

    fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
