//! Per-connection protocol state machine.
//!
//! [`StompProtocol`] consumes decoded frame texts one at a time. Replies go
//! out through the registry to this connection's own handle. Every error is
//! fatal: the connection gets one `ERROR` frame, is logged out, and is torn
//! down. Frames arriving after termination are ignored.

pub(crate) mod handlers;
pub mod session;

use metrics::counter;
use stomp_core::{Command, ConnectionId, Frame, FrameCodec, ProtocolError, outbound};
use tracing::{debug, warn};

use crate::context::ProtocolContext;
use crate::metrics::{FRAMES_RECEIVED_TOTAL, PROTOCOL_ERRORS_TOTAL};
use handlers::Exchange;
pub use session::Session;

/// Protocol state machine for one connection.
#[derive(Debug)]
pub struct StompProtocol {
    connection_id: ConnectionId,
    session: Session,
    ctx: ProtocolContext,
}

impl StompProtocol {
    /// Start a protocol instance for a registered connection.
    pub fn new(connection_id: ConnectionId, ctx: ProtocolContext) -> Self {
        Self {
            connection_id,
            session: Session::new(),
            ctx,
        }
    }

    /// Connection this instance serves.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Current session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the transport should stop reading and close.
    pub fn should_terminate(&self) -> bool {
        self.session.should_terminate()
    }

    /// Handle one decoded frame text.
    pub fn process(&mut self, text: &str) {
        if self.session.should_terminate() {
            debug!(conn_id = %self.connection_id, "frame after termination ignored");
            return;
        }

        let frame = Frame::parse(text);
        let result = match frame.command().parse::<Command>() {
            Ok(command) => {
                counter!(FRAMES_RECEIVED_TOTAL, "command" => command.as_str()).increment(1);
                debug!(conn_id = %self.connection_id, %command, "frame received");
                let mut exchange = Exchange {
                    connection_id: self.connection_id,
                    session: &mut self.session,
                    ctx: &self.ctx,
                    frame: &frame,
                };
                handlers::dispatch(command, &mut exchange)
            }
            Err(unknown) => Err(ProtocolError::unknown_command(&unknown.0)),
        };

        if let Err(error) = result {
            self.fail(frame.receipt(), &error, text);
        }
    }

    /// The transport dropped a frame that exceeded `limit` bytes.
    pub fn reject_oversized(&mut self, limit: usize) {
        if self.session.should_terminate() {
            return;
        }
        self.fail(None, &ProtocolError::frame_too_large(limit), "");
    }

    /// The peer went away without `DISCONNECT`. Idempotent.
    pub fn connection_lost(&mut self) {
        if !self.session.should_terminate() {
            debug!(conn_id = %self.connection_id, "connection lost");
        }
        self.session.mark_terminated();
        teardown(self.connection_id, &self.ctx);
    }

    fn fail(&mut self, receipt: Option<&str>, error: &ProtocolError, original: &str) {
        warn!(
            conn_id = %self.connection_id,
            error_kind = error.kind(),
            short_message = error.short_message(),
            detail = error.detail(),
            "protocol error"
        );
        counter!(PROTOCOL_ERRORS_TOTAL, "kind" => error.kind()).increment(1);

        let text = outbound::error(receipt, error, original);
        let _ = self
            .ctx
            .registry
            .unicast_send(self.connection_id, FrameCodec::encode(&text));
        self.session.mark_terminated();
        teardown(self.connection_id, &self.ctx);
    }
}

/// Log the connection out and remove it from the registry.
pub(crate) fn teardown(connection_id: ConnectionId, ctx: &ProtocolContext) {
    ctx.credentials.logout(connection_id);
    ctx.registry.disconnect(connection_id);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
