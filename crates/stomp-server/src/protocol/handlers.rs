//! One handler per client command.
//!
//! Handlers return `Err` for every validation or lookup failure; the caller
//! turns it into an `ERROR` frame and tears the connection down.

use metrics::counter;
use stomp_auth::LoginOutcome;
use stomp_core::{
    Command, ConnectionId, Frame, FrameCodec, PROTOCOL_VERSION, ProtocolError, SubscriptionId,
    outbound,
};
use tracing::{debug, info, warn};

use crate::context::ProtocolContext;
use crate::metrics::MESSAGES_DELIVERED_TOTAL;
use crate::protocol::session::Session;

/// Everything a handler may touch while processing one frame.
pub(crate) struct Exchange<'a> {
    pub(crate) connection_id: ConnectionId,
    pub(crate) session: &'a mut Session,
    pub(crate) ctx: &'a ProtocolContext,
    pub(crate) frame: &'a Frame,
}

impl Exchange<'_> {
    /// Queue a server frame for this connection.
    fn reply(&self, text: &str) {
        let _ = self
            .ctx
            .registry
            .unicast_send(self.connection_id, FrameCodec::encode(text));
    }

    /// Send a `RECEIPT` if the frame asked for one.
    fn acknowledge(&self) {
        if let Some(id) = self.frame.receipt() {
            self.reply(&outbound::receipt(id));
        }
    }

    fn require_connected(&self, command: Command) -> Result<(), ProtocolError> {
        if self.session.is_connected() {
            Ok(())
        } else {
            Err(ProtocolError::not_connected(command.as_str()))
        }
    }
}

/// Route `command` to its handler.
pub(crate) fn dispatch(command: Command, ex: &mut Exchange<'_>) -> Result<(), ProtocolError> {
    match command {
        Command::Connect => connect(ex),
        Command::Send => send(ex),
        Command::Subscribe => subscribe(ex),
        Command::Unsubscribe => unsubscribe(ex),
        Command::Disconnect => disconnect(ex),
    }
}

fn connect(ex: &mut Exchange<'_>) -> Result<(), ProtocolError> {
    if ex.session.is_connected() {
        return Err(ProtocolError::already_connected());
    }
    let frame = ex.frame;
    let (Some(accept_version), Some(_host), Some(login), Some(passcode)) = (
        frame.get("accept-version"),
        frame.get("host"),
        frame.get("login"),
        frame.get("passcode"),
    ) else {
        return Err(ProtocolError::malformed(
            "CONNECT frame must contain accept-version, host, login and passcode headers.",
        ));
    };

    if !accepts_version(accept_version) {
        return Err(ProtocolError::unsupported_version(accept_version));
    }

    match ex.ctx.credentials.login(ex.connection_id, login, passcode) {
        outcome @ (LoginOutcome::AddedNewUser | LoginOutcome::LoggedIn) => {
            ex.session.mark_connected(login);
            info!(
                conn_id = %ex.connection_id,
                username = login,
                new_user = outcome == LoginOutcome::AddedNewUser,
                "client connected"
            );
            ex.reply(&outbound::connected());
            Ok(())
        }
        LoginOutcome::WrongPassword => Err(ProtocolError::wrong_password()),
        LoginOutcome::AlreadyLoggedIn => Err(ProtocolError::user_already_logged_in(login)),
        LoginOutcome::ClientAlreadyConnected => Err(ProtocolError::client_already_logged_in()),
        LoginOutcome::StoreUnavailable => Err(ProtocolError::login_failed()),
    }
}

fn send(ex: &mut Exchange<'_>) -> Result<(), ProtocolError> {
    ex.require_connected(Command::Send)?;
    let Some(destination) = ex.frame.get("destination") else {
        return Err(ProtocolError::malformed(
            "SEND frame must contain a destination header.",
        ));
    };
    let registry = &ex.ctx.registry;
    if !registry.is_subscribed(ex.connection_id, destination) {
        return Err(ProtocolError::not_subscribed(destination));
    }

    let subscribers = registry.subscribers_of(destination);
    let message_id = ex.ctx.message_ids.next_id();
    let body = ex.frame.body_text();
    let mut delivered: u64 = 0;
    for (recipient, subscription) in &subscribers {
        let text = outbound::message(*subscription, destination, message_id, body);
        if registry.unicast_send(*recipient, FrameCodec::encode(&text)) {
            delivered += 1;
        } else {
            warn!(
                conn_id = %ex.connection_id,
                recipient = %recipient,
                destination,
                message_id,
                "message not delivered to subscriber"
            );
        }
    }
    counter!(MESSAGES_DELIVERED_TOTAL).increment(delivered);
    debug!(
        conn_id = %ex.connection_id,
        destination,
        message_id,
        recipients = subscribers.len(),
        delivered,
        "message published"
    );

    ex.acknowledge();
    Ok(())
}

fn subscribe(ex: &mut Exchange<'_>) -> Result<(), ProtocolError> {
    ex.require_connected(Command::Subscribe)?;
    let (Some(destination), Some(raw_id)) = (ex.frame.get("destination"), ex.frame.get("id"))
    else {
        return Err(ProtocolError::malformed(
            "SUBSCRIBE frame must contain destination and id headers.",
        ));
    };
    let subscription_id = parse_subscription_id(raw_id)?;

    ex.ctx
        .registry
        .subscribe(ex.connection_id, destination, subscription_id)
        .map_err(|e| ProtocolError::subscription_failed(e.to_string()))?;
    debug!(
        conn_id = %ex.connection_id,
        destination,
        subscription_id = %subscription_id,
        "subscribed"
    );

    ex.acknowledge();
    Ok(())
}

fn unsubscribe(ex: &mut Exchange<'_>) -> Result<(), ProtocolError> {
    ex.require_connected(Command::Unsubscribe)?;
    let Some(raw_id) = ex.frame.get("id") else {
        return Err(ProtocolError::malformed(
            "UNSUBSCRIBE frame must contain id header.",
        ));
    };
    let subscription_id = parse_subscription_id(raw_id)?;

    let destination = ex
        .ctx
        .registry
        .unsubscribe(ex.connection_id, subscription_id)
        .map_err(|_| ProtocolError::subscription_not_found(subscription_id))?;
    debug!(
        conn_id = %ex.connection_id,
        %destination,
        subscription_id = %subscription_id,
        "unsubscribed"
    );

    ex.acknowledge();
    Ok(())
}

fn disconnect(ex: &mut Exchange<'_>) -> Result<(), ProtocolError> {
    ex.require_connected(Command::Disconnect)?;
    ex.acknowledge();
    ex.session.mark_terminated();
    super::teardown(ex.connection_id, ex.ctx);
    info!(conn_id = %ex.connection_id, "client disconnected");
    Ok(())
}

/// Whether a comma-separated `accept-version` list includes the served version.
fn accepts_version(accept_version: &str) -> bool {
    accept_version
        .split(',')
        .any(|v| v.trim() == PROTOCOL_VERSION)
}

fn parse_subscription_id(raw: &str) -> Result<SubscriptionId, ProtocolError> {
    raw.parse()
        .map_err(|_| ProtocolError::malformed("Subscription id must be a number."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_list_matching() {
        assert!(accepts_version("1.2"));
        assert!(accepts_version("1.0,1.1,1.2"));
        assert!(accepts_version("1.1, 1.2"));
        assert!(!accepts_version("1.1"));
        assert!(!accepts_version("1.20"));
        assert!(!accepts_version(""));
    }

    #[test]
    fn subscription_id_parsing() {
        assert_eq!(parse_subscription_id("7").unwrap(), SubscriptionId::new(7));
        assert_eq!(parse_subscription_id("-3").unwrap(), SubscriptionId::new(-3));
        let err = parse_subscription_id("abc").unwrap_err();
        assert_eq!(err.short_message(), "malformed frame received");
        assert_eq!(err.detail(), "Subscription id must be a number.");
    }
}
