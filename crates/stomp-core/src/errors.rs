//! Error types for frame decoding and protocol processing.
//!
//! - [`ProtocolError`]: every validation or lookup failure while handling a
//!   frame. Each one is surfaced to the offending client as a single `ERROR`
//!   frame and ends that connection.
//! - [`CodecError`]: byte-level failures while reassembling frames.

use thiserror::Error;

use crate::ids::SubscriptionId;

// ─────────────────────────────────────────────────────────────────────────────
// ProtocolError
// ─────────────────────────────────────────────────────────────────────────────

/// Fatal protocol error, grouped by the four error families.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A required header is missing or carries an invalid value.
    #[error("malformed frame received: {detail}")]
    MalformedFrame {
        /// Human-readable reason.
        detail: String,
    },

    /// Command issued out of order, duplicated, or not in the vocabulary.
    #[error("{message}: {detail}")]
    ProtocolViolation {
        /// Short message for the `message` header.
        message: &'static str,
        /// Human-readable reason.
        detail: String,
    },

    /// Request conflicts with subscription or login state.
    #[error("{message}: {detail}")]
    StateConflict {
        /// Short message for the `message` header.
        message: &'static str,
        /// Human-readable reason.
        detail: String,
    },

    /// The client does not accept the protocol version served here.
    #[error("version not supported: {detail}")]
    UnsupportedVersion {
        /// Human-readable reason.
        detail: String,
    },
}

impl ProtocolError {
    /// Missing or invalid header.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedFrame {
            detail: detail.into(),
        }
    }

    /// Command string outside the vocabulary.
    pub fn unknown_command(command: &str) -> Self {
        Self::ProtocolViolation {
            message: "Unknown command",
            detail: format!("The command '{command}' is not supported."),
        }
    }

    /// Second `CONNECT` on an already connected session.
    pub fn already_connected() -> Self {
        Self::ProtocolViolation {
            message: "Already connected",
            detail: "The client is already connected.".into(),
        }
    }

    /// Any command other than `CONNECT` before a successful `CONNECT`.
    pub fn not_connected(command: &str) -> Self {
        Self::ProtocolViolation {
            message: "Not connected",
            detail: format!("A {command} frame requires a successful CONNECT first."),
        }
    }

    /// Frame exceeded the configured size cap.
    pub fn frame_too_large(limit: usize) -> Self {
        Self::ProtocolViolation {
            message: "frame too large",
            detail: format!("Frames may not exceed {limit} bytes."),
        }
    }

    /// `SEND` to a destination the sender has not subscribed to.
    pub fn not_subscribed(destination: &str) -> Self {
        Self::StateConflict {
            message: "not subscribed",
            detail: format!("Client is not subscribed to destination {destination}"),
        }
    }

    /// Registry refused a subscription.
    pub fn subscription_failed(detail: impl Into<String>) -> Self {
        Self::StateConflict {
            message: "subscription failed",
            detail: detail.into(),
        }
    }

    /// No active subscription of this connection carries `id`.
    pub fn subscription_not_found(id: SubscriptionId) -> Self {
        Self::StateConflict {
            message: "subscription not found",
            detail: format!("No active subscription with id {id}."),
        }
    }

    /// Password did not match the stored one.
    pub fn wrong_password() -> Self {
        Self::StateConflict {
            message: "Wrong password",
            detail: "The password does not match the one on record.".into(),
        }
    }

    /// User already holds a session on another connection.
    pub fn user_already_logged_in(username: &str) -> Self {
        Self::StateConflict {
            message: "User already logged in",
            detail: format!("User {username} is already logged in on another connection."),
        }
    }

    /// This connection already carries a logged-in user.
    pub fn client_already_logged_in() -> Self {
        Self::StateConflict {
            message: "The client is already logged in, log out before trying again",
            detail: "Only one user may be logged in per connection.".into(),
        }
    }

    /// The credential store could not complete the login.
    pub fn login_failed() -> Self {
        Self::StateConflict {
            message: "login failed",
            detail: "The credential store is unavailable, try again later.".into(),
        }
    }

    /// `accept-version` does not include the served version.
    pub fn unsupported_version(accepted: &str) -> Self {
        Self::UnsupportedVersion {
            detail: format!(
                "Server supports version {}, client accepts {accepted}.",
                crate::PROTOCOL_VERSION
            ),
        }
    }

    /// Value for the `message` header of the `ERROR` frame.
    pub fn short_message(&self) -> &str {
        match self {
            Self::MalformedFrame { .. } => "malformed frame received",
            Self::ProtocolViolation { message, .. } | Self::StateConflict { message, .. } => {
                *message
            }
            Self::UnsupportedVersion { .. } => "version not supported",
        }
    }

    /// Human-readable detail placed in the `ERROR` body.
    pub fn detail(&self) -> &str {
        match self {
            Self::MalformedFrame { detail }
            | Self::ProtocolViolation { detail, .. }
            | Self::StateConflict { detail, .. }
            | Self::UnsupportedVersion { detail } => detail.as_str(),
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedFrame { .. } => "malformed_frame",
            Self::ProtocolViolation { .. } => "protocol_violation",
            Self::StateConflict { .. } => "state_conflict",
            Self::UnsupportedVersion { .. } => "unsupported_version",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CodecError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while decoding a byte stream into frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The in-progress frame grew past the configured limit.
    #[error("frame exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// Underlying transport error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn malformed_short_message() {
        let err = ProtocolError::malformed("SEND frame must contain a destination header.");
        assert_eq!(err.short_message(), "malformed frame received");
        assert_eq!(err.detail(), "SEND frame must contain a destination header.");
        assert_eq!(err.kind(), "malformed_frame");
    }

    #[test]
    fn unsupported_version_short_message() {
        let err = ProtocolError::unsupported_version("1.1");
        assert_eq!(err.short_message(), "version not supported");
        assert!(err.detail().contains("1.1"));
        assert_eq!(err.kind(), "unsupported_version");
    }

    #[test]
    fn violation_messages() {
        assert_eq!(ProtocolError::unknown_command("NACK").short_message(), "Unknown command");
        assert_eq!(ProtocolError::already_connected().short_message(), "Already connected");
        assert_eq!(ProtocolError::not_connected("SEND").short_message(), "Not connected");
        assert_matches!(
            ProtocolError::frame_too_large(8),
            ProtocolError::ProtocolViolation { message: "frame too large", .. }
        );
    }

    #[test]
    fn state_conflict_messages() {
        assert_eq!(ProtocolError::not_subscribed("/a").short_message(), "not subscribed");
        assert_eq!(
            ProtocolError::subscription_not_found(SubscriptionId::new(3)).short_message(),
            "subscription not found"
        );
        assert_eq!(ProtocolError::wrong_password().kind(), "state_conflict");
        assert_eq!(
            ProtocolError::user_already_logged_in("bob").short_message(),
            "User already logged in"
        );
    }

    #[test]
    fn display_combines_message_and_detail() {
        let err = ProtocolError::not_subscribed("/chat");
        assert_eq!(
            err.to_string(),
            "not subscribed: Client is not subscribed to destination /chat"
        );
    }

    #[test]
    fn codec_error_display() {
        let err = CodecError::FrameTooLarge { limit: 1024 };
        assert_eq!(err.to_string(), "frame exceeds the 1024 byte limit");
    }

    #[test]
    fn codec_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert_matches!(CodecError::from(io), CodecError::Io(_));
    }
}
