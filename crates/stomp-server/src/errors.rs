//! Registry and connection handle error types.

use stomp_core::{ConnectionId, SubscriptionId};
use thiserror::Error;

/// Errors returned by [`SubscriptionRegistry`](crate::registry::SubscriptionRegistry).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// `register` called twice for the same connection.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// The connection was never registered or has been torn down.
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// The connection already holds a subscription to the destination.
    #[error("connection {connection_id} is already subscribed to {destination}")]
    AlreadySubscribed {
        /// Subscribing connection.
        connection_id: ConnectionId,
        /// Destination already joined.
        destination: String,
    },

    /// The connection already uses this subscription id for another destination.
    #[error("subscription id {subscription_id} is already in use on connection {connection_id}")]
    SubscriptionIdInUse {
        /// Subscribing connection.
        connection_id: ConnectionId,
        /// Id already taken.
        subscription_id: SubscriptionId,
    },

    /// No active subscription of the connection carries this id.
    #[error("connection {connection_id} has no subscription with id {subscription_id}")]
    SubscriptionNotFound {
        /// Unsubscribing connection.
        connection_id: ConnectionId,
        /// Unknown id.
        subscription_id: SubscriptionId,
    },
}

/// Errors raised when closing a transport handle.
#[derive(Debug, Error)]
pub enum HandleError {
    /// The handle had already been closed.
    #[error("connection handle already closed")]
    AlreadyClosed,
}

/// Errors raised while starting the TCP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Other I/O failure on the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
