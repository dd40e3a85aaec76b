//! Concurrent subscription registry.
//!
//! Three independently locked maps:
//!
//! - `handles`: connection → transport handle
//! - `connections`: connection → (destination → subscription id)
//! - `channels`: destination → (connection → subscription id)
//!
//! `connections` doubles as the registration marker: every registered
//! connection has an entry, possibly empty. Lock order is always
//! `connections` before `channels`; no code path holds a `channels` guard
//! while acquiring a `connections` guard. Subscribing links `channels` first,
//! unsubscribing and disconnecting unlink `connections` first. Destinations
//! with no remaining subscribers are dropped from `channels`.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use stomp_core::{ConnectionId, SubscriptionId};
use tracing::{debug, warn};

use crate::errors::{HandleError, RegistryError};

/// Transport-side endpoint of one connection.
pub trait ConnectionHandle: Send + Sync {
    /// Queue an encoded frame for delivery. Must not block. Returns `false`
    /// when the frame could not be queued.
    fn send(&self, frame: Bytes) -> bool;

    /// Ask the transport to close the connection once queued frames are flushed.
    fn close(&self) -> Result<(), HandleError>;
}

/// Thread-safe map of connections, their handles, and their subscriptions.
#[derive(Default)]
pub struct SubscriptionRegistry {
    handles: DashMap<ConnectionId, Arc<dyn ConnectionHandle>>,
    connections: DashMap<ConnectionId, HashMap<String, SubscriptionId>>,
    channels: DashMap<String, HashMap<ConnectionId, SubscriptionId>>,
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("connections", &self.connections.len())
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handle of a freshly accepted connection.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        handle: Arc<dyn ConnectionHandle>,
    ) -> Result<(), RegistryError> {
        match self.handles.entry(connection_id) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(connection_id)),
            Entry::Vacant(slot) => {
                let _ = self.connections.insert(connection_id, HashMap::new());
                let _ = slot.insert(handle);
                debug!(conn_id = %connection_id, "connection registered");
                Ok(())
            }
        }
    }

    /// Whether `connection_id` is currently registered.
    pub fn is_registered(&self, connection_id: ConnectionId) -> bool {
        self.handles.contains_key(&connection_id)
    }

    /// Queue `frame` on the connection's handle. `false` if the connection is
    /// unknown or the handle refused the frame.
    pub fn unicast_send(&self, connection_id: ConnectionId, frame: Bytes) -> bool {
        let Some(handle) = self.handles.get(&connection_id).map(|h| Arc::clone(h.value())) else {
            return false;
        };
        let sent = handle.send(frame);
        if !sent {
            warn!(conn_id = %connection_id, "failed to enqueue frame (queue full or closed)");
        }
        sent
    }

    /// Subscribe `connection_id` to `destination` under `subscription_id`.
    pub fn subscribe(
        &self,
        connection_id: ConnectionId,
        destination: &str,
        subscription_id: SubscriptionId,
    ) -> Result<(), RegistryError> {
        let Some(mut owned) = self.connections.get_mut(&connection_id) else {
            return Err(RegistryError::UnknownConnection(connection_id));
        };
        if owned.contains_key(destination) {
            return Err(RegistryError::AlreadySubscribed {
                connection_id,
                destination: destination.to_owned(),
            });
        }
        if owned.values().any(|id| *id == subscription_id) {
            return Err(RegistryError::SubscriptionIdInUse {
                connection_id,
                subscription_id,
            });
        }

        let _ = self
            .channels
            .entry(destination.to_owned())
            .or_default()
            .insert(connection_id, subscription_id);
        let _ = owned.insert(destination.to_owned(), subscription_id);
        Ok(())
    }

    /// Drop the subscription of `connection_id` carrying `subscription_id`.
    /// Returns the destination it referred to.
    pub fn unsubscribe(
        &self,
        connection_id: ConnectionId,
        subscription_id: SubscriptionId,
    ) -> Result<String, RegistryError> {
        let not_found = RegistryError::SubscriptionNotFound {
            connection_id,
            subscription_id,
        };
        let Some(mut owned) = self.connections.get_mut(&connection_id) else {
            return Err(not_found);
        };
        let Some(destination) = owned
            .iter()
            .find(|(_, id)| **id == subscription_id)
            .map(|(dest, _)| dest.clone())
        else {
            return Err(not_found);
        };

        let _ = owned.remove(&destination);
        self.unlink_channel(&destination, connection_id);
        Ok(destination)
    }

    /// Point-in-time copy of the subscribers of `destination`. Empty when
    /// nobody is subscribed.
    pub fn subscribers_of(&self, destination: &str) -> HashMap<ConnectionId, SubscriptionId> {
        self.channels
            .get(destination)
            .map(|subs| subs.value().clone())
            .unwrap_or_default()
    }

    /// Whether `connection_id` holds a subscription to `destination`.
    pub fn is_subscribed(&self, connection_id: ConnectionId, destination: &str) -> bool {
        self.connections
            .get(&connection_id)
            .is_some_and(|owned| owned.contains_key(destination))
    }

    /// Subscription id `connection_id` uses for `destination`, if subscribed.
    pub fn subscription_id(
        &self,
        connection_id: ConnectionId,
        destination: &str,
    ) -> Option<SubscriptionId> {
        self.connections
            .get(&connection_id)
            .and_then(|owned| owned.get(destination).copied())
    }

    /// Fully tear down `connection_id`: drop its handle and every
    /// subscription, then close the handle. Idempotent.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        let handle = self.handles.remove(&connection_id).map(|(_, h)| h);
        let owned = self.connections.remove(&connection_id).map(|(_, o)| o);

        for destination in owned.iter().flat_map(HashMap::keys) {
            self.unlink_channel(destination, connection_id);
        }

        if let Some(handle) = handle {
            if let Err(error) = handle.close() {
                warn!(conn_id = %connection_id, %error, "failed to close connection handle");
            }
            debug!(conn_id = %connection_id, "connection torn down");
        }
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.handles.len()
    }

    /// Number of destinations with at least one subscriber.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn unlink_channel(&self, destination: &str, connection_id: ConnectionId) {
        if let Some(mut subs) = self.channels.get_mut(destination) {
            let _ = subs.remove(&connection_id);
        }
        let _ = self.channels.remove_if(destination, |_, subs| subs.is_empty());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
