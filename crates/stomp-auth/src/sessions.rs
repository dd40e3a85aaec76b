//! Active login sessions: one user per connection, one connection per user.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use stomp_core::ConnectionId;

/// Why a session could not be claimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimError {
    /// The connection already carries a user.
    ConnectionBusy,
    /// The user is logged in on another connection.
    UserBusy,
}

/// Mirrored connection↔user session maps.
///
/// `by_user` is the authority for "logged in elsewhere"; claiming takes its
/// entry lock before touching `by_connection`, release goes the other way
/// round without holding both at once.
#[derive(Debug, Default)]
pub struct SessionTable {
    by_connection: DashMap<ConnectionId, String>,
    by_user: DashMap<String, ConnectionId>,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `connection_id` currently carries a user.
    pub fn is_connection_active(&self, connection_id: ConnectionId) -> bool {
        self.by_connection.contains_key(&connection_id)
    }

    /// Whether `username` is logged in anywhere.
    pub fn is_user_active(&self, username: &str) -> bool {
        self.by_user.contains_key(username)
    }

    /// User logged in on `connection_id`, if any.
    pub fn user_of(&self, connection_id: ConnectionId) -> Option<String> {
        self.by_connection.get(&connection_id).map(|u| u.value().clone())
    }

    /// Bind `username` to `connection_id`.
    pub fn claim(&self, connection_id: ConnectionId, username: &str) -> Result<(), ClaimError> {
        if self.is_connection_active(connection_id) {
            return Err(ClaimError::ConnectionBusy);
        }
        match self.by_user.entry(username.to_owned()) {
            Entry::Occupied(_) => Err(ClaimError::UserBusy),
            Entry::Vacant(slot) => {
                let _ = self.by_connection.insert(connection_id, username.to_owned());
                let _ = slot.insert(connection_id);
                Ok(())
            }
        }
    }

    /// Unbind whatever user `connection_id` carried. Returns that user.
    pub fn release(&self, connection_id: ConnectionId) -> Option<String> {
        let (_, username) = self.by_connection.remove(&connection_id)?;
        let _ = self
            .by_user
            .remove_if(&username, |_, owner| *owner == connection_id);
        Some(username)
    }

    /// Users with an active session, sorted.
    pub fn active_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.by_user.iter().map(|e| e.key().clone()).collect();
        users.sort();
        users
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    /// Whether no session is active.
    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}
