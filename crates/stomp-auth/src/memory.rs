//! In-memory credential store.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use stomp_core::ConnectionId;
use tracing::{debug, info};

use crate::history::{LoginHistory, LoginRecord};
use crate::sessions::{ClaimError, SessionTable};
use crate::{CredentialStore, LoginOutcome};

/// Users, sessions, and login history held in process memory.
///
/// Unknown users are registered on first login with the password they
/// supplied.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, String>,
    sessions: SessionTable,
    history: LoginHistory,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `username` has ever logged in.
    pub fn is_registered(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Whether `username` currently holds a session.
    pub fn is_logged_in(&self, username: &str) -> bool {
        self.sessions.is_user_active(username)
    }

    /// Users with an active session, sorted.
    pub fn active_users(&self) -> Vec<String> {
        self.sessions.active_users()
    }

    /// Login history of `username`, oldest first.
    pub fn login_history(&self, username: &str) -> Vec<LoginRecord> {
        self.history.for_user(username)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn login(&self, connection_id: ConnectionId, username: &str, password: &str) -> LoginOutcome {
        if self.sessions.is_connection_active(connection_id) {
            return LoginOutcome::ClientAlreadyConnected;
        }

        let created = match self.users.entry(username.to_owned()) {
            Entry::Vacant(slot) => {
                let _ = slot.insert(password.to_owned());
                true
            }
            Entry::Occupied(existing) => {
                if existing.get() != password {
                    debug!(%connection_id, username, "password mismatch");
                    return LoginOutcome::WrongPassword;
                }
                false
            }
        };

        match self.sessions.claim(connection_id, username) {
            Ok(()) => {}
            Err(ClaimError::UserBusy) => return LoginOutcome::AlreadyLoggedIn,
            Err(ClaimError::ConnectionBusy) => return LoginOutcome::ClientAlreadyConnected,
        }
        self.history.record_login(username, connection_id);
        info!(%connection_id, username, created, "user logged in");

        if created {
            LoginOutcome::AddedNewUser
        } else {
            LoginOutcome::LoggedIn
        }
    }

    fn logout(&self, connection_id: ConnectionId) {
        if let Some(username) = self.sessions.release(connection_id) {
            self.history.record_logout(&username, connection_id);
            info!(%connection_id, %username, "user logged out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(n: u64) -> ConnectionId {
        ConnectionId::new(n)
    }

    #[test]
    fn first_login_creates_user() {
        let store = InMemoryCredentialStore::new();
        assert_eq!(store.login(id(1), "alice", "pw"), LoginOutcome::AddedNewUser);
        assert!(store.is_registered("alice"));
        assert!(store.is_logged_in("alice"));
    }

    #[test]
    fn relogin_after_logout() {
        let store = InMemoryCredentialStore::new();
        let _ = store.login(id(1), "alice", "pw");
        store.logout(id(1));
        assert!(!store.is_logged_in("alice"));
        assert_eq!(store.login(id(2), "alice", "pw"), LoginOutcome::LoggedIn);
    }

    #[test]
    fn wrong_password() {
        let store = InMemoryCredentialStore::new();
        let _ = store.login(id(1), "alice", "pw");
        store.logout(id(1));
        assert_eq!(store.login(id(2), "alice", "nope"), LoginOutcome::WrongPassword);
        assert!(!store.is_logged_in("alice"));
    }

    #[test]
    fn user_logged_in_elsewhere() {
        let store = InMemoryCredentialStore::new();
        let _ = store.login(id(1), "alice", "pw");
        assert_eq!(store.login(id(2), "alice", "pw"), LoginOutcome::AlreadyLoggedIn);
    }

    #[test]
    fn wrong_password_checked_before_session() {
        let store = InMemoryCredentialStore::new();
        let _ = store.login(id(1), "alice", "pw");
        assert_eq!(store.login(id(2), "alice", "bad"), LoginOutcome::WrongPassword);
    }

    #[test]
    fn connection_already_logged_in() {
        let store = InMemoryCredentialStore::new();
        let _ = store.login(id(1), "alice", "pw");
        assert_eq!(
            store.login(id(1), "bob", "pw"),
            LoginOutcome::ClientAlreadyConnected
        );
        assert!(!store.is_registered("bob"));
    }

    #[test]
    fn logout_unknown_connection_is_noop() {
        let store = InMemoryCredentialStore::new();
        store.logout(id(42));
        store.logout(id(42));
        assert!(store.active_users().is_empty());
    }

    #[test]
    fn history_tracks_sessions() {
        let store = InMemoryCredentialStore::new();
        let _ = store.login(id(1), "alice", "pw");
        store.logout(id(1));
        let _ = store.login(id(2), "alice", "pw");
        let history = store.login_history("alice");
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_open());
        assert!(history[1].is_open());
        assert_eq!(history[1].connection_id, id(2));
    }

    #[test]
    fn concurrent_logins_same_user() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.login(id(n), "shared", "pw"))
            })
            .collect();
        let outcomes: Vec<LoginOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
        assert!(
            outcomes
                .iter()
                .filter(|o| !o.is_success())
                .all(|o| *o == LoginOutcome::AlreadyLoggedIn)
        );
    }
}
