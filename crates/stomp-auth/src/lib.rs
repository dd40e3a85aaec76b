//! # stomp-auth
//!
//! Credential store used by the `CONNECT` handler.
//!
//! The protocol layer only sees the narrow [`CredentialStore`] contract:
//! `login` answers with a [`LoginOutcome`], `logout` releases whatever the
//! connection held. Two implementations are provided:
//!
//! - [`InMemoryCredentialStore`]: users and login history live in process memory
//! - [`SqliteCredentialStore`]: users and login history persist in `SQLite`
//!
//! Both enforce one session per user and one user per connection through a
//! shared [`SessionTable`].

#![deny(unsafe_code)]

pub mod errors;
pub mod history;
pub mod memory;
pub mod sessions;
pub mod sqlite;

pub use errors::{AuthError, Result};
pub use history::LoginRecord;
pub use memory::InMemoryCredentialStore;
pub use sessions::SessionTable;
pub use sqlite::SqliteCredentialStore;

use stomp_core::ConnectionId;

/// Result of a login attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Unknown user: it was created and logged in.
    AddedNewUser,
    /// Known user, password matched, now logged in.
    LoggedIn,
    /// Known user, password mismatch.
    WrongPassword,
    /// User already holds a session on another connection.
    AlreadyLoggedIn,
    /// This connection already carries a logged-in user.
    ClientAlreadyConnected,
    /// The backing store failed while deciding.
    StoreUnavailable,
}

impl LoginOutcome {
    /// Whether the connection is now logged in.
    pub fn is_success(self) -> bool {
        matches!(self, Self::AddedNewUser | Self::LoggedIn)
    }
}

/// Login/logout contract. Must be safe under concurrent invocation.
pub trait CredentialStore: Send + Sync {
    /// Attempt to log `username` in on `connection_id`.
    fn login(&self, connection_id: ConnectionId, username: &str, password: &str) -> LoginOutcome;

    /// Release the session held by `connection_id`. Idempotent.
    fn logout(&self, connection_id: ConnectionId);
}
