//! `SQLite`-backed credential store.
//!
//! Users and login history persist in two tables. Active sessions are
//! process-local: on open, any login left without a logout time by a
//! previous process is closed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use stomp_core::ConnectionId;
use tracing::{debug, info, warn};

use crate::errors::{AuthError, Result};
use crate::history::LoginRecord;
use crate::sessions::{ClaimError, SessionTable};
use crate::{CredentialStore, LoginOutcome};

const PRAGMAS: &str = r"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
";

const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS users (
    username          TEXT PRIMARY KEY,
    password          TEXT NOT NULL,
    registration_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS logins (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL REFERENCES users(username),
    connection_id INTEGER NOT NULL,
    login_time    TEXT NOT NULL,
    logout_time   TEXT
);

CREATE INDEX IF NOT EXISTS idx_logins_username ON logins(username);
";

/// Credential store persisting users and login history in `SQLite`.
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
    sessions: SessionTable,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCredentialStore")
            .field("path", &self.path)
            .field("active_sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl SqliteCredentialStore {
    /// Open or create a store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self::init(conn, path.to_owned())?;
        info!(path = %path.display(), "credential database opened");
        Ok(store)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(CREATE_TABLES)?;
        let closed = conn.execute(
            "UPDATE logins SET logout_time = ?1 WHERE logout_time IS NULL",
            params![Utc::now().to_rfc3339()],
        )?;
        if closed > 0 {
            info!(closed, "closed stale login sessions");
        }
        Ok(Self {
            conn: Mutex::new(conn),
            sessions: SessionTable::new(),
            path,
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `username` currently holds a session.
    pub fn is_logged_in(&self, username: &str) -> bool {
        self.sessions.is_user_active(username)
    }

    /// Users with an active session, sorted.
    pub fn active_users(&self) -> Vec<String> {
        self.sessions.active_users()
    }

    /// All registered usernames, sorted.
    pub fn registered_users(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT username FROM users ORDER BY username")?;
        let users = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(users)
    }

    /// Login history of `username`, oldest first.
    pub fn login_history(&self, username: &str) -> Result<Vec<LoginRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT connection_id, login_time, logout_time FROM logins
             WHERE username = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![username], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(connection_id, login_time, logout_time)| {
                Ok(LoginRecord {
                    username: username.to_owned(),
                    connection_id: parse_connection_id(connection_id)?,
                    login_time: parse_timestamp("login_time", &login_time)?,
                    logout_time: logout_time
                        .as_deref()
                        .map(|raw| parse_timestamp("logout_time", raw))
                        .transpose()?,
                })
            })
            .collect()
    }

    fn try_login(
        &self,
        conn: &Connection,
        connection_id: ConnectionId,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome> {
        let now = Utc::now().to_rfc3339();
        let stored: Option<String> = conn
            .query_row(
                "SELECT password FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;

        let created = match stored {
            None => {
                let _ = conn.execute(
                    "INSERT INTO users (username, password, registration_date) VALUES (?1, ?2, ?3)",
                    params![username, password, now],
                )?;
                true
            }
            Some(ref existing) if existing == password => false,
            Some(_) => {
                debug!(%connection_id, username, "password mismatch");
                return Ok(LoginOutcome::WrongPassword);
            }
        };

        match self.sessions.claim(connection_id, username) {
            Ok(()) => {}
            Err(ClaimError::UserBusy) => return Ok(LoginOutcome::AlreadyLoggedIn),
            Err(ClaimError::ConnectionBusy) => return Ok(LoginOutcome::ClientAlreadyConnected),
        }

        if let Err(e) = conn.execute(
            "INSERT INTO logins (username, connection_id, login_time) VALUES (?1, ?2, ?3)",
            params![username, sql_id(connection_id), now],
        ) {
            let _ = self.sessions.release(connection_id);
            return Err(e.into());
        }
        info!(%connection_id, username, created, "user logged in");

        Ok(if created {
            LoginOutcome::AddedNewUser
        } else {
            LoginOutcome::LoggedIn
        })
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn login(&self, connection_id: ConnectionId, username: &str, password: &str) -> LoginOutcome {
        if self.sessions.is_connection_active(connection_id) {
            return LoginOutcome::ClientAlreadyConnected;
        }
        let conn = self.conn.lock();
        match self.try_login(&conn, connection_id, username, password) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%connection_id, username, %error, "credential lookup failed");
                LoginOutcome::StoreUnavailable
            }
        }
    }

    fn logout(&self, connection_id: ConnectionId) {
        let Some(username) = self.sessions.release(connection_id) else {
            return;
        };
        let conn = self.conn.lock();
        let result = conn.execute(
            "UPDATE logins SET logout_time = ?1
             WHERE username = ?2 AND connection_id = ?3 AND logout_time IS NULL",
            params![Utc::now().to_rfc3339(), username, sql_id(connection_id)],
        );
        match result {
            Ok(_) => info!(%connection_id, %username, "user logged out"),
            Err(error) => warn!(%connection_id, %username, %error, "failed to record logout"),
        }
    }
}

// Connection ids come from a process counter and stay far below i64::MAX.
fn sql_id(connection_id: ConnectionId) -> i64 {
    i64::try_from(connection_id.get()).unwrap_or(i64::MAX)
}

fn parse_connection_id(raw: i64) -> Result<ConnectionId> {
    u64::try_from(raw)
        .map(ConnectionId::new)
        .map_err(|_| AuthError::CorruptRow {
            column: "connection_id",
            detail: raw.to_string(),
        })
}

fn parse_timestamp(column: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| AuthError::CorruptRow {
            column,
            detail: raw.to_owned(),
        })
}
