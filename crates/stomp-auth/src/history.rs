//! Login history records.
//!
//! The log is bounded: once it holds `limit` records the oldest are evicted.
//! Open sessions are indexed by connection, so closing one does not scan
//! the log.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use stomp_core::ConnectionId;

/// Records kept by [`LoginHistory::new`].
pub const DEFAULT_HISTORY_LIMIT: usize = 10_000;

/// One login session, open until `logout_time` is stamped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRecord {
    /// User that logged in.
    pub username: String,
    /// Connection the session was bound to.
    pub connection_id: ConnectionId,
    /// When the login succeeded.
    pub login_time: DateTime<Utc>,
    /// When the session ended, if it has.
    pub logout_time: Option<DateTime<Utc>>,
}

impl LoginRecord {
    /// Whether the session is still open.
    pub fn is_open(&self) -> bool {
        self.logout_time.is_none()
    }
}

#[derive(Debug, Default)]
struct HistoryLog {
    records: VecDeque<LoginRecord>,
    /// Sequence number of `records[0]`.
    first_seq: u64,
    /// Sequence number of each connection's open record.
    open: HashMap<ConnectionId, u64>,
}

impl HistoryLog {
    fn get_mut(&mut self, seq: u64) -> Option<&mut LoginRecord> {
        let index = usize::try_from(seq.checked_sub(self.first_seq)?).ok()?;
        self.records.get_mut(index)
    }
}

/// Bounded in-memory login log.
#[derive(Debug)]
pub struct LoginHistory {
    log: Mutex<HistoryLog>,
    limit: usize,
}

impl LoginHistory {
    /// Create an empty log keeping [`DEFAULT_HISTORY_LIMIT`] records.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create an empty log keeping at most `limit` records (at least 1).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            log: Mutex::new(HistoryLog::default()),
            limit: limit.max(1),
        }
    }

    /// Append an open record, evicting the oldest past the limit.
    pub fn record_login(&self, username: &str, connection_id: ConnectionId) {
        let mut log = self.log.lock();
        let seq = log.first_seq + log.records.len() as u64;
        log.records.push_back(LoginRecord {
            username: username.to_owned(),
            connection_id,
            login_time: Utc::now(),
            logout_time: None,
        });
        let _ = log.open.insert(connection_id, seq);

        while log.records.len() > self.limit {
            let _ = log.records.pop_front();
            log.first_seq += 1;
        }
    }

    /// Close the open record for this user/connection pair.
    pub fn record_logout(&self, username: &str, connection_id: ConnectionId) {
        let mut guard = self.log.lock();
        let log = &mut *guard;
        let Some(&seq) = log.open.get(&connection_id) else {
            return;
        };
        let Some(record) = log.get_mut(seq) else {
            // Evicted while open.
            let _ = log.open.remove(&connection_id);
            return;
        };
        if record.username != username {
            return;
        }
        record.logout_time = Some(Utc::now());
        let _ = log.open.remove(&connection_id);
    }

    /// All retained records of `username`, oldest first.
    pub fn for_user(&self, username: &str) -> Vec<LoginRecord> {
        self.log
            .lock()
            .records
            .iter()
            .filter(|r| r.username == username)
            .cloned()
            .collect()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.log.lock().records.len()
    }

    /// Whether no records are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of sessions still open.
    pub fn open_count(&self) -> usize {
        self.log.lock().open.len()
    }
}

impl Default for LoginHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_then_logout_closes_record() {
        let history = LoginHistory::new();
        history.record_login("alice", ConnectionId::new(1));
        let open = history.for_user("alice");
        assert_eq!(open.len(), 1);
        assert!(open[0].is_open());
        assert_eq!(history.open_count(), 1);

        history.record_logout("alice", ConnectionId::new(1));
        let closed = history.for_user("alice");
        assert!(!closed[0].is_open());
        assert!(closed[0].logout_time.unwrap() >= closed[0].login_time);
        assert_eq!(history.open_count(), 0);
    }

    #[test]
    fn logout_only_touches_matching_connection() {
        let history = LoginHistory::new();
        history.record_login("alice", ConnectionId::new(1));
        history.record_logout("alice", ConnectionId::new(2));
        history.record_logout("bob", ConnectionId::new(1));
        assert!(history.for_user("alice")[0].is_open());
        assert_eq!(history.open_count(), 1);
    }

    #[test]
    fn records_are_per_user() {
        let history = LoginHistory::new();
        history.record_login("alice", ConnectionId::new(1));
        history.record_login("bob", ConnectionId::new(2));
        history.record_login("alice", ConnectionId::new(3));
        assert_eq!(history.for_user("alice").len(), 2);
        assert_eq!(history.for_user("bob").len(), 1);
        assert!(history.for_user("carol").is_empty());
    }

    #[test]
    fn relogin_on_same_connection_closes_latest_record() {
        let history = LoginHistory::new();
        history.record_login("alice", ConnectionId::new(1));
        history.record_logout("alice", ConnectionId::new(1));
        history.record_login("alice", ConnectionId::new(1));
        history.record_logout("alice", ConnectionId::new(1));

        let records = history.for_user("alice");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.is_open()));
    }

    #[test]
    fn oldest_records_are_evicted_past_limit() {
        let history = LoginHistory::with_limit(3);
        for n in 1..=5 {
            history.record_login("alice", ConnectionId::new(n));
            history.record_logout("alice", ConnectionId::new(n));
        }

        let kept: Vec<u64> = history
            .for_user("alice")
            .iter()
            .map(|r| r.connection_id.get())
            .collect();
        assert_eq!(kept, vec![3, 4, 5]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.open_count(), 0);
    }

    #[test]
    fn logout_of_evicted_session_drops_index_entry() {
        let history = LoginHistory::with_limit(2);
        history.record_login("alice", ConnectionId::new(1));
        history.record_login("bob", ConnectionId::new(2));
        history.record_login("carol", ConnectionId::new(3));
        assert!(history.for_user("alice").is_empty());
        assert_eq!(history.open_count(), 3);

        history.record_logout("alice", ConnectionId::new(1));
        assert_eq!(history.open_count(), 2);

        history.record_logout("carol", ConnectionId::new(3));
        assert!(!history.for_user("carol")[0].is_open());
        assert!(history.for_user("bob")[0].is_open());
    }
}
