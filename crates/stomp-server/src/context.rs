//! Shared dependencies injected into every protocol instance.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use stomp_auth::CredentialStore;

use crate::registry::SubscriptionRegistry;

/// Process-wide source of `message-id` values. Strictly increasing, first id is 1.
#[derive(Debug, Default)]
pub struct MessageIdSequence {
    last: AtomicU64,
}

impl MessageIdSequence {
    /// Create a sequence whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next id.
    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Last id handed out, `0` if none.
    pub fn last_id(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Registry, credential store, and message-id sequence shared by all
/// connections.
#[derive(Clone)]
pub struct ProtocolContext {
    /// Subscription registry.
    pub registry: Arc<SubscriptionRegistry>,
    /// Credential store consulted by `CONNECT`.
    pub credentials: Arc<dyn CredentialStore>,
    /// Message-id source for `SEND` fan-out.
    pub message_ids: Arc<MessageIdSequence>,
}

impl ProtocolContext {
    /// Fresh registry and sequence around `credentials`.
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            registry: Arc::new(SubscriptionRegistry::new()),
            credentials,
            message_ids: Arc::new(MessageIdSequence::new()),
        }
    }
}

impl std::fmt::Debug for ProtocolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolContext")
            .field("registry", &self.registry)
            .field("message_ids", &self.message_ids)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stomp_auth::InMemoryCredentialStore;

    #[test]
    fn first_id_is_one() {
        let ids = MessageIdSequence::new();
        assert_eq!(ids.last_id(), 0);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.last_id(), 2);
    }

    #[test]
    fn ids_unique_across_threads() {
        let ids = Arc::new(MessageIdSequence::new());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..1000).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u64> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 8000);
        assert_eq!(all.first(), Some(&1));
        assert_eq!(all.last(), Some(&8000));
    }

    #[test]
    fn clones_share_state() {
        let ctx = ProtocolContext::new(Arc::new(InMemoryCredentialStore::new()));
        let other = ctx.clone();
        let _ = ctx.message_ids.next_id();
        assert_eq!(other.message_ids.last_id(), 1);
        assert!(Arc::ptr_eq(&ctx.registry, &other.registry));
    }
}
