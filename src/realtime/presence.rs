use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::ServerEvent;

pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Write side of one live socket. Cloning shares the same connection; two
/// handles are the same connection iff their ids match.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            tx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues an event for the socket without waiting. Returns `false` if the
    /// socket task is gone.
    pub fn push(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Which connection currently speaks for each user. Empty at start-up and
/// never persisted.
#[derive(Debug, Clone, Default)]
pub struct PresenceRegistry {
    entries: Arc<DashMap<String, ConnectionHandle>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `user_id` to `handle`, replacing whatever was bound before.
    pub fn register(&self, user_id: &str, handle: ConnectionHandle) {
        if let Some(previous) = self.entries.insert(user_id.to_owned(), handle) {
            tracing::debug!(user_id, previous = previous.id, "presence rebound");
        }
    }

    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.entries.get(user_id).map(|entry| entry.value().clone())
    }

    /// Drops the entry bound to this exact connection, if any. An entry that
    /// has since been rebound to a newer connection is left alone.
    pub fn unregister(&self, connection: ConnectionId) -> Option<String> {
        let mut removed = None;
        self.entries.retain(|user_id, handle| {
            if handle.id == connection {
                removed = Some(user_id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
