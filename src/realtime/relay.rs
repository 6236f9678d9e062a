use time::OffsetDateTime;

use super::{ConnectionHandle, ConnectionId, MessageNotice, PresenceRegistry, ServerEvent};

/// Forwards already persisted messages to their recipient's live connection.
#[derive(Debug, Clone, Default)]
pub struct Relay {
    presence: PresenceRegistry,
}

impl Relay {
    pub fn new(presence: PresenceRegistry) -> Self {
        Self { presence }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn identify(&self, user_id: &str, handle: ConnectionHandle) {
        self.presence.register(user_id, handle);
    }

    pub fn disconnect(&self, connection: ConnectionId) -> Option<String> {
        self.presence.unregister(connection)
    }

    /// Pushes a `receiveMessage` to `receiver_id` if they are connected.
    /// Returns whether the push was handed to a live socket; an offline
    /// recipient is not an error.
    pub fn relay(&self, sender_id: &str, receiver_id: &str, message: &str, created_at: OffsetDateTime) -> bool {
        let Some(handle) = self.presence.lookup(receiver_id) else {
            tracing::debug!(sender_id, receiver_id, "recipient offline, live push skipped");
            return false;
        };

        let delivered = handle.push(ServerEvent::ReceiveMessage(MessageNotice {
            sender: sender_id.to_owned(),
            message: message.to_owned(),
            created_at,
        }));

        if delivered {
            tracing::debug!(sender_id, receiver_id, connection = handle.id(), "message relayed");
        } else {
            tracing::debug!(sender_id, receiver_id, connection = handle.id(), "recipient socket closed");
        }
        delivered
    }
}
