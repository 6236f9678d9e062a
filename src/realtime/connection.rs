use super::{ClientEvent, ConnectionHandle, Relay};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket is open, no user bound yet.
    Connected,
    Identified(String),
    Closed,
}

/// Lifecycle bookkeeping for a single socket.
#[derive(Debug)]
pub struct Connection {
    handle: ConnectionHandle,
    state: ConnectionState,
}

impl Connection {
    pub fn new(handle: ConnectionHandle) -> Self {
        tracing::debug!(connection = handle.id(), "socket connected");
        Self { handle, state: ConnectionState::Connected }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn on_event(&mut self, relay: &Relay, event: ClientEvent) {
        if self.state == ConnectionState::Closed {
            return;
        }

        match event {
            ClientEvent::Join(user_id) => {
                if let ConnectionState::Identified(previous) = &self.state {
                    if *previous != user_id {
                        relay.disconnect(self.handle.id());
                    }
                }
                relay.identify(&user_id, self.handle.clone());
                tracing::info!(connection = self.handle.id(), %user_id, "socket identified");
                self.state = ConnectionState::Identified(user_id);
            }
        }
    }

    pub fn close(&mut self, relay: &Relay) {
        if self.state == ConnectionState::Closed {
            return;
        }

        let removed = relay.disconnect(self.handle.id());
        tracing::info!(connection = self.handle.id(), user_id = ?removed, "socket closed");
        self.state = ConnectionState::Closed;
    }
}
