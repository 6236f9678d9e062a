//! Live push of chat messages to connected clients.
//!
//! A client opens one WebSocket per session and identifies itself with a
//! `join` frame. From then on the [`PresenceRegistry`] maps that user to the
//! connection, and the [`Relay`] can push `receiveMessage` events to it.
//! Delivery is best effort: a recipient who is not connected simply misses
//! the push, the message itself is already in the store.

mod connection;
mod presence;
mod relay;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use connection::{Connection, ConnectionState};
pub use presence::{ConnectionHandle, ConnectionId, PresenceRegistry};
pub use relay::Relay;

/// Frames a client may send, as `{"event": ..., "data": ...}`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Join(String),
}

/// Frames the server pushes to a client.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    ReceiveMessage(MessageNotice),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageNotice {
    pub sender: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
