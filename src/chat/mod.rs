mod chats;
mod msg;
pub mod ws;

use axum::{routing::{get, post}, Router};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{db, AppState};

pub use chats::{latest_per_counterpart, user_chats, ChatSummary};
pub use msg::{conversation, send_message};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send/{id}", post(msg::send))
        .route("/conversation/{id}", get(msg::get_conversation))
        .route("/my-chats", get(chats::my_chats))
}

/// A direct message. Never edited or deleted once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub(crate) type MessageRow = (String, String, String, String, i64);

pub(crate) const MESSAGE_COLUMNS: &str = "SELECT id,sender_id,receiver_id,message,created_at FROM messages";

impl From<MessageRow> for ChatMessage {
    fn from((id, sender, receiver, message, created_at): MessageRow) -> Self {
        ChatMessage {
            id,
            sender,
            receiver,
            message,
            created_at: db::from_millis(created_at),
        }
    }
}
