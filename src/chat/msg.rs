use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::AuthUser, db, realtime::Relay, res, users::require_user, AppError, AppResult, AppState};

use super::{ChatMessage, MessageRow, MESSAGE_COLUMNS};

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessageBody {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
pub(crate) struct MessageSent {
    message: &'static str,
    data: ChatMessage,
}

#[derive(Serialize)]
pub(crate) struct ConversationBody {
    messages: Vec<ChatMessage>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    Path(receiver_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(relay): State<Relay>,
    user: AuthUser,
    body: Result<Json<SendMessageBody>, JsonRejection>,
) -> AppResult<Response> {
    let Json(SendMessageBody { message }) = body?;
    let data = send_message(&db_pool, &relay, &user.id, &receiver_id, message).await?;
    Ok(res::created(MessageSent { message: "Message sent", data }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_conversation(
    Path(other_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<res::Success<ConversationBody>>> {
    Ok(res::ok(ConversationBody {
        messages: conversation(&db_pool, &user.id, &other_id).await?,
    }))
}

/// Stores the message, then offers it to the relay. The live push is best
/// effort and never affects the result: once stored, the send succeeded.
pub async fn send_message(
    db_pool: &SqlitePool,
    relay: &Relay,
    sender_id: &str,
    receiver_id: &str,
    message: String,
) -> AppResult<ChatMessage> {
    if message.trim().is_empty() {
        return Err(AppError::validation("Message is required"));
    }
    require_user(db_pool, receiver_id).await?;

    let stored = ChatMessage {
        id: Uuid::now_v7().to_string(),
        sender: sender_id.to_owned(),
        receiver: receiver_id.to_owned(),
        message,
        created_at: db::now(),
    };

    sqlx::query("INSERT INTO messages (id,sender_id,receiver_id,message,created_at) VALUES (?,?,?,?,?)")
        .bind(&stored.id)
        .bind(&stored.sender)
        .bind(&stored.receiver)
        .bind(&stored.message)
        .bind(db::to_millis(stored.created_at))
        .execute(db_pool)
        .await?;

    let delivered = relay.relay(&stored.sender, &stored.receiver, &stored.message, stored.created_at);
    tracing::info!(message_id = %stored.id, sender_id, receiver_id, delivered, "message sent");

    Ok(stored)
}

/// Every message exchanged between the two users, oldest first.
pub async fn conversation(db_pool: &SqlitePool, user_id: &str, other_id: &str) -> AppResult<Vec<ChatMessage>> {
    let rows: Vec<MessageRow> = sqlx::query_as(&format!(
        "{MESSAGE_COLUMNS} WHERE (sender_id=? AND receiver_id=?) OR (sender_id=? AND receiver_id=?)
         ORDER BY created_at, rowid"
    ))
    .bind(user_id)
    .bind(other_id)
    .bind(other_id)
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    Ok(rows.into_iter().map(ChatMessage::from).collect())
}
