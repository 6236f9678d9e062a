use std::collections::HashSet;

use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{auth::AuthUser, res, users::{find_user, UserSummary}, AppResult, AppState};

use super::{ChatMessage, MessageRow, MESSAGE_COLUMNS};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub user: UserSummary,
    pub last_message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Serialize)]
pub(crate) struct ChatsBody {
    chats: Vec<ChatSummary>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn my_chats(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<res::Success<ChatsBody>>> {
    Ok(res::ok(ChatsBody {
        chats: user_chats(&db_pool, &user.id).await?,
    }))
}

/// One entry per counterpart, newest conversation first. Scans every
/// message the user took part in; there is no per-conversation index.
pub async fn user_chats(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<ChatSummary>> {
    let rows: Vec<MessageRow> = sqlx::query_as(&format!(
        "{MESSAGE_COLUMNS} WHERE sender_id=? OR receiver_id=? ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    let newest_first = rows.into_iter().map(ChatMessage::from);

    let mut chats = Vec::new();
    for (counterpart, last) in latest_per_counterpart(user_id, newest_first) {
        // counterparts whose account is gone are left out
        let Some(user) = find_user(db_pool, &counterpart).await? else {
            continue;
        };
        chats.push(ChatSummary {
            user,
            last_message: last.message,
            updated_at: last.created_at,
        });
    }
    Ok(chats)
}

/// Given messages newest first, keeps the first one seen per counterpart.
pub fn latest_per_counterpart(
    user_id: &str,
    newest_first: impl IntoIterator<Item = ChatMessage>,
) -> Vec<(String, ChatMessage)> {
    let mut seen = HashSet::new();
    newest_first
        .into_iter()
        .filter_map(|msg| {
            let counterpart = if msg.sender == user_id { msg.receiver.clone() } else { msg.sender.clone() };
            seen.insert(counterpart.clone()).then_some((counterpart, msg))
        })
        .collect()
}
