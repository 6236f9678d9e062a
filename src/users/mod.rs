mod follow;
mod login;
mod profile;
mod register;

use axum::{routing::{get, post}, Router};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{AppError, AppResult, AppState};

pub use follow::{follow_user, followers_of, following_of, unfollow_user};
pub use register::is_valid_email;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/profile", get(profile::profile))
        .route("/follow/{id}", post(follow::follow))
        .route("/unfollow/{id}", post(follow::unfollow))
        .route("/{id}", get(profile::user_by_id))
}

/// Public face of a user, as embedded in listings, reviews and chats.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

pub async fn find_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<Option<UserSummary>> {
    Ok(
        sqlx::query_as("SELECT id,name,email FROM users WHERE id=?")
            .bind(user_id)
            .fetch_optional(db_pool)
            .await?
    )
}

pub async fn require_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<UserSummary> {
    find_user(db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}
