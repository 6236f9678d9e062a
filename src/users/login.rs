use axum::{debug_handler, extract::{rejection::JsonRejection, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    auth::{verify_password, TokenSigner},
    res, AppError, AppResult, AppState,
};

use super::UserSummary;

#[derive(Debug, Deserialize)]
pub(crate) struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub(crate) struct LoginResponse {
    token: String,
    user: UserSummary,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    State(tokens): State<TokenSigner>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> AppResult<Json<res::Success<LoginResponse>>> {
    let Json(LoginBody { email, password }) = body?;
    let invalid = || AppError::Unauthorized("Invalid credentials".to_owned());

    let Some((id, name, email, password_hash)): Option<(String, String, String, String)> =
        sqlx::query_as("SELECT id,name,email,password_hash FROM users WHERE email=?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(invalid());
    };

    if !verify_password(&password, &password_hash) {
        return Err(invalid());
    }

    tracing::info!(user_id = %id, "user logged in");
    Ok(res::ok(LoginResponse {
        token: tokens.issue(&id),
        user: UserSummary { id, name, email },
    }))
}
