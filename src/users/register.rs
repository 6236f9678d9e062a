use axum::{debug_handler, extract::{rejection::JsonRejection, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    auth::{hash_password, TokenSigner, MIN_PASSWORD_LEN},
    db, res, AppError, AppResult, AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub(crate) struct TokenBody {
    token: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    State(tokens): State<TokenSigner>,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> AppResult<Json<res::Success<TokenBody>>> {
    let Json(RegisterBody { name, email, password }) = body?;
    let name = name.trim();
    let email = email.trim().to_lowercase();

    let exists = sqlx::query("SELECT 1 FROM users WHERE email=?")
        .bind(&email)
        .fetch_optional(&db_pool)
        .await?
        .is_some();
    if exists {
        return Err(AppError::validation("User already exists"));
    }

    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }

    let password_hash = hash_password(&password)?;
    let id = Uuid::now_v7().to_string();

    let inserted = sqlx::query("INSERT INTO users (id,name,email,password_hash,created_at) VALUES (?,?,?,?,?)")
        .bind(&id)
        .bind(name)
        .bind(&email)
        .bind(&password_hash)
        .bind(db::to_millis(db::now()))
        .execute(&db_pool)
        .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::validation("User already exists"));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %id, "user registered");
    Ok(res::ok(TokenBody { token: tokens.issue(&id) }))
}

/// Shape check only: one `@`, something before it, a dotted domain after it.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}
