use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{auth::AuthUser, db, res, AppError, AppResult, AppState};

use super::{followers_of, following_of, require_user, UserSummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Profile {
    id: String,
    name: String,
    email: String,
    followers: Vec<UserSummary>,
    following: Vec<UserSummary>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

#[derive(Serialize)]
pub(crate) struct ProfileBody {
    user: Profile,
}

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<res::Success<ProfileBody>>> {
    let Some((id, name, email, created_at)): Option<(String, String, String, i64)> =
        sqlx::query_as("SELECT id,name,email,created_at FROM users WHERE id=?")
            .bind(&user.id)
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(AppError::not_found("User"));
    };

    let followers = followers_of(&db_pool, &id).await?;
    let following = following_of(&db_pool, &id).await?;

    Ok(res::ok(ProfileBody {
        user: Profile {
            id,
            name,
            email,
            followers,
            following,
            created_at: db::from_millis(created_at),
        },
    }))
}

#[derive(Serialize)]
pub(crate) struct UserBody {
    user: UserSummary,
}

#[debug_handler(state = AppState)]
pub(crate) async fn user_by_id(
    Path(user_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    _user: AuthUser,
) -> AppResult<Json<res::Success<UserBody>>> {
    let user = require_user(&db_pool, &user_id).await?;
    Ok(res::ok(UserBody { user }))
}
