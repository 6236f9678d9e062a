use axum::{debug_handler, extract::{Path, State}, Json};
use sqlx::SqlitePool;

use crate::{auth::AuthUser, res, AppError, AppResult, AppState};

use super::{require_user, UserSummary};

#[debug_handler(state = AppState)]
pub(crate) async fn follow(
    Path(target_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<res::Success<res::Note>>> {
    follow_user(&db_pool, &user.id, &target_id).await?;
    Ok(res::note("User followed successfully"))
}

#[debug_handler(state = AppState)]
pub(crate) async fn unfollow(
    Path(target_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<res::Success<res::Note>>> {
    unfollow_user(&db_pool, &user.id, &target_id).await?;
    Ok(res::note("User unfollowed successfully"))
}

/// Adds the edge `actor -> target`. Following someone already followed is
/// rejected rather than silently accepted.
pub async fn follow_user(db_pool: &SqlitePool, actor_id: &str, target_id: &str) -> AppResult<()> {
    if actor_id == target_id {
        return Err(AppError::validation("You cannot follow yourself"));
    }
    require_user(db_pool, target_id).await?;
    require_user(db_pool, actor_id).await?;

    let inserted = sqlx::query("INSERT OR IGNORE INTO follows (follower_id,following_id) VALUES (?,?)")
        .bind(actor_id)
        .bind(target_id)
        .execute(db_pool)
        .await?
        .rows_affected();
    if inserted == 0 {
        return Err(AppError::validation("You are already following this user"));
    }

    tracing::info!(actor_id, target_id, "follow");
    Ok(())
}

pub async fn unfollow_user(db_pool: &SqlitePool, actor_id: &str, target_id: &str) -> AppResult<()> {
    if actor_id == target_id {
        return Err(AppError::validation("You cannot unfollow yourself"));
    }
    require_user(db_pool, target_id).await?;
    require_user(db_pool, actor_id).await?;

    let removed = sqlx::query("DELETE FROM follows WHERE follower_id=? AND following_id=?")
        .bind(actor_id)
        .bind(target_id)
        .execute(db_pool)
        .await?
        .rows_affected();
    if removed == 0 {
        return Err(AppError::validation("You are not following this user"));
    }

    tracing::info!(actor_id, target_id, "unfollow");
    Ok(())
}

pub async fn followers_of(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<UserSummary>> {
    Ok(
        sqlx::query_as(
            "SELECT u.id,u.name,u.email FROM follows f JOIN users u ON u.id=f.follower_id
             WHERE f.following_id=? ORDER BY u.name, u.id",
        )
        .bind(user_id)
        .fetch_all(db_pool)
        .await?
    )
}

pub async fn following_of(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<UserSummary>> {
    Ok(
        sqlx::query_as(
            "SELECT u.id,u.name,u.email FROM follows f JOIN users u ON u.id=f.following_id
             WHERE f.follower_id=? ORDER BY u.name, u.id",
        )
        .bind(user_id)
        .fetch_all(db_pool)
        .await?
    )
}
