use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::AuthUser, db, res, AppError, AppResult, AppState};

use super::{find_review, reviews_for_listing, Review};

#[derive(Debug, Deserialize)]
pub struct NewReview {
    pub rating: Option<serde_json::Value>,
    #[serde(default)]
    pub comment: String,
}

impl NewReview {
    /// Accepts the rating as a JSON number or a numeric string, since form
    /// libraries send both.
    fn validate(self) -> AppResult<(i64, String)> {
        let comment = self.comment.trim().to_owned();
        let rating = match self.rating {
            Some(serde_json::Value::Number(n)) => n.as_i64(),
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        let Some(rating) = rating.filter(|_| !comment.is_empty()) else {
            return Err(AppError::validation("Rating and comment are required"));
        };
        if !(1..=5).contains(&rating) {
            return Err(AppError::validation("Rating must be between 1 and 5"));
        }
        Ok((rating, comment))
    }
}

#[derive(Serialize)]
pub(crate) struct ReviewBody {
    review: Review,
}

#[derive(Serialize)]
pub(crate) struct ReviewsBody {
    reviews: Vec<Review>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn add(
    Path(listing_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    body: Result<Json<NewReview>, JsonRejection>,
) -> AppResult<Response> {
    let Json(review) = body?;
    let review = add_review(&db_pool, &listing_id, &user.id, review).await?;
    Ok(res::created(ReviewBody { review }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list(
    Path(listing_id): Path<String>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<res::Success<ReviewsBody>>> {
    Ok(res::ok(ReviewsBody {
        reviews: reviews_for_listing(&db_pool, &listing_id).await?,
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    Path(review_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<res::Success<res::Note>>> {
    delete_review(&db_pool, &review_id, &user.id).await?;
    Ok(res::note("Review deleted successfully"))
}

pub async fn add_review(
    db_pool: &SqlitePool,
    listing_id: &str,
    author_id: &str,
    review: NewReview,
) -> AppResult<Review> {
    let (rating, comment) = review.validate()?;

    let exists = sqlx::query("SELECT 1 FROM listings WHERE id=?")
        .bind(listing_id)
        .fetch_optional(db_pool)
        .await?
        .is_some();
    if !exists {
        return Err(AppError::not_found("Listing"));
    }

    let id = Uuid::now_v7().to_string();
    sqlx::query("INSERT INTO reviews (id,listing_id,author_id,rating,comment,created_at) VALUES (?,?,?,?,?,?)")
        .bind(&id)
        .bind(listing_id)
        .bind(author_id)
        .bind(rating)
        .bind(&comment)
        .bind(db::to_millis(db::now()))
        .execute(db_pool)
        .await?;

    tracing::info!(review_id = %id, listing_id, author_id, rating, "review added");
    find_review(db_pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Review"))
}

/// Only the author may delete. Removing the row also removes it from the
/// listing's review collection.
pub async fn delete_review(db_pool: &SqlitePool, review_id: &str, user_id: &str) -> AppResult<()> {
    let Some((author_id, listing_id)): Option<(String, String)> =
        sqlx::query_as("SELECT author_id,listing_id FROM reviews WHERE id=?")
            .bind(review_id)
            .fetch_optional(db_pool)
            .await?
    else {
        return Err(AppError::not_found("Review"));
    };

    if author_id != user_id {
        return Err(AppError::Forbidden("Unauthorized".to_owned()));
    }

    sqlx::query("DELETE FROM reviews WHERE id=?")
        .bind(review_id)
        .execute(db_pool)
        .await?;

    tracing::info!(review_id, %listing_id, "review deleted");
    Ok(())
}
