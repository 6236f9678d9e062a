mod review;

use axum::{routing::post, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{db, users::UserSummary, AppResult, AppState};

pub use review::{add_review, delete_review, NewReview};

pub fn router() -> Router<AppState> {
    // `{id}` is the listing for POST/GET and the review for DELETE
    Router::new().route(
        "/{id}",
        post(review::add).get(review::list).delete(review::delete),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub listing: String,
    pub author: UserSummary,
    pub rating: i64,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

type ReviewRow = (String, String, i64, String, i64, String, String, String);

const REVIEW_COLUMNS: &str = "SELECT r.id,r.listing_id,r.rating,r.comment,r.created_at,u.id,u.name,u.email
    FROM reviews r JOIN users u ON u.id=r.author_id";

fn from_row((id, listing, rating, comment, created_at, author_id, name, email): ReviewRow) -> Review {
    Review {
        id,
        listing,
        author: UserSummary { id: author_id, name, email },
        rating,
        comment,
        created_at: db::from_millis(created_at),
    }
}

/// A listing's reviews are exactly the review rows pointing at it, so a
/// deleted review can never linger in a listing.
pub async fn reviews_for_listing(db_pool: &SqlitePool, listing_id: &str) -> AppResult<Vec<Review>> {
    let rows: Vec<ReviewRow> =
        sqlx::query_as(&format!("{REVIEW_COLUMNS} WHERE r.listing_id=? ORDER BY r.created_at, r.rowid"))
            .bind(listing_id)
            .fetch_all(db_pool)
            .await?;
    Ok(rows.into_iter().map(from_row).collect())
}

pub async fn find_review(db_pool: &SqlitePool, review_id: &str) -> AppResult<Option<Review>> {
    let row: Option<ReviewRow> = sqlx::query_as(&format!("{REVIEW_COLUMNS} WHERE r.id=?"))
        .bind(review_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(row.map(from_row))
}
