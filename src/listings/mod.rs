mod edit;
mod form;
mod listing;
mod new;
mod search;

use axum::{extract::DefaultBodyLimit, routing::{get, post, put}, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{
    db,
    reviews::{reviews_for_listing, Review},
    users::{require_user, UserSummary},
    AppError, AppResult, AppState,
};

pub use search::{search_listings, ListingFilter, Page, Pagination};

/// A listing carries at most this many photos.
pub const MAX_IMAGES: usize = 4;

const UPLOAD_LIMIT: usize = 24 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(new::add_listing))
        .route("/list", get(search::list))
        .route("/user/me", get(listing::my_listings))
        .route("/{id}/edit", put(edit::edit_listing))
        .route("/{id}", get(listing::single_listing).delete(listing::delete_listing))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub country: String,
    pub location: String,
    pub images: Vec<String>,
    pub owner: UserSummary,
    pub reviews: Vec<Review>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ListingRow {
    id: String,
    owner_id: String,
    title: String,
    description: String,
    category: String,
    country: String,
    location: String,
    updated_at: i64,
}

pub(crate) const LISTING_COLUMNS: &str =
    "SELECT id,owner_id,title,description,category,country,location,updated_at FROM listings";

/// Fills in images, owner and reviews for rows read from `listings`.
pub(crate) async fn hydrate(db_pool: &SqlitePool, rows: Vec<ListingRow>) -> AppResult<Vec<Listing>> {
    let mut listings = Vec::with_capacity(rows.len());
    for row in rows {
        let images: Vec<(String,)> =
            sqlx::query_as("SELECT url FROM listing_images WHERE listing_id=? ORDER BY position")
                .bind(&row.id)
                .fetch_all(db_pool)
                .await?;

        listings.push(Listing {
            owner: require_user(db_pool, &row.owner_id).await?,
            reviews: reviews_for_listing(db_pool, &row.id).await?,
            images: images.into_iter().map(|(url,)| url).collect(),
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            country: row.country,
            location: row.location,
            updated_at: db::from_millis(row.updated_at),
        });
    }
    Ok(listings)
}

pub async fn find_listing(db_pool: &SqlitePool, listing_id: &str) -> AppResult<Option<Listing>> {
    let row: Option<ListingRow> = sqlx::query_as(&format!("{LISTING_COLUMNS} WHERE id=?"))
        .bind(listing_id)
        .fetch_optional(db_pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    Ok(hydrate(db_pool, vec![row]).await?.pop())
}

pub async fn require_listing(db_pool: &SqlitePool, listing_id: &str) -> AppResult<Listing> {
    find_listing(db_pool, listing_id)
        .await?
        .ok_or_else(|| AppError::not_found("Listing"))
}

/// Owner check shared by edit and delete.
pub(crate) async fn require_owner(db_pool: &SqlitePool, listing_id: &str, user_id: &str) -> AppResult<()> {
    let Some((owner_id,)): Option<(String,)> = sqlx::query_as("SELECT owner_id FROM listings WHERE id=?")
        .bind(listing_id)
        .fetch_optional(db_pool)
        .await?
    else {
        return Err(AppError::not_found("Listing"));
    };

    if owner_id != user_id {
        return Err(AppError::Forbidden("Unauthorized user".to_owned()));
    }
    Ok(())
}

pub(crate) async fn replace_images(
    tx: &mut sqlx::SqliteConnection,
    listing_id: &str,
    urls: &[String],
) -> AppResult<()> {
    sqlx::query("DELETE FROM listing_images WHERE listing_id=?")
        .bind(listing_id)
        .execute(&mut *tx)
        .await?;

    for (position, url) in urls.iter().take(MAX_IMAGES).enumerate() {
        sqlx::query("INSERT INTO listing_images (listing_id,position,url) VALUES (?,?,?)")
            .bind(listing_id)
            .bind(position as i64)
            .bind(url)
            .execute(&mut *tx)
            .await?;
    }
    Ok(())
}
