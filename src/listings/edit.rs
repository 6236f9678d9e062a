use axum::{
    debug_handler,
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{auth::AuthUser, db, images::ImageStore, res, AppResult, AppState};

use super::{form::ListingForm, replace_images, require_listing, require_owner, Listing};

#[derive(Serialize)]
pub(crate) struct ListingUpdated {
    message: &'static str,
    listing: Listing,
}

/// Blank fields keep their stored value. Supplying any image replaces the
/// whole image list; supplying none keeps the old one.
#[debug_handler(state = AppState)]
pub(crate) async fn edit_listing(
    Path(listing_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(images): State<ImageStore>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<res::Success<ListingUpdated>>> {
    require_owner(&db_pool, &listing_id, &user.id).await?;
    let current = require_listing(&db_pool, &listing_id).await?;

    let form = ListingForm::read(multipart?).await?;
    let new_images = if form.images.is_empty() {
        None
    } else {
        Some(images.upload_all(form.images).await?)
    };

    let mut tx = db_pool.begin().await?;
    sqlx::query("UPDATE listings SET title=?,description=?,category=?,country=?,location=?,updated_at=? WHERE id=?")
        .bind(form.title.unwrap_or(current.title))
        .bind(form.description.unwrap_or(current.description))
        .bind(form.category.unwrap_or(current.category))
        .bind(form.country.unwrap_or(current.country))
        .bind(form.location.unwrap_or(current.location))
        .bind(db::to_millis(db::now()))
        .bind(&listing_id)
        .execute(&mut *tx)
        .await?;
    if let Some(urls) = &new_images {
        replace_images(&mut tx, &listing_id, urls).await?;
    }
    tx.commit().await?;

    tracing::info!(%listing_id, replaced_images = new_images.is_some(), "listing updated");

    Ok(res::ok(ListingUpdated {
        message: "Listing updated successfully",
        listing: require_listing(&db_pool, &listing_id).await?,
    }))
}
