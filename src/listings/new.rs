use axum::{
    debug_handler,
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Response,
};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::AuthUser, db, images::ImageStore, res, AppError, AppResult, AppState};

use super::{form::ListingForm, replace_images, require_listing, Listing};

#[derive(Serialize)]
pub(crate) struct ListingCreated {
    message: &'static str,
    listing: Listing,
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_listing(
    State(db_pool): State<SqlitePool>,
    State(images): State<ImageStore>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    let form = ListingForm::read(multipart?).await?;
    let Some(title) = form.title else {
        return Err(AppError::validation("Title is required"));
    };

    let image_urls = images.upload_all(form.images).await?;

    let id = Uuid::now_v7().to_string();
    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO listings (id,owner_id,title,description,category,country,location,updated_at) VALUES (?,?,?,?,?,?,?,?)")
        .bind(&id)
        .bind(&user.id)
        .bind(&title)
        .bind(form.description.unwrap_or_default())
        .bind(form.category.unwrap_or_default())
        .bind(form.country.unwrap_or_default())
        .bind(form.location.unwrap_or_default())
        .bind(db::to_millis(db::now()))
        .execute(&mut *tx)
        .await?;
    replace_images(&mut tx, &id, &image_urls).await?;
    tx.commit().await?;

    tracing::info!(listing_id = %id, owner_id = %user.id, images = image_urls.len(), "listing added");

    Ok(res::created(ListingCreated {
        message: "listing added successfully",
        listing: require_listing(&db_pool, &id).await?,
    }))
}
