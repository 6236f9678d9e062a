use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{auth::AuthUser, res, AppResult, AppState};

use super::{hydrate, require_listing, require_owner, Listing, ListingRow, LISTING_COLUMNS};

#[derive(Serialize)]
pub(crate) struct ListingBody {
    listing: Listing,
}

#[derive(Serialize)]
pub(crate) struct ListingsBody {
    listings: Vec<Listing>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn single_listing(
    Path(listing_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    _user: AuthUser,
) -> AppResult<Json<res::Success<ListingBody>>> {
    tracing::debug!(%listing_id, "fetching listing");
    Ok(res::ok(ListingBody {
        listing: require_listing(&db_pool, &listing_id).await?,
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn my_listings(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<res::Success<ListingsBody>>> {
    let rows: Vec<ListingRow> = sqlx::query_as(&format!("{LISTING_COLUMNS} WHERE owner_id=? ORDER BY rowid"))
        .bind(&user.id)
        .fetch_all(&db_pool)
        .await?;

    Ok(res::ok(ListingsBody {
        listings: hydrate(&db_pool, rows).await?,
    }))
}

/// Reviews that pointed at the listing stay in the store.
#[debug_handler(state = AppState)]
pub(crate) async fn delete_listing(
    Path(listing_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<res::Success<res::Note>>> {
    require_owner(&db_pool, &listing_id, &user.id).await?;

    sqlx::query("DELETE FROM listings WHERE id=?")
        .bind(&listing_id)
        .execute(&db_pool)
        .await?;

    tracing::info!(%listing_id, "listing deleted");
    Ok(res::note("Listing deleted successfully"))
}
