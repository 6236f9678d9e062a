use axum::{debug_handler, extract::{Query, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{res, AppResult, AppState};

use super::{hydrate, Listing, ListingRow, LISTING_COLUMNS};

const DEFAULT_LIMIT: i64 = 8;
const MAX_LIMIT: i64 = 50;
/// Keeps `(page - 1) * limit` inside i64.
const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// Raw query string. Unparseable numbers fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
    category: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    /// Case-insensitive substring of title, description or location.
    pub search: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self { number: 1, limit: DEFAULT_LIMIT }
    }
}

impl Page {
    fn clamped(self) -> Self {
        Self {
            number: self.number.clamp(1, MAX_PAGE),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    fn offset(self) -> i64 {
        (self.number - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_listings: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub limit: i64,
}

#[derive(Serialize)]
pub(crate) struct SearchBody {
    listings: Vec<Listing>,
    pagination: Pagination,
}

impl ListQuery {
    fn split(self) -> (ListingFilter, Page) {
        let positive = |raw: Option<String>| raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v > 0);
        let blank_to_none = |raw: Option<String>| raw.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let page = Page {
            number: positive(self.page).unwrap_or(1).min(MAX_PAGE),
            limit: positive(self.limit).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        };
        let filter = ListingFilter {
            search: blank_to_none(self.search),
            category: blank_to_none(self.category),
            country: blank_to_none(self.country),
        };
        (filter, page)
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<res::Success<SearchBody>>> {
    let (filter, page) = query.split();
    let (listings, pagination) = search_listings(&db_pool, &filter, page).await?;
    Ok(res::ok(SearchBody { listings, pagination }))
}

pub async fn search_listings(
    db_pool: &SqlitePool,
    filter: &ListingFilter,
    page: Page,
) -> AppResult<(Vec<Listing>, Pagination)> {
    let page = page.clamped();
    let total_listings: i64 = filtered("SELECT COUNT(*) FROM listings", filter)
        .build_query_scalar::<i64>()
        .fetch_one(db_pool)
        .await?;

    let mut select = filtered(LISTING_COLUMNS, filter);
    select
        .push(" ORDER BY rowid LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows: Vec<ListingRow> = select.build_query_as::<ListingRow>().fetch_all(db_pool).await?;

    let pagination = Pagination {
        total_listings,
        total_pages: (total_listings + page.limit - 1) / page.limit,
        current_page: page.number,
        limit: page.limit,
    };
    Ok((hydrate(db_pool, rows).await?, pagination))
}

fn filtered(select: &str, filter: &ListingFilter) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new(select);
    builder.push(" WHERE 1=1");

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        builder.push(" AND (");
        for (i, column) in ["title", "description", "location"].into_iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder
                .push(column)
                .push(" LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        builder.push(")");
    }
    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(country) = &filter.country {
        builder.push(" AND country = ").push_bind(country.clone());
    }

    builder
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
