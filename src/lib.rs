pub mod appresult;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod images;
pub mod listings;
pub mod realtime;
pub mod res;
pub mod reviews;
pub mod users;

use std::path::Path;

use anyhow::anyhow;
use axum::{extract::FromRef, routing::get, Router};
use serde_json::Value;
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub use appresult::{AppError, AppResult};

use auth::TokenSigner;
use config::Config;
use images::ImageStore;
use realtime::{PresenceRegistry, Relay};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub tokens: TokenSigner,
    pub images: ImageStore,
    pub relay: Relay,
}

impl AppState {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            db_pool: db::connect(&config.database_url).await?,
            tokens: TokenSigner::new(config.token_secret.clone()),
            images: ImageStore::from_config(config),
            relay: Relay::new(PresenceRegistry::new()),
        })
    }
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/user", users::router())
        .nest("/api/listing", listings::router())
        .nest("/api/review", reviews::router())
        .nest("/api/chat", chat::router())
        .route("/ws", get(chat::ws::chat_ws))
}

/// Full application: API, realtime socket, uploaded images and, when
/// `web_dir` exists, the single page app with an `index.html` fallback.
pub fn app(state: AppState, web_dir: Option<&Path>) -> Router {
    let mut app = api_router();

    if let Some(dir) = state.images.local_dir() {
        app = app.nest_service(images::UPLOADS_ROUTE, ServeDir::new(dir));
    }

    if let Some(web_dir) = web_dir.filter(|dir| dir.is_dir()) {
        let index = ServeFile::new(web_dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(web_dir).fallback(index));
    } else if let Some(web_dir) = web_dir {
        tracing::warn!("{} not found, serving the API only", web_dir.display());
    }

    app.layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
}

impl GetField for Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or_else(|| anyhow!("expected {field} in {self}"))?
            .as_str()
            .ok_or_else(|| anyhow!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }
}
