//! lomap-search library - Map product search service
//!
//! Free-text product search for the marketplace map: an AI query
//! interpreter with a local fallback, a pure geospatial filter engine, and
//! the SQLite catalog they run over.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod search;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::config::GeminiSettings;
use crate::search::{QueryInterpreter, QueryParser, SessionRegistry};
use crate::services::{GeminiClient, ListingAssistant};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Catalog database pool
    pub db: SqlitePool,
    /// Free-text query interpreter (Gemini or disabled)
    pub interpreter: QueryInterpreter,
    /// Per-client map search sessions
    pub sessions: Arc<SessionRegistry>,
    /// Listing assistant, `None` until an API key is configured
    pub listing_assistant: Arc<RwLock<Option<Arc<ListingAssistant>>>>,
    /// Model and endpoint used when a key is set at runtime
    pub gemini: GeminiSettings,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        interpreter: QueryInterpreter,
        listing_assistant: Option<Arc<ListingAssistant>>,
    ) -> Self {
        Self {
            db,
            interpreter,
            sessions: Arc::new(SessionRegistry::new()),
            listing_assistant: Arc::new(RwLock::new(listing_assistant)),
            gemini: GeminiSettings::default(),
            startup_time: Utc::now(),
        }
    }

    pub fn with_gemini_settings(mut self, gemini: GeminiSettings) -> Self {
        self.gemini = gemini;
        self
    }

    pub async fn listing_assistant(&self) -> Option<Arc<ListingAssistant>> {
        self.listing_assistant.read().await.clone()
    }

    /// Route query parsing and listing assistance through `client`
    pub async fn install_gemini_client(&self, client: Arc<GeminiClient>) {
        let parser: Arc<dyn QueryParser> = client.clone();
        self.interpreter.replace_parser(parser).await;
        *self.listing_assistant.write().await = Some(Arc::new(ListingAssistant::new(client)));
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::product_routes())
        .merge(api::search_routes())
        .merge(api::listing_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
