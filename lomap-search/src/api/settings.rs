//! Settings API endpoint
//!
//! `POST /api/settings/gemini_api_key` stores the key in the database, the
//! highest-priority configuration tier, and switches the running service
//! over to it without a restart.

use axum::{extract::State, routing::post, Json, Router};
use lomap_common::config::{load_toml_config, write_toml_config, TomlConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{is_valid_key, SETTINGS_API_KEY_ROUTE};
use crate::{ApiError, ApiResult, AppState};

/// Request payload for setting the Gemini API key
#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/gemini_api_key
///
/// **Request:** `{"api_key": "your-gemini-key"}`
/// **Response:** `{"success": true, "message": "..."}`
///
/// 1. Validate key (non-empty, non-whitespace)
/// 2. Write to database (authoritative)
/// 3. Swap the query parser and listing assistant to the new key
/// 4. Sync to TOML (best-effort backup)
///
/// TOML write failures log warnings but do not fail the request.
pub async fn set_gemini_api_key(
    State(state): State<AppState>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }
    let api_key = payload.api_key.trim().to_string();

    crate::db::settings::set_gemini_api_key(&state.db, api_key.clone()).await?;

    let client = state
        .gemini
        .build_client(api_key.clone())
        .map_err(|e| ApiError::Internal(format!("Failed to create Gemini client: {}", e)))?;
    state.install_gemini_client(Arc::new(client)).await;

    info!(model = %state.gemini.model, "Gemini API key configured via settings API");

    if let Some(toml_path) = &state.gemini.toml_path {
        match sync_key_to_toml(&api_key, toml_path) {
            Ok(()) => info!("API key synced to TOML: {}", toml_path.display()),
            Err(e) => warn!("TOML sync failed (database write succeeded): {}", e),
        }
    }

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Gemini API key configured successfully".to_string(),
    }))
}

/// Update only the key in the module's TOML file, keeping its other settings
///
/// An unreadable existing file is left alone rather than overwritten.
fn sync_key_to_toml(api_key: &str, path: &Path) -> lomap_common::Result<()> {
    let mut config = if path.exists() {
        load_toml_config(path)?
    } else {
        TomlConfig::default()
    };
    config.gemini_api_key = Some(api_key.to_string());
    write_toml_config(&config, path)
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route(SETTINGS_API_KEY_ROUTE, post(set_gemini_api_key))
}
