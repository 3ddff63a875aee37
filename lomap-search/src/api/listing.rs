//! Seller listing assistant endpoints

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::SETTINGS_API_KEY_ROUTE;
use crate::services::{ListingAssistant, ListingInput, ListingProposal, ListingReview};
use crate::{ApiError, ApiResult, AppState};

/// Photo upload for drafting a listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    /// Standard base64 of the image bytes, without a `data:` prefix
    pub image_base64: String,
    pub mime_type: String,
}

async fn assistant(state: &AppState) -> ApiResult<Arc<ListingAssistant>> {
    state.listing_assistant().await.ok_or_else(|| {
        ApiError::ServiceUnavailable(format!(
            "Gemini API key not configured (set one via POST {})",
            SETTINGS_API_KEY_ROUTE
        ))
    })
}

/// POST /api/listing/draft
///
/// Responds with the drafted fields plus `conceptImage`, a product render on
/// a white background.
pub async fn draft_listing(
    State(state): State<AppState>,
    Json(request): Json<DraftRequest>,
) -> ApiResult<Json<ListingProposal>> {
    let assistant = assistant(&state).await?;
    let proposal = assistant
        .draft_from_photo(&request.image_base64, &request.mime_type)
        .await?;
    Ok(Json(proposal))
}

/// POST /api/listing/review
pub async fn review_listing(
    State(state): State<AppState>,
    Json(listing): Json<ListingInput>,
) -> ApiResult<Json<ListingReview>> {
    let assistant = assistant(&state).await?;
    Ok(Json(assistant.review(&listing).await?))
}

/// Build listing assistant routes
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/api/listing/draft", post(draft_listing))
        .route("/api/listing/review", post(review_listing))
}
