//! Map search endpoints
//!
//! `POST /api/search` runs a free-text query through the interpreter and the
//! caller's search session; `POST /api/filter` applies explicit criteria
//! directly. Clients identify their session with a `session` id; callers
//! that send none share the default session.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use lomap_common::models::distinct_categories;
use lomap_common::{Coordinate, Product};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::products;
use crate::search::{
    filter_products, FilterCriteria, InterpretationSource, DEFAULT_SESSION_ID, MAX_SESSION_ID_LEN,
};
use crate::{ApiError, ApiResult, AppState};

/// Hint returned when a radius is active but the caller sent no location
pub const HINT_LOCATION_REQUIRED: &str = "location_required";

/// Free-text search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Caller position; absent when geolocation is denied or has no fix
    #[serde(default)]
    pub location: Option<Coordinate>,
    /// Client session id
    #[serde(default)]
    pub session: Option<String>,
}

/// Explicit filter request
#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub location: Option<Coordinate>,
}

/// Query parameters for `GET /api/search`
#[derive(Debug, Deserialize)]
pub struct SessionParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub session: Option<String>,
}

impl SessionParams {
    fn coordinate(&self) -> ApiResult<Option<Coordinate>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Some(Coordinate::new(lat, lon))),
            (None, None) => Ok(None),
            _ => Err(ApiError::BadRequest(
                "lat and lon must be given together".to_string(),
            )),
        }
    }
}

/// Search results for the submitted query
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// Criteria interpreted from this request's query
    pub criteria: FilterCriteria,
    pub source: InterpretationSource,
    /// Submission number within the session
    pub sequence: u64,
    /// A newer submission in the same session was applied first, so these
    /// criteria did not become the session's current search
    pub stale: bool,
    pub products: Vec<Product>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// Current session view
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub criteria: FilterCriteria,
    pub searching: bool,
    pub sequence: u64,
    pub products: Vec<Product>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// Filtered products
#[derive(Debug, Serialize)]
pub struct FilterResponse {
    pub products: Vec<Product>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

fn session_id(requested: Option<&str>) -> ApiResult<&str> {
    match requested.map(str::trim) {
        None | Some("") => Ok(DEFAULT_SESSION_ID),
        Some(id) if id.len() > MAX_SESSION_ID_LEN => Err(ApiError::BadRequest(format!(
            "session id longer than {} bytes",
            MAX_SESSION_ID_LEN
        ))),
        Some(id) => Ok(id),
    }
}

fn location_hint(criteria: &FilterCriteria, location: Option<Coordinate>) -> Option<&'static str> {
    (criteria.needs_location() && location.is_none()).then_some(HINT_LOCATION_REQUIRED)
}

fn apply(catalog: &[Product], criteria: &FilterCriteria, location: Option<Coordinate>) -> Vec<Product> {
    filter_products(catalog, criteria, location)
        .into_iter()
        .cloned()
        .collect()
}

/// POST /api/search
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    let session_id = session_id(request.session.as_deref())?;
    let session = state.sessions.session(session_id).await;
    let ticket = session.begin();
    let sequence = ticket.sequence();

    let catalog = products::load_catalog(&state.db).await?;
    let categories = distinct_categories(&catalog);

    let interpretation = state.interpreter.interpret(&request.query, &categories).await;
    let applied = ticket.complete(interpretation.criteria.clone()).await;

    let degraded = interpretation.is_degraded();
    let criteria = interpretation.criteria;
    let results = apply(&catalog, &criteria, request.location);
    let hint = location_hint(&criteria, request.location);

    info!(
        session = %session_id,
        sequence,
        source = ?interpretation.source,
        degraded,
        stale = !applied,
        keyword = %criteria.keyword,
        category = %criteria.category,
        radius_km = ?criteria.radius_km,
        results = results.len(),
        "Search completed"
    );

    Ok(Json(SearchResponse {
        criteria,
        source: interpretation.source,
        sequence,
        stale: !applied,
        total: results.len(),
        products: results,
        hint,
    }))
}

/// GET /api/search?session=..&lat=..&lon=..
pub async fn current_search(
    State(state): State<AppState>,
    Query(params): Query<SessionParams>,
) -> ApiResult<Json<SessionResponse>> {
    let location = params.coordinate()?;
    let session_id = session_id(params.session.as_deref())?;
    let snapshot = state.sessions.session(session_id).await.snapshot().await;
    let catalog = products::load_catalog(&state.db).await?;

    let results = apply(&catalog, &snapshot.criteria, location);
    let hint = location_hint(&snapshot.criteria, location);

    Ok(Json(SessionResponse {
        criteria: snapshot.criteria,
        searching: snapshot.searching,
        sequence: snapshot.sequence,
        total: results.len(),
        products: results,
        hint,
    }))
}

/// POST /api/filter
pub async fn filter(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<Json<FilterResponse>> {
    if !request.criteria.has_usable_radius() {
        return Err(ApiError::BadRequest(
            "radius_km must be a non-negative number of kilometers".to_string(),
        ));
    }

    let catalog = products::load_catalog(&state.db).await?;
    let results = apply(&catalog, &request.criteria, request.location);
    debug!(results = results.len(), "Filter applied");

    Ok(Json(FilterResponse {
        hint: location_hint(&request.criteria, request.location),
        total: results.len(),
        products: results,
    }))
}

/// Build search routes
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/api/search", get(current_search).post(search))
        .route("/api/filter", post(filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_only_when_radius_without_location() {
        let mut criteria = FilterCriteria::match_all();
        assert_eq!(location_hint(&criteria, None), None);

        criteria.radius_km = Some(10.0);
        assert_eq!(location_hint(&criteria, None), Some(HINT_LOCATION_REQUIRED));
        assert_eq!(location_hint(&criteria, Some(Coordinate::new(21.0, 105.8))), None);
    }

    #[test]
    fn test_location_params_must_be_paired() {
        let both = SessionParams { lat: Some(21.0), lon: Some(105.8), session: None };
        assert!(matches!(both.coordinate(), Ok(Some(_))));

        let none = SessionParams { lat: None, lon: None, session: None };
        assert!(matches!(none.coordinate(), Ok(None)));

        let half = SessionParams { lat: Some(21.0), lon: None, session: None };
        assert!(half.coordinate().is_err());
    }

    #[test]
    fn test_session_id_defaults_and_limits() {
        assert_eq!(session_id(None).unwrap(), DEFAULT_SESSION_ID);
        assert_eq!(session_id(Some("  ")).unwrap(), DEFAULT_SESSION_ID);
        assert_eq!(session_id(Some(" tab-1 ")).unwrap(), "tab-1");
        assert!(session_id(Some(&"x".repeat(MAX_SESSION_ID_LEN + 1))).is_err());
    }
}
