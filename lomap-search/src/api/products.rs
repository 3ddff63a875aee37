//! Catalog endpoints
//!
//! Products, ratings and the category list the interpreter validates against.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lomap_common::models::distinct_categories;
use lomap_common::{Coordinate, Product, Rating};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::products;
use crate::{ApiResult, AppState};

/// Catalog snapshot response
#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub total: usize,
}

/// New product submitted by a seller
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub price_range: String,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub seller_phone: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub model_url: Option<String>,
    pub location: Coordinate,
}

impl NewProduct {
    fn into_product(self) -> Product {
        Product {
            id: format!("prod_{}", Uuid::new_v4().simple()),
            name: self.name.trim().to_string(),
            description: self.description,
            category: self.category.trim().to_string(),
            price_range: self.price_range,
            seller_name: self.seller_name,
            seller_phone: self.seller_phone,
            image_url: self.image_url.filter(|u| !u.trim().is_empty()),
            model_url: self.model_url.filter(|u| !u.trim().is_empty()),
            location: self.location,
            ratings: Vec::new(),
        }
    }
}

/// Category list response
#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

/// GET /api/products
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<ProductsResponse>> {
    let products = products::load_catalog(&state.db).await?;
    let total = products.len();
    Ok(Json(ProductsResponse { products, total }))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = request.into_product();
    products::insert_product(&state.db, &product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// POST /api/products/:id/ratings
pub async fn rate_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(rating): Json<Rating>,
) -> ApiResult<StatusCode> {
    products::add_rating(&state.db, &product_id, &rating).await?;
    tracing::debug!(product_id = %product_id, rating = rating.rating, "Rating added");

    Ok(StatusCode::CREATED)
}

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<CategoriesResponse>> {
    let products = products::load_catalog(&state.db).await?;
    Ok(Json(CategoriesResponse {
        categories: distinct_categories(&products),
    }))
}

/// Build catalog routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/:id/ratings", post(rate_product))
        .route("/api/categories", get(list_categories))
}
