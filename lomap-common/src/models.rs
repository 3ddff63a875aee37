//! Marketplace catalog models shared between services

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Buyer review attached to a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Star rating, 1 to 5
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn is_valid(&self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.rating)
    }
}

/// A product listed by a local seller
///
/// Read-only input to the map search; the catalog owns its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    /// Display name
    pub name: String,
    pub description: String,
    /// Free-form category label (e.g. "Nông sản", "Thủ công")
    pub category: String,
    /// Human-readable price, e.g. "450.000 VND / lít"
    #[serde(default)]
    pub price_range: String,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub seller_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Optional 3D model shown in the AR viewer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    pub location: Coordinate,
    #[serde(default)]
    pub ratings: Vec<Rating>,
}

impl Product {
    /// Mean star rating, 0.0 when nobody has rated the product yet
    pub fn average_rating(&self) -> f64 {
        if self.ratings.is_empty() {
            return 0.0;
        }
        let total: u32 = self.ratings.iter().map(|r| u32::from(r.rating)).sum();
        f64::from(total) / self.ratings.len() as f64
    }
}

/// Distinct category labels in first-seen catalog order
pub fn distinct_categories(products: &[Product]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for product in products {
        if !categories.iter().any(|c| c == &product.category) {
            categories.push(product.category.clone());
        }
    }
    categories
}
