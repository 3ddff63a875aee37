//! HTTP API handlers for lomap-search

pub mod health;
pub mod listing;
pub mod products;
pub mod search;
pub mod settings;

pub use health::health_routes;
pub use listing::listing_routes;
pub use products::product_routes;
pub use search::search_routes;
pub use settings::settings_routes;
