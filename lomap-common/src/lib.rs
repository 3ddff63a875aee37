//! # LOMAP Common Library
//!
//! Shared code for LOMAP services:
//! - Catalog models (products, ratings)
//! - Geographic coordinates and great-circle distance
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod config;
pub mod error;
pub mod geo;
pub mod models;

pub use error::{Error, Result};
pub use geo::{haversine_km, Coordinate};
pub use models::{Product, Rating};
