//! Product catalog database operations
//!
//! The catalog is always returned as a full snapshot in insertion order; the
//! search engine never pages or caches it.

use chrono::Utc;
use lomap_common::{Coordinate, Error, Product, Rating, Result};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;

/// Load every product with its ratings, in insertion order
pub async fn load_catalog(db: &Pool<Sqlite>) -> Result<Vec<Product>> {
    let rows = sqlx::query(
        "SELECT id, name, description, category, price_range, seller_name, seller_phone,
                image_url, model_url, latitude, longitude
         FROM products
         ORDER BY rowid ASC",
    )
    .fetch_all(db)
    .await?;

    let mut ratings = load_ratings(db).await?;

    let products = rows
        .iter()
        .map(|row| {
            let id: String = row.get("id");
            Product {
                ratings: ratings.remove(&id).unwrap_or_default(),
                id,
                name: row.get("name"),
                description: row.get("description"),
                category: row.get("category"),
                price_range: row.get("price_range"),
                seller_name: row.get("seller_name"),
                seller_phone: row.get("seller_phone"),
                image_url: row.get("image_url"),
                model_url: row.get("model_url"),
                location: Coordinate::new(row.get("latitude"), row.get("longitude")),
            }
        })
        .collect();

    Ok(products)
}

/// Ratings grouped by product id, oldest first
async fn load_ratings(db: &Pool<Sqlite>) -> Result<HashMap<String, Vec<Rating>>> {
    let rows = sqlx::query("SELECT product_id, rating, comment FROM product_ratings ORDER BY id ASC")
        .fetch_all(db)
        .await?;

    let mut grouped: HashMap<String, Vec<Rating>> = HashMap::new();
    for row in rows {
        let rating: i64 = row.get("rating");
        grouped
            .entry(row.get("product_id"))
            .or_default()
            .push(Rating {
                rating: rating.clamp(0, i64::from(Rating::MAX)) as u8,
                comment: row.get("comment"),
            });
    }
    Ok(grouped)
}

pub async fn product_exists(db: &Pool<Sqlite>, product_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

pub async fn count_products(db: &Pool<Sqlite>) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Insert a product and its initial ratings
///
/// Coordinates are checked against WGS84 ranges here, at the producer side.
pub async fn insert_product(db: &Pool<Sqlite>, product: &Product) -> Result<()> {
    if !product.location.is_valid() {
        return Err(Error::InvalidInput(format!(
            "Coordinate out of range: ({}, {})",
            product.location.latitude, product.location.longitude
        )));
    }
    if product.name.trim().is_empty() || product.category.trim().is_empty() {
        return Err(Error::InvalidInput("Product name and category are required".to_string()));
    }
    if product.ratings.iter().any(|r| !r.is_valid()) {
        return Err(Error::InvalidInput("Ratings must be between 1 and 5".to_string()));
    }

    let mut tx = db.begin().await?;

    sqlx::query(
        "INSERT INTO products (id, name, description, category, price_range, seller_name,
                               seller_phone, image_url, model_url, latitude, longitude, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(&product.price_range)
    .bind(&product.seller_name)
    .bind(&product.seller_phone)
    .bind(&product.image_url)
    .bind(&product.model_url)
    .bind(product.location.latitude)
    .bind(product.location.longitude)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    for rating in &product.ratings {
        insert_rating(&mut tx, &product.id, rating).await?;
    }

    tx.commit().await?;

    tracing::info!(product_id = %product.id, name = %product.name, "Product added to catalog");
    Ok(())
}

/// Record a buyer rating for an existing product
pub async fn add_rating(db: &Pool<Sqlite>, product_id: &str, rating: &Rating) -> Result<()> {
    if !rating.is_valid() {
        return Err(Error::InvalidInput(format!(
            "Rating must be between {} and {}, got {}",
            Rating::MIN,
            Rating::MAX,
            rating.rating
        )));
    }
    if !product_exists(db, product_id).await? {
        return Err(Error::NotFound(format!("Product {}", product_id)));
    }

    let mut tx = db.begin().await?;
    insert_rating(&mut tx, product_id, rating).await?;
    tx.commit().await?;

    Ok(())
}

async fn insert_rating(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    product_id: &str,
    rating: &Rating,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO product_ratings (product_id, rating, comment, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(product_id)
    .bind(i64::from(rating.rating))
    .bind(&rating.comment)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Populate an empty catalog with the demo products
///
/// Returns the number of products inserted (0 when the catalog has data).
pub async fn seed_demo_catalog(db: &Pool<Sqlite>) -> Result<usize> {
    if count_products(db).await? > 0 {
        return Ok(0);
    }

    let products = demo_products();
    for product in &products {
        insert_product(db, product).await?;
    }

    tracing::info!(count = products.len(), "Seeded demo catalog");
    Ok(products.len())
}

/// Demo catalog: a Tây Bắc brocade and a Hà Giang wild honey
pub fn demo_products() -> Vec<Product> {
    vec![
        Product {
            id: "prod_1".to_string(),
            name: "Vải Thổ Cẩm Tây Bắc".to_string(),
            description: "Vải thổ cẩm dệt thủ công từ sợi lanh tự nhiên, nhuộm màu chàm truyền thống. \
                          Họa tiết tinh xảo, mang đậm bản sắc văn hóa dân tộc Thái. Thích hợp may trang \
                          phục, túi xách, vật dụng trang trí."
                .to_string(),
            category: "Thủ công".to_string(),
            price_range: "250.000 VND / mét".to_string(),
            seller_name: "A Tủa".to_string(),
            seller_phone: "0987654321".to_string(),
            image_url: Some(
                "https://images.unsplash.com/photo-1620799140408-edc6d5f9650d?q=80&w=2872&auto=format&fit=crop"
                    .to_string(),
            ),
            model_url: Some(
                "https://modelviewer.dev/shared-assets/models/MaterialsVariantsShoe.glb".to_string(),
            ),
            location: Coordinate::new(21.0285, 105.8542),
            ratings: vec![
                Rating {
                    rating: 5,
                    comment: Some("Chất liệu tuyệt vời, hoa văn sắc sảo. Rất đáng tiền!".to_string()),
                },
                Rating {
                    rating: 4,
                    comment: Some("Vải đẹp, màu sắc đúng như hình.".to_string()),
                },
            ],
        },
        Product {
            id: "prod_2".to_string(),
            name: "Mật Ong Hoa Rừng Hà Giang".to_string(),
            description: "Mật ong nguyên chất khai thác từ các loài hoa dại trên cao nguyên đá Đồng Văn. \
                          Vị ngọt thanh, hương thơm độc đáo, giàu dinh dưỡng. Tốt cho sức khỏe và làm đẹp."
                .to_string(),
            category: "Nông sản".to_string(),
            price_range: "450.000 VND / lít".to_string(),
            seller_name: "Chị Ong".to_string(),
            seller_phone: "0912345678".to_string(),
            image_url: Some(
                "https://images.unsplash.com/photo-1558642452-9d2a7deb7f62?q=80&w=2940&auto=format&fit=crop"
                    .to_string(),
            ),
            model_url: None,
            location: Coordinate::new(23.0768, 105.3005),
            ratings: vec![Rating {
                rating: 5,
                comment: Some("Mật ong thơm và ngọt thanh, rất nguyên chất.".to_string()),
            }],
        },
    ]
}
