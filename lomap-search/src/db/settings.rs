//! Settings database operations
//!
//! Key-value accessors over the `settings` table.

use lomap_common::{Error, Result};
use sqlx::{Pool, Sqlite};

const GEMINI_API_KEY: &str = "gemini_api_key";

/// Get Gemini API key from database
///
/// **Returns:** Some(key) if set, None otherwise
pub async fn get_gemini_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, GEMINI_API_KEY).await
}

/// Set Gemini API key in database
pub async fn set_gemini_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, GEMINI_API_KEY, key).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_get_gemini_api_key_not_set() {
        let pool = test_pool().await;
        assert_eq!(get_gemini_api_key(&pool).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_gemini_api_key_upserts() {
        let pool = test_pool().await;

        set_gemini_api_key(&pool, "old_key".to_string()).await.unwrap();
        set_gemini_api_key(&pool, "new_key".to_string()).await.unwrap();

        assert_eq!(get_gemini_api_key(&pool).await.unwrap(), Some("new_key".to_string()));

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings WHERE key = 'gemini_api_key'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
