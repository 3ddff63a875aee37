//! Configuration resolution for lomap-search
//!
//! Gemini API key priority: Database → ENV → TOML.

use lomap_common::config::TomlConfig;
use lomap_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::services::gemini_client::DEFAULT_MODEL;
use crate::services::{GeminiClient, GeminiError};

pub const ENV_GEMINI_API_KEY: &str = "LOMAP_GEMINI_API_KEY";

/// Route that stores a key in the database tier
pub const SETTINGS_API_KEY_ROUTE: &str = "/api/settings/gemini_api_key";

/// Resolve the Gemini API key from the three configuration tiers
///
/// Returns `Error::Config` when no tier holds a usable key; callers run
/// with the query parser disabled in that case.
pub async fn resolve_gemini_api_key(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<String> {
    let db_key = crate::db::settings::get_gemini_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(ENV_GEMINI_API_KEY).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config.gemini_api_key.clone().filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Gemini API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("Gemini API key loaded from database");
        return Ok(key);
    }

    if let Some(key) = env_key {
        info!("Gemini API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "Gemini API key not configured. Configure one of:\n\
         1. Database: POST {} {{\"api_key\": \"your-key\"}} (applies without restart)\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: ~/.config/lomap/map-search.toml (gemini_api_key = \"your-key\")\n\
         Without a key, search falls back to keyword matching and listing assistance is off.",
        SETTINGS_API_KEY_ROUTE, ENV_GEMINI_API_KEY
    )))
}

/// Model to use: TOML override or the client default
pub fn resolve_gemini_model(toml_config: &TomlConfig) -> String {
    toml_config
        .gemini_model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// How Gemini clients are built, at startup and when a key is set at runtime
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub model: String,
    /// Endpoint override; the public API when `None`
    pub base_url: Option<String>,
    /// TOML file that receives keys set through the settings route
    pub toml_path: Option<PathBuf>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            toml_path: None,
        }
    }
}

impl GeminiSettings {
    pub fn from_toml(toml_config: &TomlConfig, toml_path: Option<PathBuf>) -> Self {
        Self {
            model: resolve_gemini_model(toml_config),
            base_url: None,
            toml_path,
        }
    }

    pub fn build_client(&self, api_key: String) -> std::result::Result<GeminiClient, GeminiError> {
        let client = GeminiClient::new(api_key)?.with_model(self.model.clone());
        Ok(match &self.base_url {
            Some(base_url) => client.with_base_url(base_url.clone()),
            None => client,
        })
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serial_test::serial;

    fn toml_with_key(key: Option<&str>) -> TomlConfig {
        TomlConfig {
            gemini_api_key: key.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[tokio::test]
    #[serial]
    async fn test_database_key_has_priority() {
        let pool = test_pool().await;
        crate::db::settings::set_gemini_api_key(&pool, "db-key".to_string())
            .await
            .unwrap();
        std::env::set_var(ENV_GEMINI_API_KEY, "env-key");

        let key = resolve_gemini_api_key(&pool, &toml_with_key(Some("toml-key"))).await.unwrap();
        assert_eq!(key, "db-key");

        std::env::remove_var(ENV_GEMINI_API_KEY);
    }

    #[tokio::test]
    #[serial]
    async fn test_env_beats_toml() {
        let pool = test_pool().await;
        std::env::set_var(ENV_GEMINI_API_KEY, "env-key");

        let key = resolve_gemini_api_key(&pool, &toml_with_key(Some("toml-key"))).await.unwrap();
        assert_eq!(key, "env-key");

        std::env::remove_var(ENV_GEMINI_API_KEY);
    }

    #[tokio::test]
    #[serial]
    async fn test_toml_key_and_missing_key() {
        let pool = test_pool().await;
        std::env::remove_var(ENV_GEMINI_API_KEY);

        let key = resolve_gemini_api_key(&pool, &toml_with_key(Some("toml-key"))).await.unwrap();
        assert_eq!(key, "toml-key");

        let err = resolve_gemini_api_key(&pool, &toml_with_key(Some("  "))).await.unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(SETTINGS_API_KEY_ROUTE)));
    }

    #[test]
    fn test_settings_build_client_with_configured_model() {
        let config = TomlConfig {
            gemini_model: Some("gemini-2.5-pro".to_string()),
            ..Default::default()
        };
        let settings = GeminiSettings::from_toml(&config, None);
        let client = settings.build_client("key".to_string()).unwrap();
        assert_eq!(client.model(), "gemini-2.5-pro");

        let client = GeminiSettings::default().build_client("key".to_string()).unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_resolve_gemini_model() {
        assert_eq!(resolve_gemini_model(&TomlConfig::default()), DEFAULT_MODEL);
        let config = TomlConfig {
            gemini_model: Some("gemini-2.5-pro".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_gemini_model(&config), "gemini-2.5-pro");
    }
}
