//! Google Gemini API client
//!
//! Thin wrapper over the `generateContent` REST endpoint. Text calls use
//! JSON-schema constrained output; image calls ask for an image modality
//! from a separate image model. Used as the natural-language query parser for
//! the map search and by the listing assistant.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::search::{ParseError, ParsedQuery, QueryParser};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const USER_AGENT: &str = concat!("lomap-search/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Gemini client errors
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Response contained no text")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<GeminiError> for ParseError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::NetworkError(msg) => ParseError::Network(msg),
            GeminiError::InvalidApiKey => ParseError::Upstream(401, "Invalid API key".to_string()),
            GeminiError::RateLimitExceeded => {
                ParseError::Upstream(429, "Rate limit exceeded".to_string())
            }
            GeminiError::ApiError(status, msg) => ParseError::Upstream(status, msg),
            GeminiError::EmptyResponse => {
                ParseError::Malformed("Response contained no text".to_string())
            }
            GeminiError::ParseError(msg) => ParseError::Malformed(msg),
        }
    }
}

/// Inline binary payload (base64) such as a product photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// One part of a content turn: text or inline data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: &str, data: &str) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

impl GenerationConfig {
    fn json(schema: Value) -> Self {
        Self {
            response_mime_type: Some("application/json"),
            response_schema: Some(schema),
            ..Default::default()
        }
    }

    fn image() -> Self {
        Self {
            response_modalities: Some(vec!["IMAGE"]),
            ..Default::default()
        }
    }
}

/// `generateContent` response body (only the fields we read)
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    pub fn text(&self) -> Option<String> {
        let text: String = self.parts().iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// First inline payload with data in the first candidate
    pub fn inline_data(&self) -> Option<&InlineData> {
        self.parts()
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
    }

    fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }
}

/// Strip an optional Markdown code fence around a JSON answer
pub fn extract_json_text(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, GeminiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GeminiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        })
    }

    /// Point the client at another endpoint (local test servers, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_image_model(mut self, image_model: impl Into<String>) -> Self {
        self.image_model = image_model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    async fn generate_content(
        &self,
        model: &str,
        parts: Vec<Part>,
        generation_config: GenerationConfig,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        };

        tracing::debug!(model = %model, "Calling Gemini generateContent");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeminiError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(GeminiError::InvalidApiKey);
        }

        if status == 429 {
            return Err(GeminiError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeminiError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| GeminiError::ParseError(e.to_string()))
    }

    /// Run one prompt and decode the schema-constrained JSON answer as `T`
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        parts: Vec<Part>,
        response_schema: Value,
    ) -> Result<T, GeminiError> {
        let parsed = self
            .generate_content(&self.model, parts, GenerationConfig::json(response_schema))
            .await?;

        let text = parsed.text().ok_or(GeminiError::EmptyResponse)?;

        serde_json::from_str(extract_json_text(&text)).map_err(|e| {
            tracing::debug!(response = %text, "Gemini answer did not match schema");
            GeminiError::ParseError(e.to_string())
        })
    }

    /// Run one prompt against the image model
    ///
    /// Returns `None` when the model answered without any image data.
    pub async fn generate_image(&self, parts: Vec<Part>) -> Result<Option<InlineData>, GeminiError> {
        let parsed = self
            .generate_content(&self.image_model, parts, GenerationConfig::image())
            .await?;
        Ok(parsed.inline_data().cloned())
    }

    /// Extract keyword, category and distance from a map search query
    pub async fn parse_search_query(
        &self,
        raw_query: &str,
        categories: &[String],
    ) -> Result<ParsedQuery, GeminiError> {
        let category_list = categories.join(", ");
        let prompt = format!(
            "Phân tích truy vấn tìm kiếm của người dùng cho một bản đồ sản phẩm đặc sản Việt Nam. \
             Trích xuất các thông tin sau:\n\
             - searchTerm: Từ khóa chính về sản phẩm (ví dụ: \"mật ong\", \"vải thổ cẩm\"). \
             Nếu không có, để trống \"\".\n\
             - category: Một danh mục sản phẩm duy nhất nếu được đề cập. Phải chọn một trong các \
             danh mục có sẵn sau: [{categories}]. Nếu không có hoặc không khớp, để trống \"\".\n\
             - distance: Khoảng cách tối đa để tìm kiếm, tính bằng km (ví dụ: \"dưới 20km\" -> 20, \
             \"trong vòng 5 kilômét\" -> 5). Nếu không đề cập, trả về null.\n\n\
             Truy vấn của người dùng: \"{query}\"\n\n\
             Trả về kết quả dưới dạng JSON.",
            categories = category_list,
            query = raw_query,
        );

        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "searchTerm": {
                    "type": "STRING",
                    "description": "Từ khóa chính của sản phẩm. Ví dụ: 'mật ong'. Trả về chuỗi rỗng nếu không có."
                },
                "category": {
                    "type": "STRING",
                    "description": format!(
                        "Danh mục sản phẩm, phải là một trong số [{}]. Trả về chuỗi rỗng nếu không có.",
                        category_list
                    )
                },
                "distance": {
                    "type": "NUMBER",
                    "nullable": true,
                    "description": "Khoảng cách tối đa bằng km. Trả về null nếu không có."
                }
            }
        });

        self.generate_json(vec![Part::text(prompt)], schema).await
    }
}

#[async_trait]
impl QueryParser for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn parse(&self, raw_query: &str, categories: &[String]) -> Result<ParsedQuery, ParseError> {
        Ok(self.parse_search_query(raw_query, categories).await?)
    }
}
