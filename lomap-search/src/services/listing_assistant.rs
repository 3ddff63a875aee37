//! AI assistance for sellers creating listings
//!
//! Two operations: draft a listing from a product photo, and review an
//! existing listing for better wording, pricing and marketing. Drafting runs
//! the photo analysis and the concept image render concurrently and fails if
//! either fails. Unlike map search there is no local fallback; failures are
//! reported to the caller.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use super::gemini_client::{GeminiClient, GeminiError, InlineData, Part};

/// Only generic models from this gallery are suggested for the 3D viewer
pub const MODEL_GALLERY_PREFIX: &str = "https://modelviewer.dev/shared-assets/models/";

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] GeminiError),

    #[error("Image model returned no concept image")]
    NoConceptImage,
}

/// Listing proposed from a product photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub category: String,
    /// Suggested price range in VND
    #[serde(default)]
    pub price_range: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
}

/// Photo draft plus a clean concept render of the product
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingProposal {
    #[serde(flatten)]
    pub draft: ListingDraft,
    pub concept_image: InlineData,
}

/// Seller's current listing text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingInput {
    pub product_name: String,
    pub category: String,
    pub price_range: String,
    pub description: String,
}

/// Suggestions for improving a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingReview {
    #[serde(default)]
    pub suggested_name: String,
    #[serde(default)]
    pub suggested_description: String,
    #[serde(default)]
    pub price_feedback: String,
    #[serde(default)]
    pub marketing_tips: Vec<String>,
}

pub struct ListingAssistant {
    client: Arc<GeminiClient>,
}

impl ListingAssistant {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }

    /// Draft a listing and a concept image from a product photo
    ///
    /// `image_base64` is the standard base64 encoding of the image bytes.
    pub async fn draft_from_photo(
        &self,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<ListingProposal, ListingError> {
        validate_image(image_base64, mime_type)?;

        let (draft, concept_image) = tokio::try_join!(
            self.analyze_photo(image_base64, mime_type),
            self.generate_concept_image(image_base64, mime_type),
        )?;

        tracing::info!(
            product_name = %draft.product_name,
            category = %draft.category,
            concept_mime = %concept_image.mime_type,
            "Drafted listing from photo"
        );

        Ok(ListingProposal {
            draft,
            concept_image,
        })
    }

    /// Name, category, price range and description suggested for a photo
    async fn analyze_photo(
        &self,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<ListingDraft, ListingError> {
        let prompt = format!(
            "Phân tích hình ảnh sản phẩm này. Tự động phân loại sản phẩm (nông sản, thủ công, \
             dược liệu…), gợi ý một tên ngắn gọn, đề xuất một khoảng giá bán hợp lý bằng Việt Nam \
             Đồng (VND), và viết một mô tả sản phẩm hấp dẫn. Nội dung mô tả cần ngắn gọn, nêu bật \
             công dụng, nguồn gốc, cách sử dụng, với giọng văn chân thực. Trả về kết quả dưới dạng \
             JSON. Nếu sản phẩm thuộc loại có thể có mô hình 3D (như đồ thủ công, giày dép, chai lọ), \
             hãy đề xuất một URL mô hình 3D chung chung từ `{gallery}`. Ví dụ: '{gallery}Chair.glb' \
             cho đồ nội thất, hoặc '{gallery}MaterialsVariantsShoe.glb' cho giày dép. Nếu không phù \
             hợp, để trống trường modelUrl.",
            gallery = MODEL_GALLERY_PREFIX,
        );

        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "productName": { "type": "STRING", "description": "Tên sản phẩm gợi ý" },
                "category": { "type": "STRING", "description": "Phân loại sản phẩm" },
                "priceRange": { "type": "STRING", "description": "Khoảng giá đề xuất" },
                "description": { "type": "STRING", "description": "Mô tả sản phẩm hấp dẫn" },
                "modelUrl": { "type": "STRING", "description": "URL mô hình 3D đề xuất (nếu có)" }
            }
        });

        let parts = vec![Part::inline(mime_type, image_base64), Part::text(prompt)];
        let draft: ListingDraft = self.client.generate_json(parts, schema).await?;
        Ok(sanitize_draft(draft))
    }

    /// Render the product on a clean white background for the storefront
    pub async fn generate_concept_image(
        &self,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<InlineData, ListingError> {
        let parts = vec![
            Part::inline(mime_type, image_base64),
            Part::text(
                "Tạo một hình ảnh chuyên nghiệp, bắt mắt cho sản phẩm này trên nền trắng sạch sẽ \
                 để sử dụng cho mục đích thương mại điện tử. Giữ nguyên hình dáng và đặc điểm của \
                 sản phẩm gốc.",
            ),
        ];

        self.client.generate_image(parts).await?.ok_or_else(|| {
            tracing::warn!(model = %self.client.image_model(), "Image model answered without image data");
            ListingError::NoConceptImage
        })
    }

    /// Suggest a better name, description, price feedback and marketing tips
    pub async fn review(&self, listing: &ListingInput) -> Result<ListingReview, ListingError> {
        let prompt = format!(
            "Bạn là một chuyên gia tư vấn thương mại điện tử, chuyên về các sản phẩm địa phương \
             và thủ công. Dựa trên thông tin sản phẩm sau, hãy đưa ra các đề xuất cụ thể để làm \
             cho nó hấp dẫn hơn đối với khách hàng.\n\
             - Tên sản phẩm: \"{name}\"\n\
             - Danh mục: \"{category}\"\n\
             - Giá: \"{price}\"\n\
             - Mô tả: \"{description}\"\n\n\
             Hãy cung cấp:\n\
             1. Một tên sản phẩm mới, hấp dẫn và chuẩn SEO hơn.\n\
             2. Một đoạn mô tả mới, mang tính kể chuyện, gợi cảm xúc và nêu bật giá trị độc đáo \
             của sản phẩm.\n\
             3. Nhận xét về mức giá và đề xuất (nếu cần).\n\
             4. 2-3 mẹo marketing cụ thể cho sản phẩm này (ví dụ: kênh bán hàng, đối tượng khách \
             hàng, cách chụp ảnh...).\n\n\
             Vui lòng trả về kết quả dưới dạng JSON.",
            name = listing.product_name,
            category = listing.category,
            price = listing.price_range,
            description = listing.description,
        );

        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "suggestedName": { "type": "STRING", "description": "Tên sản phẩm mới được đề xuất" },
                "suggestedDescription": { "type": "STRING", "description": "Mô tả sản phẩm mới được viết lại" },
                "priceFeedback": { "type": "STRING", "description": "Nhận xét và đề xuất về giá" },
                "marketingTips": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "Các mẹo marketing cụ thể"
                }
            }
        });

        Ok(self.client.generate_json(vec![Part::text(prompt)], schema).await?)
    }
}

fn validate_image(image_base64: &str, mime_type: &str) -> Result<(), ListingError> {
    if !mime_type.starts_with("image/") {
        return Err(ListingError::InvalidImage(format!(
            "unsupported MIME type '{}'",
            mime_type
        )));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image_base64)
        .map_err(|e| ListingError::InvalidImage(format!("not valid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(ListingError::InvalidImage("empty image".to_string()));
    }

    Ok(())
}

/// Drop model URLs that are empty or point outside the model gallery
fn sanitize_draft(mut draft: ListingDraft) -> ListingDraft {
    draft.model_url = draft
        .model_url
        .map(|url| url.trim().to_string())
        .filter(|url| url.starts_with(MODEL_GALLERY_PREFIX) && url.len() > MODEL_GALLERY_PREFIX.len());
    draft
}
