use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

const GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

const EXTRACT_PROMPT: &str = "Analisis gambar makanan ini dan kembalikan hasil dalam JSON murni \
tanpa teks tambahan.\n\
Format:\n\
{\n  \"name\": string,\n  \"description\": string,\n  \"price\": number,\n  \"category\": \"food\"\n}\n\n\
Ketentuan harga:\n\
- makanan sederhana: 8000-15000 IDR\n\
- makanan tradisional: 15000-35000 IDR\n\
- premium: 35000-60000 IDR";

/// Clients for the image pipeline behind the admin product-upload helper:
/// Cloudinary hosts the photo, Gemini proposes the catalog fields.
#[derive(Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    cloudinary_cloud_name: Option<String>,
    cloudinary_upload_preset: Option<String>,
    gemini_api_key: Option<String>,
}

/// Product fields proposed from a menu photo. The admin reviews these before
/// anything reaches the catalog.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExtractedProduct {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
struct ExtractedFields {
    name: String,
    description: String,
    price: f64,
    category: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
}

impl VisionClient {
    pub fn new(
        cloudinary_cloud_name: Option<String>,
        cloudinary_upload_preset: Option<String>,
        gemini_api_key: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            cloudinary_cloud_name,
            cloudinary_upload_preset,
            gemini_api_key,
        }
    }

    /// Client with no upstream credentials; every call fails with a config error.
    pub fn disabled() -> Self {
        Self::new(None, None, None)
    }

    /// Upload an image via Cloudinary's unsigned upload endpoint and return
    /// the hosted URL.
    pub async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        let cloud_name = self
            .cloudinary_cloud_name
            .as_deref()
            .ok_or_else(|| AppError::Gateway("image storage is not configured".into()))?;
        let upload_preset = self
            .cloudinary_upload_preset
            .as_deref()
            .ok_or_else(|| AppError::Gateway("image storage is not configured".into()))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("upload")
            .mime_str(content_type)
            .map_err(|e| AppError::BadRequest(format!("invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", upload_preset.to_string())
            .text("folder", "menu");

        let response = self
            .http
            .post(format!(
                "https://api.cloudinary.com/v1_1/{cloud_name}/image/upload"
            ))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "image upload failed with {}",
                response.status()
            )));
        }

        let payload: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        Ok(payload.secure_url)
    }

    /// Ask the generative model to describe a menu photo as catalog fields.
    pub async fn describe_product(
        &self,
        bytes: &[u8],
        content_type: &str,
        image_url: String,
    ) -> AppResult<ExtractedProduct> {
        let api_key = self
            .gemini_api_key
            .as_deref()
            .ok_or_else(|| AppError::Gateway("image extraction is not configured".into()))?;

        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": content_type,
                            "data": BASE64.encode(bytes),
                        }
                    },
                    { "text": EXTRACT_PROMPT },
                ]
            }]
        });

        let response = self
            .http
            .post(format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{GEMINI_MODEL}:generateContent"
            ))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "extraction model returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| AppError::Gateway("extraction model returned no text".into()))?;

        let fields: ExtractedFields = serde_json::from_str(strip_code_fence(text))
            .map_err(|e| AppError::Gateway(format!("unparseable model output: {e}")))?;

        Ok(ExtractedProduct {
            name: fields.name,
            description: fields.description,
            price: fields.price.round() as i64,
            category: fields.category,
            image_url,
        })
    }
}

/// Models often wrap JSON in a Markdown code fence despite the prompt.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        let fenced = "```json\n{\"name\":\"Nasi Goreng\"}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"name\":\"Nasi Goreng\"}");
    }

    #[test]
    fn strips_bare_code_fence() {
        let fenced = "```\n{\"price\": 12000}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"price\": 12000}");
    }

    #[test]
    fn passes_plain_json_through() {
        let plain = "  {\"category\":\"food\"} ";
        assert_eq!(strip_code_fence(plain), "{\"category\":\"food\"}");
    }
}
