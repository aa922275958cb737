//! Native Gemini image generation backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::backends::ImageBackend;
use crate::error::{truncate, Error, Result};
use crate::normalize::{self, InlinePayload, ResponseShape};
use crate::types::{
    BackendKind, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const ERROR_BODY_MAX: usize = 512;

/// Builder for [`GeminiBackend`].
#[derive(Debug, Clone, Default)]
pub struct GeminiBackendBuilder {
    api_key: Option<String>,
}

impl GeminiBackendBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builds the backend, resolving the API key.
    pub fn build(self) -> Result<GeminiBackend> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or_else(|| {
                Error::MissingCredential("GEMINI_API_KEY not set and no API key provided".into())
            })?;

        Ok(GeminiBackend {
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
        })
    }
}

/// Native Gemini image generation backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiBackend {
    /// Creates a new `GeminiBackendBuilder`.
    pub fn builder() -> GeminiBackendBuilder {
        GeminiBackendBuilder::new()
    }

    fn parse_error(&self, status: u16, text: &str) -> Error {
        let text = truncate(text.trim(), ERROR_BODY_MAX);
        if status == 401 || status == 403 {
            return Error::Auth(text);
        }
        if status == 404 {
            return Error::InvalidRequest(
                "model not found; verify the model name is correct".into(),
            );
        }
        let lower = text.to_lowercase();
        if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
            return Error::ContentBlocked(text);
        }
        Error::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl ImageBackend for GeminiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        request.validate()?;

        let start = Instant::now();
        let model = request.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let url = format!("{API_BASE}/models/{model}:generateContent");
        let body = GeminiRequest::from_generation_request(request);

        tracing::debug!(%model, "sending Gemini generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let data = extract_image(gemini_response)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(bytes = data.len(), duration_ms, "Gemini generation finished");

        Ok(GeneratedImage::new(
            data,
            BackendKind::Gemini,
            GenerationMetadata {
                model: Some(model.to_string()),
                duration_ms: Some(duration_ms),
            },
        ))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }
}

/// Locates image bytes in a decoded Gemini response.
///
/// Safety blocks are surfaced before normalization: Gemini reports them
/// with HTTP 200 via `promptFeedback` or a candidate `finishReason`.
fn extract_image(response: GeminiResponse) -> Result<Vec<u8>> {
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            let message = feedback
                .block_reason_message
                .unwrap_or_else(|| format!("prompt blocked: {reason}"));
            return Err(Error::ContentBlocked(message));
        }
    }

    let mut inline = Vec::new();
    let mut texts = Vec::new();
    for candidate in response.candidates {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            match reason {
                "SAFETY" | "IMAGE_SAFETY" | "IMAGE_PROHIBITED_CONTENT" | "IMAGE_RECITATION"
                | "RECITATION" | "PROHIBITED_CONTENT" | "BLOCKLIST" => {
                    return Err(Error::ContentBlocked(format!(
                        "blocked by Gemini safety filter: {reason}"
                    )));
                }
                "IMAGE_OTHER" | "NO_IMAGE" => {
                    return Err(Error::Provider(format!("generation failed: {reason}")));
                }
                _ => {} // STOP, MAX_TOKENS, etc. are normal
            }
        }
        let Some(content) = candidate.content else {
            continue;
        };
        for part in content.parts {
            if let Some(data) = part.inline_data {
                inline.push(data.data);
            } else if let Some(text) = part.text {
                texts.push(text);
            }
        }
    }

    let shapes = inline
        .iter()
        .map(|data| ResponseShape::Inline(InlinePayload::Base64(data.as_str())))
        .chain(texts.iter().map(|text| ResponseShape::FreeText(text.as_str())));
    normalize::first_image(shapes)
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request: text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        let mut parts = Vec::new();

        // Reference images go first, then the text prompt.
        for image_data in &req.reference_images {
            let mime_type = ImageFormat::from_magic_bytes(image_data)
                .unwrap_or_default()
                .mime_type()
                .to_string();
            parts.push(GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type,
                    data: base64::engine::general_purpose::STANDARD.encode(image_data),
                },
            });
        }
        parts.push(GeminiRequestPart::Text {
            text: req.prompt.clone(),
        });

        // Presence is an override signal: omitted entirely when unset.
        let image_config = if req.resolution.is_some() || req.aspect_ratio.is_some() {
            Some(GeminiImageConfig {
                image_size: req.resolution.map(|r| r.as_str().to_string()),
                aspect_ratio: req.aspect_ratio.map(|a| a.as_str().to_string()),
            })
        } else {
            None
        };

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
                image_config,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AspectRatio, Resolution};

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_builder_with_explicit_key() {
        let backend = GeminiBackendBuilder::new().api_key("test-key").build();
        assert!(backend.is_ok());
    }

    #[test]
    fn test_request_construction_basic() {
        let req = GenerationRequest::new("A puppy");
        let gemini_req = GeminiRequest::from_generation_request(&req);

        assert_eq!(gemini_req.contents.len(), 1);
        assert_eq!(gemini_req.contents[0].parts.len(), 1);
        assert_eq!(
            gemini_req.generation_config.response_modalities,
            vec!["TEXT", "IMAGE"]
        );
        assert!(gemini_req.generation_config.image_config.is_none());
    }

    #[test]
    fn test_request_construction_with_reference_images() {
        let png_data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let req = GenerationRequest::new("Combine these")
            .with_reference_image(png_data.clone())
            .with_reference_image(png_data);
        let gemini_req = GeminiRequest::from_generation_request(&req);

        // Two inline parts followed by the prompt.
        let parts = &gemini_req.contents[0].parts;
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[0], GeminiRequestPart::InlineData { .. }));
        assert!(matches!(parts[2], GeminiRequestPart::Text { .. }));
    }

    #[test]
    fn test_image_config_omitted_when_unset() {
        let req = GenerationRequest::new("A puppy");
        let json = serde_json::to_value(GeminiRequest::from_generation_request(&req)).unwrap();

        assert!(json["generationConfig"].get("imageConfig").is_none());
    }

    #[test]
    fn test_image_config_serialized_camel_case() {
        let req = GenerationRequest::new("A puppy")
            .with_resolution(Resolution::FourK)
            .with_aspect_ratio(AspectRatio::Landscape);
        let json = serde_json::to_value(GeminiRequest::from_generation_request(&req)).unwrap();

        let image_config = &json["generationConfig"]["imageConfig"];
        assert_eq!(image_config["imageSize"], "4K");
        assert_eq!(image_config["aspectRatio"], "16:9");
    }

    #[test]
    fn test_extract_image_from_inline_part() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here you go."},
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_image(response).unwrap(), PNG_SIGNATURE);
    }

    #[test]
    fn test_extract_image_prompt_feedback_block() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = extract_image(response).unwrap_err();
        assert!(matches!(err, Error::ContentBlocked(_)));
        assert!(err.to_string().contains("safety"));
    }

    #[test]
    fn test_extract_image_safety_finish_reason() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = extract_image(response).unwrap_err();
        assert!(matches!(err, Error::ContentBlocked(_)));
    }

    #[test]
    fn test_extract_image_no_image_reports_text_preview() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "I can only describe it."}]},
                "finishReason": "STOP"
            }]
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        match extract_image(response).unwrap_err() {
            Error::NoImage { preview } => {
                assert_eq!(preview.as_deref(), Some("I can only describe it."));
            }
            other => panic!("expected NoImage, got {other}"),
        }
    }

    #[test]
    fn test_extract_image_empty_candidates() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            extract_image(response).unwrap_err(),
            Error::NoImage { preview: None }
        ));
    }
}
