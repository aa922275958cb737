//! OpenRouter chat-completions gateway backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backends::ImageBackend;
use crate::error::{truncate, Error, Result};
use crate::normalize::{self, ResponseShape};
use crate::types::{BackendKind, GeneratedImage, GenerationMetadata, GenerationRequest};

const API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "google/gemini-3-pro-image-preview";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const ERROR_BODY_MAX: usize = 512;

/// Builder for [`OpenRouterBackend`].
#[derive(Debug, Clone, Default)]
pub struct OpenRouterBackendBuilder {
    api_key: Option<String>,
}

impl OpenRouterBackendBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENROUTER_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builds the backend, resolving the API key.
    pub fn build(self) -> Result<OpenRouterBackend> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
            .ok_or_else(|| {
                Error::MissingCredential(
                    "OPENROUTER_API_KEY not set and no API key provided".into(),
                )
            })?;

        Ok(OpenRouterBackend {
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
        })
    }
}

/// OpenRouter chat-completions gateway backend.
pub struct OpenRouterBackend {
    client: reqwest::Client,
    api_key: String,
}

impl OpenRouterBackend {
    /// Creates a new `OpenRouterBackendBuilder`.
    pub fn builder() -> OpenRouterBackendBuilder {
        OpenRouterBackendBuilder::new()
    }

    fn parse_error(&self, status: u16, text: &str) -> Error {
        let text = truncate(text.trim(), ERROR_BODY_MAX);
        if status == 401 || status == 403 {
            return Error::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety") || lower.contains("blocked") || lower.contains("moderated") {
            return Error::ContentBlocked(text);
        }
        Error::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl ImageBackend for OpenRouterBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        request.validate()?;
        if !request.reference_images.is_empty() {
            return Err(Error::InvalidRequest(
                "reference images are only supported by the native Gemini backend".into(),
            ));
        }

        let start = Instant::now();
        let body = ChatRequest::from_generation_request(request);

        tracing::debug!(model = %body.model, "sending OpenRouter chat-completions request");

        let response = self
            .client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let chat_response: ChatResponse = response.json().await?;
        let data = extract_image(chat_response)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            bytes = data.len(),
            duration_ms,
            "OpenRouter generation finished"
        );

        Ok(GeneratedImage::new(
            data,
            BackendKind::OpenRouter,
            GenerationMetadata {
                model: Some(body.model),
                duration_ms: Some(duration_ms),
            },
        ))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::OpenRouter
    }
}

/// Locates image bytes in a decoded chat-completion response.
///
/// Structured `images` entries are tried before free-text content; the
/// gateway has never been observed to populate both, so the order is a
/// fixed choice rather than verified provider behavior.
fn extract_image(response: ChatResponse) -> Result<Vec<u8>> {
    if let Some(error) = response.error {
        return Err(Error::Provider(error.render()));
    }

    let messages: Vec<ChatMessage> = response
        .choices
        .into_iter()
        .filter_map(|choice| choice.message)
        .collect();

    let structured = messages
        .iter()
        .flat_map(|message| message.images.iter())
        .map(|image| ResponseShape::ImageUrlField(image.image_url.url.as_str()));
    let texts = messages
        .iter()
        .filter_map(|message| message.content.as_deref())
        .map(ResponseShape::FreeText);
    normalize::first_image(structured.chain(texts))
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatRequestMessage>,
    modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
}

impl ChatRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        // Presence is an override signal: omitted entirely when unset.
        let image_config = if req.aspect_ratio.is_some() || req.resolution.is_some() {
            Some(ImageConfig {
                aspect_ratio: req.aspect_ratio.map(|a| a.as_str().to_string()),
                image_size: req.resolution.map(|r| r.as_str().to_string()),
            })
        } else {
            None
        };

        Self {
            model: req
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            messages: vec![ChatRequestMessage {
                role: "user".to_string(),
                content: req.prompt.clone(),
            }],
            modalities: vec!["image".to_string(), "text".to_string()],
            image_config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Vec<MessageImage>,
}

#[derive(Debug, Deserialize)]
struct MessageImage {
    image_url: ImageUrlRef,
}

#[derive(Debug, Deserialize)]
struct ImageUrlRef {
    url: String,
}

/// Error object embedded in an otherwise successful HTTP response.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl ApiErrorBody {
    fn render(&self) -> String {
        match (&self.message, &self.code) {
            (Some(message), Some(code)) => format!("{message} (code {code})"),
            (Some(message), None) => message.clone(),
            (None, Some(code)) => format!("code {code}"),
            (None, None) => "unspecified provider error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AspectRatio, Resolution};

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_builder_with_explicit_key() {
        let backend = OpenRouterBackendBuilder::new().api_key("or-test").build();
        assert!(backend.is_ok());
    }

    #[test]
    fn test_request_construction_basic() {
        let req = GenerationRequest::new("A city");
        let chat_req = ChatRequest::from_generation_request(&req);

        assert_eq!(chat_req.model, DEFAULT_MODEL);
        assert_eq!(chat_req.messages.len(), 1);
        assert_eq!(chat_req.messages[0].role, "user");
        assert_eq!(chat_req.modalities, vec!["image", "text"]);
        assert!(chat_req.image_config.is_none());
    }

    #[test]
    fn test_image_config_omitted_when_unset() {
        let req = GenerationRequest::new("A city");
        let json = serde_json::to_value(ChatRequest::from_generation_request(&req)).unwrap();

        assert!(json.get("image_config").is_none());
    }

    #[test]
    fn test_image_config_with_knobs_set() {
        let req = GenerationRequest::new("A city")
            .with_aspect_ratio(AspectRatio::Ultrawide)
            .with_resolution(Resolution::TwoK);
        let json = serde_json::to_value(ChatRequest::from_generation_request(&req)).unwrap();

        assert_eq!(json["image_config"]["aspect_ratio"], "21:9");
        assert_eq!(json["image_config"]["image_size"], "2K");
    }

    #[test]
    fn test_extract_image_from_structured_field() {
        // Scenario from the gateway: data URL inside message.images.
        let json = r#"{"choices":[{"message":{"images":[{"image_url":{"url":"data:image/png;base64,iVBORw0KGgo="}}]}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_image(response).unwrap(), PNG_SIGNATURE);
    }

    #[test]
    fn test_extract_image_from_free_text() {
        let json = r#"{"choices":[{"message":{"content":"Here: data:image/png;base64,iVBORw0KGgo= enjoy"}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_image(response).unwrap(), PNG_SIGNATURE);
    }

    #[test]
    fn test_structured_field_wins_over_free_text() {
        let json = r#"{"choices":[{"message":{
            "content":"text copy: data:image/png;base64,AQID",
            "images":[{"image_url":{"url":"iVBORw0KGgo="}}]
        }}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_image(response).unwrap(), PNG_SIGNATURE);
    }

    #[test]
    fn test_extract_image_embedded_error_object() {
        let json = r#"{"error":{"message":"model is overloaded","code":502}}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        let err = extract_image(response).unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn test_extract_image_text_only_reports_no_image() {
        let json = r#"{"choices":[{"message":{"content":"I drew nothing."}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        match extract_image(response).unwrap_err() {
            Error::NoImage { preview } => {
                assert_eq!(preview.as_deref(), Some("I drew nothing."));
            }
            other => panic!("expected NoImage, got {other}"),
        }
    }

    #[test]
    fn test_extract_image_empty_response() {
        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            extract_image(response).unwrap_err(),
            Error::NoImage { preview: None }
        ));
    }

    #[tokio::test]
    async fn test_reference_images_rejected_before_network() {
        let backend = OpenRouterBackend::builder().api_key("or-test").build().unwrap();
        let req = GenerationRequest::new("A city").with_reference_image(vec![1, 2, 3]);
        let err = backend.generate(&req).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
