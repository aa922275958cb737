//! Core types for image generation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Generation backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Native Gemini API (generativelanguage.googleapis.com).
    Gemini,
    /// OpenRouter chat-completions gateway.
    OpenRouter,
}

impl BackendKind {
    /// Returns the environment variable holding this backend's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::OpenRouter => write!(f, "openrouter"),
        }
    }
}

/// Aspect ratios accepted by the image models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square aspect ratio.
    #[serde(rename = "1:1")]
    Square,
    /// 2:3 classic portrait aspect ratio.
    #[serde(rename = "2:3")]
    ClassicPortrait,
    /// 3:2 classic landscape aspect ratio.
    #[serde(rename = "3:2")]
    Classic,
    /// 3:4 standard portrait aspect ratio.
    #[serde(rename = "3:4")]
    StandardPortrait,
    /// 4:3 standard landscape aspect ratio.
    #[serde(rename = "4:3")]
    Standard,
    /// 4:5 large-format portrait aspect ratio.
    #[serde(rename = "4:5")]
    LargeFormatPortrait,
    /// 5:4 large-format landscape aspect ratio.
    #[serde(rename = "5:4")]
    LargeFormat,
    /// 9:16 portrait (tall) aspect ratio.
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9 landscape (widescreen) aspect ratio.
    #[serde(rename = "16:9")]
    Landscape,
    /// 21:9 ultrawide aspect ratio.
    #[serde(rename = "21:9")]
    Ultrawide,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::ClassicPortrait => "2:3",
            Self::Classic => "3:2",
            Self::StandardPortrait => "3:4",
            Self::Standard => "4:3",
            Self::LargeFormatPortrait => "4:5",
            Self::LargeFormat => "5:4",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
            Self::Ultrawide => "21:9",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output resolution tiers accepted by the image models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Roughly 1024px on the long edge.
    #[serde(rename = "1K")]
    OneK,
    /// Roughly 2048px on the long edge.
    #[serde(rename = "2K")]
    TwoK,
    /// Roughly 4096px on the long edge.
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    /// Returns the resolution as the API string (e.g., "2K").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1K" => Ok(Self::OneK),
            "2K" => Ok(Self::TwoK),
            "4K" => Ok(Self::FourK),
            other => Err(Error::InvalidRequest(format!(
                "unsupported resolution {other:?} (expected 1K, 2K, or 4K)"
            ))),
        }
    }
}

/// A request to generate an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Model identifier; the backend's default image model when absent.
    pub model: Option<String>,
    /// Aspect ratio override.
    pub aspect_ratio: Option<AspectRatio>,
    /// Output resolution override.
    pub resolution: Option<Resolution>,
    /// Reference images (raw bytes), in order. Native backend only.
    #[serde(skip)]
    pub reference_images: Vec<Vec<u8>>,
}

impl GenerationRequest {
    /// Creates a new request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            aspect_ratio: None,
            resolution: None,
            reference_images: Vec::new(),
        }
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }

    /// Sets the output resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Appends a reference image. Native backend only.
    pub fn with_reference_image(mut self, image: Vec<u8>) -> Self {
        self.reference_images.push(image);
        self
    }

    /// Validates the request before any network I/O.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::InvalidRequest("prompt must not be empty".into()));
        }
        Ok(())
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes as returned by the backend.
    pub data: Vec<u8>,
    /// Image format detected from the bytes.
    pub format: ImageFormat,
    /// Backend that generated this image.
    pub backend: BackendKind,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image, detecting the format from magic bytes.
    pub fn new(data: Vec<u8>, backend: BackendKind, metadata: GenerationMetadata) -> Self {
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or_default();
        Self {
            data,
            format,
            backend,
            metadata,
        }
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
