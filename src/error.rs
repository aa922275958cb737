//! Error types for image generation.

/// Errors that can occur while generating or saving an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No API key available for any backend.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Invalid request parameters, rejected before any network I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed (invalid or rejected API key).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network or HTTP transport error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend returned a non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// Backend reported an application error inside a successful HTTP response.
    #[error("provider error: {0}")]
    Provider(String),

    /// Content was blocked by the backend's safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The response carried none of the recognized image shapes.
    #[error("no image in response{}", no_image_suffix(.preview))]
    NoImage {
        /// Truncated view of any textual content found, for diagnosis.
        preview: Option<String>,
    },

    /// Failed to decode a base64 image payload.
    #[error("failed to decode image payload: {0}")]
    Decode(String),

    /// Image bytes could not be decoded or re-encoded.
    #[error("invalid image data: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error (e.g., writing the output file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for image generation operations.
pub type Result<T> = std::result::Result<T, Error>;

fn no_image_suffix(preview: &Option<String>) -> String {
    match preview {
        Some(text) => format!(" (response text: {text:?})"),
        None => String::new(),
    }
}

/// Truncates `text` at a char boundary, appending `...` when cut.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = Error::MissingCredential("GEMINI_API_KEY not set".into());
        assert_eq!(err.to_string(), "missing credential: GEMINI_API_KEY not set");
    }

    #[test]
    fn test_no_image_display() {
        let err = Error::NoImage { preview: None };
        assert_eq!(err.to_string(), "no image in response");

        let err = Error::NoImage {
            preview: Some("the model declined".into()),
        };
        assert_eq!(
            err.to_string(),
            "no image in response (response text: \"the model declined\")"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("0123456789abc", 10), "0123456789...");
        // never splits a multi-byte char
        assert_eq!(truncate("ééééé", 5), "éé...");
    }
}
