//! Generation backends.

mod gemini;
mod openrouter;

pub use gemini::{GeminiBackend, GeminiBackendBuilder};
pub use openrouter::{OpenRouterBackend, OpenRouterBackendBuilder};

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::error::Result;
use crate::types::{BackendKind, GeneratedImage, GenerationRequest};

/// Trait implemented by each generation backend.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generates an image from the given request.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;

    /// Returns the kind of this backend.
    fn kind(&self) -> BackendKind;

    /// Returns the name of this backend for display.
    fn name(&self) -> &str {
        match self.kind() {
            BackendKind::Gemini => "Gemini (native API)",
            BackendKind::OpenRouter => "OpenRouter (gateway)",
        }
    }
}

/// Constructs the backend selected by `config`.
pub fn from_config(config: BackendConfig) -> Result<Box<dyn ImageBackend>> {
    match config {
        BackendConfig::Gemini { api_key } => {
            Ok(Box::new(GeminiBackend::builder().api_key(api_key).build()?))
        }
        BackendConfig::OpenRouter { api_key } => Ok(Box::new(
            OpenRouterBackend::builder().api_key(api_key).build()?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_builds_matching_backend() {
        let backend = from_config(BackendConfig::Gemini {
            api_key: "g-key".into(),
        })
        .unwrap();
        assert_eq!(backend.kind(), BackendKind::Gemini);
        assert_eq!(backend.name(), "Gemini (native API)");

        let backend = from_config(BackendConfig::OpenRouter {
            api_key: "or-key".into(),
        })
        .unwrap();
        assert_eq!(backend.kind(), BackendKind::OpenRouter);
    }
}
