//! Backend selection and credentials.

use crate::error::{Error, Result};
use crate::types::BackendKind;

/// The backend selected for this invocation, with its credential.
///
/// Selection happens once at startup; everything downstream receives the
/// chosen backend as a value instead of re-reading the environment.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Native Gemini API.
    Gemini {
        /// API key for generativelanguage.googleapis.com.
        api_key: String,
    },
    /// OpenRouter chat-completions gateway.
    OpenRouter {
        /// API key for openrouter.ai.
        api_key: String,
    },
}

impl BackendConfig {
    /// Resolves the backend from explicit keys or the environment.
    ///
    /// An explicit key wins over its environment variable; the native
    /// Gemini backend wins when both backends have a credential. With no
    /// credential at all this fails without any network I/O.
    pub fn resolve(gemini_key: Option<String>, openrouter_key: Option<String>) -> Result<Self> {
        Self::from_keys(
            gemini_key.or_else(|| non_empty_env(BackendKind::Gemini.env_var())),
            openrouter_key.or_else(|| non_empty_env(BackendKind::OpenRouter.env_var())),
        )
    }

    fn from_keys(gemini: Option<String>, openrouter: Option<String>) -> Result<Self> {
        if let Some(api_key) = gemini {
            tracing::debug!(backend = %BackendKind::Gemini, "resolved backend");
            return Ok(Self::Gemini { api_key });
        }
        if let Some(api_key) = openrouter {
            tracing::debug!(backend = %BackendKind::OpenRouter, "resolved backend");
            return Ok(Self::OpenRouter { api_key });
        }
        Err(Error::MissingCredential(format!(
            "{} or {} must be set (or passed explicitly)",
            BackendKind::Gemini.env_var(),
            BackendKind::OpenRouter.env_var(),
        )))
    }

    /// The kind of the selected backend.
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Gemini { .. } => BackendKind::Gemini,
            Self::OpenRouter { .. } => BackendKind::OpenRouter,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_wins_when_both_keys_present() {
        let config =
            BackendConfig::from_keys(Some("g-key".into()), Some("or-key".into())).unwrap();
        assert_eq!(config.kind(), BackendKind::Gemini);
    }

    #[test]
    fn test_gateway_used_when_only_gateway_key_present() {
        let config = BackendConfig::from_keys(None, Some("or-key".into())).unwrap();
        assert_eq!(config.kind(), BackendKind::OpenRouter);
        match config {
            BackendConfig::OpenRouter { api_key } => assert_eq!(api_key, "or-key"),
            other => panic!("expected OpenRouter, got {other:?}"),
        }
    }

    #[test]
    fn test_no_keys_is_missing_credential() {
        let err = BackendConfig::from_keys(None, None).unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }
}
