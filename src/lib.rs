#![warn(missing_docs)]
//! pixgen - prompt-to-image generation over the Gemini API and OpenRouter.
//!
//! One request per invocation: build a backend-shaped request from a text
//! prompt, call the selected backend, locate the image bytes inside the
//! response (shapes vary by backend and model), and save the result as
//! PNG.
//!
//! # Quick Start
//!
//! ```no_run
//! use pixgen::backends::{GeminiBackend, ImageBackend};
//! use pixgen::{GenerationRequest, Resolution};
//!
//! #[tokio::main]
//! async fn main() -> pixgen::Result<()> {
//!     let backend = GeminiBackend::builder().build()?;
//!     let request = GenerationRequest::new("A lighthouse at dusk")
//!         .with_resolution(Resolution::TwoK);
//!     let image = backend.generate(&request).await?;
//!     let path = pixgen::writer::save_png(&image.data, "lighthouse.png".as_ref())?;
//!     println!("saved {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! # Backend selection
//!
//! [`BackendConfig::resolve`] picks exactly one backend per invocation:
//! the native Gemini API when `GEMINI_API_KEY` is available, otherwise
//! the OpenRouter gateway via `OPENROUTER_API_KEY`.

pub mod backends;
pub mod config;
mod error;
pub mod normalize;
mod types;
pub mod writer;

pub use config::BackendConfig;
pub use error::{Error, Result};
pub use types::{
    AspectRatio, BackendKind, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat,
    Resolution,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backends::{GeminiBackend, ImageBackend, OpenRouterBackend};
    pub use crate::config::BackendConfig;
    pub use crate::error::{Error, Result};
    pub use crate::types::{AspectRatio, GeneratedImage, GenerationRequest, Resolution};
}
