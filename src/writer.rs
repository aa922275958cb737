//! Persisting generated images as PNG.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Decodes `bytes` as an image and writes it to `path` as PNG.
///
/// The source format is detected from the bytes, never from the file
/// extension. The destination is only created after the decode succeeds,
/// so a failed invocation leaves no partial output. Returns the
/// canonicalized absolute path.
pub fn save_png(bytes: &[u8], path: &Path) -> Result<PathBuf> {
    let decoded = image::load_from_memory(bytes)?;
    decoded.save_with_format(path, image::ImageFormat::Png)?;
    Ok(std::fs::canonicalize(path)?)
}
