//! Locating image bytes inside variable-shaped backend responses.
//!
//! Backends return image data in different places depending on model and
//! transport: a structured `image_url` entry, a data URL embedded in free
//! text, or an inline binary part. Each place is modeled as a
//! [`ResponseShape`]; [`first_image`] walks the shapes in the order the
//! backend constructed them and returns the first payload that decodes.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::{truncate, Error, Result};

/// Standard-alphabet engine that accepts payloads with or without padding.
const BASE64_RELAXED: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const PREVIEW_MAX: usize = 200;

/// An inline binary payload from a native API part.
#[derive(Debug, Clone)]
pub enum InlinePayload<'a> {
    /// Already-decoded bytes, used as-is.
    Bytes(&'a [u8]),
    /// Base64-encoded string.
    Base64(&'a str),
}

/// One place a backend response can carry image data.
#[derive(Debug, Clone)]
pub enum ResponseShape<'a> {
    /// A `message.images[].image_url.url` string. If it contains the
    /// `"base64,"` marker, everything after the first occurrence is the
    /// payload; otherwise the whole string is.
    ImageUrlField(&'a str),
    /// Free-text content that may embed a `data:image/...;base64,` URL.
    FreeText(&'a str),
    /// Inline binary payload from a native API part.
    Inline(InlinePayload<'a>),
}

impl ResponseShape<'_> {
    /// Attempts to produce decoded image bytes from this shape.
    ///
    /// `Ok(None)` means the shape does not carry an image; a decode
    /// failure on a payload the shape does carry is terminal.
    fn image(&self) -> Result<Option<Vec<u8>>> {
        match self {
            Self::ImageUrlField(url) => {
                let payload = match url.split_once("base64,") {
                    Some((_, rest)) => rest,
                    None => url,
                };
                decode_base64(payload).map(Some)
            }
            Self::FreeText(text) => match scan_data_url(text) {
                Some(payload) => decode_base64(payload).map(Some),
                None => Ok(None),
            },
            Self::Inline(InlinePayload::Bytes(bytes)) => Ok(Some(bytes.to_vec())),
            Self::Inline(InlinePayload::Base64(data)) => decode_base64(data).map(Some),
        }
    }
}

/// Walks `shapes` in order and returns the first decoded image payload.
///
/// When no shape yields an image, fails with [`Error::NoImage`] carrying a
/// truncated preview of the first non-empty free text seen.
pub fn first_image<'a, I>(shapes: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = ResponseShape<'a>>,
{
    let mut preview: Option<String> = None;
    for shape in shapes {
        if let ResponseShape::FreeText(text) = &shape {
            let text = text.trim();
            if preview.is_none() && !text.is_empty() {
                preview = Some(truncate(text, PREVIEW_MAX));
            }
        }
        if let Some(bytes) = shape.image()? {
            return Ok(bytes);
        }
    }
    Err(Error::NoImage { preview })
}

/// Decodes a base64 payload, tolerating absent padding.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    BASE64_RELAXED
        .decode(payload.trim().as_bytes())
        .map_err(|e| Error::Decode(e.to_string()))
}

/// Finds the first `data:image/<subtype>;base64,<payload>` occurrence in
/// `text` and returns the payload: the maximal run of base64 alphabet
/// characters, terminated by a quote, any other non-alphabet character, or
/// the end of the string.
pub fn scan_data_url(text: &str) -> Option<&str> {
    const MARKER: &str = "data:image/";
    const B64_TAG: &str = ";base64,";

    let mut rest = text;
    loop {
        let start = rest.find(MARKER)?;
        let after = &rest[start + MARKER.len()..];
        // The subtype runs up to the first character that cannot be part
        // of a MIME subtype; a well-formed occurrence continues with
        // ";base64," right there.
        let subtype_end = after.find(|c: char| !is_subtype_char(c))?;
        if subtype_end > 0 && after[subtype_end..].starts_with(B64_TAG) {
            let payload = &after[subtype_end + B64_TAG.len()..];
            let end = payload
                .find(|c: char| !is_base64_char(c))
                .unwrap_or(payload.len());
            if end > 0 {
                return Some(&payload[..end]);
            }
        }
        rest = after;
    }
}

fn is_subtype_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-')
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}
