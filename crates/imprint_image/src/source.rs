//! Image source classification and data URI decoding

use crate::{ImageError, Result};
use base64::Engine;

/// Where the base image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Inline `data:` URI, same origin by construction
    DataUri(String),
    /// Remote (or relative) URL fetched over the network
    Url(String),
}

impl ImageSource {
    /// Classify a product image reference. Blank input has no source.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            None
        } else if uri.starts_with("data:") {
            Some(Self::DataUri(uri.to_string()))
        } else {
            Some(Self::Url(uri.to_string()))
        }
    }
}

/// Decode the payload of a `data:[<mime>][;base64],<data>` URI.
///
/// Base64 payloads are decoded, other payloads are taken as raw bytes.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ImageError::DataUri("missing data: prefix".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::DataUri("missing ',' separator".to_string()))?;

    if meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| ImageError::DataUri(e.to_string()))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}
