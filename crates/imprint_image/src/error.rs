//! Image error types

use thiserror::Error;

/// Image loading errors
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Product has no image URL")]
    MissingUrl,

    #[error("Failed to fetch image: {0}")]
    Fetch(#[from] imprint_fetch::FetchError),

    /// The response does not grant this origin access to its pixels
    #[error("Image at {url} is not shared with origin {origin}")]
    NotShared { url: String, origin: String },

    #[error("Invalid data URI: {0}")]
    DataUri(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Image has zero size")]
    Empty,
}

/// Result type for image operations
pub type Result<T> = std::result::Result<T, ImageError>;
