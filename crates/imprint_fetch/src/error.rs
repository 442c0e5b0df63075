//! Fetch error types

use thiserror::Error;

/// Network errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, TLS or body read failure
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Server answered with a non-success status
    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Request did not complete in time
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Result type for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;
