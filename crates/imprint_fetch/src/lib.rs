//! Imprint Fetch
//!
//! Network access for the Imprint editor.
//!
//! Product artwork, the font catalog and font binaries are all fetched through
//! the [`Fetcher`] trait, so loaders can run against [`HttpFetcher`] in
//! production and against an in-memory mock in tests.
//!
//! # Example
//!
//! ```ignore
//! use imprint_fetch::{Fetcher, FetchRequest, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new(std::time::Duration::from_secs(10))?;
//! let response = fetcher
//!     .fetch(FetchRequest::cors("https://cdn.example.com/shirt.png", "https://shop.example.com"))
//!     .await?;
//! assert!(response.allows_origin("https://shop.example.com"));
//! ```

mod error;
mod http;
mod request;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::future::Future;

pub use error::{FetchError, Result};
pub use http::HttpFetcher;
pub use request::{cache_busted, cache_stamp, FetchRequest, FetchResponse, RequestMode};

/// Asynchronous GET-style resource fetcher
///
/// Implementations must not interpret CORS headers themselves; callers decide
/// whether a response is usable for pixel reads via
/// [`FetchResponse::allows_origin`].
pub trait Fetcher: Send + Sync {
    /// Fetch a resource, returning the response whatever its status code
    fn fetch(&self, request: FetchRequest) -> impl Future<Output = Result<FetchResponse>> + Send;
}
