//! Request and response types

use crate::{FetchError, Result};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// How a request treats cross-origin access
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMode {
    /// Sends an `Origin` header; the response is only usable for pixel reads
    /// when it grants that origin access
    Cors { origin: String },
    /// Plain request, response headers are not checked
    NoCors,
}

/// A GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// Plain request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::NoCors,
            headers: Vec::new(),
        }
    }

    /// Cross-origin request on behalf of `origin`
    pub fn cors(url: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::Cors {
                origin: origin.into(),
            },
            headers: Vec::new(),
        }
    }

    /// Add a request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether this request was made in CORS mode
    pub fn is_cors(&self) -> bool {
        matches!(self.mode, RequestMode::Cors { .. })
    }
}

/// A fully-read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// Header names are stored lowercase
    headers: FxHashMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Create a response with no headers
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: FxHashMap::default(),
            body: body.into(),
        }
    }

    /// `200 OK` with the given body
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    /// Add a header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// `Access-Control-Allow-Origin: *`
    pub fn with_any_origin(self) -> Self {
        self.with_header("access-control-allow-origin", "*")
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the response grants `origin` read access to its body
    pub fn allows_origin(&self, origin: &str) -> bool {
        match self.header("access-control-allow-origin") {
            Some(value) => {
                let value = value.trim();
                value == "*" || value.eq_ignore_ascii_case(origin.trim_end_matches('/'))
            }
            None => false,
        }
    }

    /// Turn a non-2xx response into [`FetchError::Status`]
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// Next cache-busting stamp.
///
/// Milliseconds since the epoch, bumped so that two stamps taken within the
/// same millisecond still differ.
pub fn cache_stamp() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

/// Append a `_t=<stamp>` query parameter so caches holding a response
/// without CORS headers are bypassed
pub fn cache_busted(url: &str, stamp: u64) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed
                .query_pairs_mut()
                .append_pair("_t", &stamp.to_string());
            parsed.into()
        }
        Err(_) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{url}{sep}_t={stamp}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_busted_plain_url() {
        assert_eq!(
            cache_busted("https://cdn.example.com/shirt.png", 42),
            "https://cdn.example.com/shirt.png?_t=42"
        );
    }

    #[test]
    fn test_cache_busted_keeps_existing_query() {
        assert_eq!(
            cache_busted("https://cdn.example.com/shirt.png?v=3", 7),
            "https://cdn.example.com/shirt.png?v=3&_t=7"
        );
    }

    #[test]
    fn test_cache_busted_relative_url() {
        assert_eq!(cache_busted("/img/a.png", 1), "/img/a.png?_t=1");
        assert_eq!(cache_busted("/img/a.png?x=1", 1), "/img/a.png?x=1&_t=1");
    }

    #[test]
    fn test_cache_stamp_is_strictly_increasing() {
        let a = cache_stamp();
        let b = cache_stamp();
        let c = cache_stamp();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_allows_origin() {
        let origin = "https://shop.example.com";

        assert!(!FetchResponse::ok(vec![]).allows_origin(origin));
        assert!(FetchResponse::ok(vec![]).with_any_origin().allows_origin(origin));
        assert!(FetchResponse::ok(vec![])
            .with_header("Access-Control-Allow-Origin", origin)
            .allows_origin(origin));
        assert!(!FetchResponse::ok(vec![])
            .with_header("Access-Control-Allow-Origin", "https://evil.example.com")
            .allows_origin(origin));
    }

    #[test]
    fn test_error_for_status() {
        assert!(FetchResponse::ok(vec![1]).error_for_status("u").is_ok());
        assert_eq!(
            FetchResponse::new(404, vec![]).error_for_status("u"),
            Err(FetchError::Status {
                url: "u".into(),
                status: 404
            })
        );
    }
}
