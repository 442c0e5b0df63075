//! reqwest-backed fetcher

use crate::{FetchError, FetchRequest, FetchResponse, Fetcher, RequestMode, Result};
use std::time::Duration;

/// Production [`Fetcher`] over a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let mut builder = self.client.get(&request.url);

        if let RequestMode::Cors { origin } = &request.mode {
            builder = builder.header(reqwest::header::ORIGIN, origin.as_str());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&request.url, e))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&request.url, e))?;

        tracing::trace!(
            "GET {} -> {} ({} bytes, cors={})",
            request.url,
            status,
            body.len(),
            request.is_cors()
        );

        Ok(headers
            .iter()
            .fold(FetchResponse::new(status, body.to_vec()), |resp, (n, v)| {
                resp.with_header(n, v.as_str())
            }))
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
