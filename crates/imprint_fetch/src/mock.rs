//! In-memory fetcher for tests
//!
//! Routes are keyed by URL with the query string removed, so cache-busted
//! requests hit the same route as the bare URL.

use crate::{FetchError, FetchRequest, FetchResponse, Fetcher, Result};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Respond(FetchResponse),
    Fail(String),
}

#[derive(Debug, Clone, Default)]
struct Route {
    /// Reply for any request mode
    any: Option<Reply>,
    /// Reply that overrides `any` for CORS requests
    cors: Option<Reply>,
    delay: Option<Duration>,
}

/// Scriptable [`Fetcher`] that also records every request it sees
#[derive(Debug, Default)]
pub struct MockFetcher {
    routes: Mutex<FxHashMap<String, Route>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `url` with `response`
    pub fn respond(&self, url: &str, response: FetchResponse) -> &Self {
        self.routes.lock().entry(route_key(url)).or_default().any = Some(Reply::Respond(response));
        self
    }

    /// Fail requests for `url` with a transport error
    pub fn fail(&self, url: &str, message: &str) -> &Self {
        self.routes.lock().entry(route_key(url)).or_default().any =
            Some(Reply::Fail(message.to_string()));
        self
    }

    /// Fail only CORS-mode requests for `url`
    pub fn fail_cors(&self, url: &str, message: &str) -> &Self {
        self.routes.lock().entry(route_key(url)).or_default().cors =
            Some(Reply::Fail(message.to_string()));
        self
    }

    /// Delay every reply for `url`
    pub fn delay(&self, url: &str, delay: Duration) -> &Self {
        self.routes.lock().entry(route_key(url)).or_default().delay = Some(delay);
        self
    }

    /// All requests seen so far, in order
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests whose URL (query stripped) matches `url`
    pub fn request_count(&self, url: &str) -> usize {
        let key = route_key(url);
        self.requests
            .lock()
            .iter()
            .filter(|r| route_key(&r.url) == key)
            .count()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.requests.lock().push(request.clone());

        let route = self.routes.lock().get(&route_key(&request.url)).cloned();
        let Some(route) = route else {
            return Err(FetchError::Transport {
                url: request.url,
                message: "no route".to_string(),
            });
        };

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = if request.is_cors() {
            route.cors.or(route.any)
        } else {
            route.any
        };

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(FetchError::Transport {
                url: request.url,
                message,
            }),
            None => Err(FetchError::Transport {
                url: request.url,
                message: "no reply".to_string(),
            }),
        }
    }
}

fn route_key(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}
