//! Font registry
//!
//! Fetches the font catalog and loads font binaries into the shared
//! [`FontTable`]. Each family is loaded at most once per registry; callers
//! racing on the same family share the one in-flight load.

use crate::descriptor::{parse_catalog, FontDescriptor, FontSource};
use crate::table::{FontFace, FontTable};
use crate::{FontError, Result};
use futures_util::future::join_all;
use imprint_core::LoadStatus;
use imprint_fetch::{FetchRequest, Fetcher};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};

/// Loads fonts on demand and tracks which requested loads are still pending
pub struct FontRegistry<F: Fetcher> {
    fetcher: Arc<F>,
    table: Arc<FontTable>,
    source: FontSource,
    descriptors: RwLock<Vec<FontDescriptor>>,
    /// One cell per family (lowercased)
    loads: Mutex<FxHashMap<String, Arc<OnceCell<LoadStatus>>>>,
    /// Number of loads started but not yet settled
    pending: watch::Sender<usize>,
}

/// Decrements the pending count when a load settles, including on cancel
struct PendingGuard<'a>(&'a watch::Sender<usize>);

impl<'a> PendingGuard<'a> {
    fn enter(pending: &'a watch::Sender<usize>) -> Self {
        pending.send_modify(|n| *n += 1);
        Self(pending)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl<F: Fetcher> FontRegistry<F> {
    pub fn new(fetcher: Arc<F>, table: Arc<FontTable>, source: FontSource) -> Self {
        let (pending, _) = watch::channel(0);
        Self {
            fetcher,
            table,
            source,
            descriptors: RwLock::new(Vec::new()),
            loads: Mutex::new(FxHashMap::default()),
            pending,
        }
    }

    /// The table fonts are activated into
    pub fn table(&self) -> &Arc<FontTable> {
        &self.table
    }

    /// Fetch the font catalog.
    ///
    /// Never fails: any network, status or parse error is logged and yields
    /// an empty list, leaving the previously fetched catalog in place.
    pub async fn list_fonts(&self) -> Vec<FontDescriptor> {
        match self.fetch_catalog().await {
            Ok(fonts) => {
                tracing::debug!("font catalog: {} fonts", fonts.len());
                *self.descriptors.write() = fonts.clone();
                fonts
            }
            Err(e) => {
                tracing::warn!("font catalog unavailable: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_catalog(&self) -> Result<Vec<FontDescriptor>> {
        if self.source.endpoint.is_empty() {
            return Err(FontError::Catalog("no font endpoint configured".to_string()));
        }

        let mut request = FetchRequest::get(&self.source.endpoint);
        if let Some(key) = &self.source.api_key {
            request = request.header("x-api-key", key);
        }

        let response = self
            .fetcher
            .fetch(request)
            .await
            .and_then(|r| r.error_for_status(&self.source.endpoint))
            .map_err(|source| FontError::Fetch {
                family: "<catalog>".to_string(),
                source,
            })?;

        parse_catalog(&response.body)
    }

    /// Descriptors from the last successful [`list_fonts`](Self::list_fonts)
    pub fn descriptors(&self) -> Vec<FontDescriptor> {
        self.descriptors.read().clone()
    }

    /// Catalog entry for `family` (case-insensitive)
    pub fn descriptor(&self, family: &str) -> Option<FontDescriptor> {
        self.descriptors
            .read()
            .iter()
            .find(|d| d.family.eq_ignore_ascii_case(family))
            .cloned()
    }

    /// Load and activate `descriptor`'s font.
    ///
    /// Returns `Ready` without fetching when the family is already in the
    /// table. A failed load is remembered and not retried by this registry.
    pub async fn ensure_loaded(&self, descriptor: &FontDescriptor) -> LoadStatus {
        if self.table.contains(&descriptor.family) {
            return LoadStatus::Ready;
        }

        let cell = {
            let mut loads = self.loads.lock();
            Arc::clone(
                loads
                    .entry(descriptor.family.to_ascii_lowercase())
                    .or_default(),
            )
        };

        *cell
            .get_or_init(|| async {
                let _pending = PendingGuard::enter(&self.pending);
                match self.load_face(descriptor).await {
                    Ok(face) => {
                        self.table.register(face);
                        LoadStatus::Ready
                    }
                    Err(e) => {
                        tracing::warn!("{}", e);
                        LoadStatus::Failed
                    }
                }
            })
            .await
    }

    async fn load_face(&self, descriptor: &FontDescriptor) -> Result<FontFace> {
        tracing::debug!("loading font '{}'", descriptor.family);
        let response = self
            .fetcher
            .fetch(FetchRequest::get(&descriptor.download_url))
            .await
            .and_then(|r| r.error_for_status(&descriptor.download_url))
            .map_err(|source| FontError::Fetch {
                family: descriptor.family.clone(),
                source,
            })?;

        FontFace::from_data(descriptor.family.clone(), response.body, 0)
    }

    /// Load every descriptor concurrently; failures do not affect the others
    pub async fn load_all(&self, descriptors: &[FontDescriptor]) -> Vec<LoadStatus> {
        join_all(descriptors.iter().map(|d| self.ensure_loaded(d))).await
    }

    /// Status of `family` as seen by this registry
    pub fn status(&self, family: &str) -> LoadStatus {
        if self.table.contains(family) {
            return LoadStatus::Ready;
        }
        self.loads
            .lock()
            .get(&family.to_ascii_lowercase())
            .and_then(|cell| cell.get().copied())
            .unwrap_or(LoadStatus::Pending)
    }

    /// No requested load is still in flight
    pub fn is_settled(&self) -> bool {
        *self.pending.borrow() == 0
    }

    /// Wait until every requested font has loaded or failed, for at most
    /// `timeout`. Returns whether the fonts settled in time.
    pub async fn wait_settled(&self, timeout: Duration) -> bool {
        let mut rx = self.pending.subscribe();
        let settled = tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0)).await;
        match settled {
            Ok(Ok(_)) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                tracing::debug!("fonts not settled after {:?}", timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::minimal_font;
    use imprint_fetch::mock::MockFetcher;
    use imprint_fetch::FetchResponse;

    const CATALOG: &str = "https://api.test/v2/font?activeOnly=true";

    fn registry(mock: MockFetcher) -> (FontRegistry<MockFetcher>, Arc<MockFetcher>) {
        let mock = Arc::new(mock);
        let source = FontSource {
            endpoint: CATALOG.to_string(),
            api_key: Some("secret".to_string()),
        };
        let table = Arc::new(FontTable::with_system_fonts(false));
        (FontRegistry::new(Arc::clone(&mock), table, source), mock)
    }

    fn anton() -> FontDescriptor {
        FontDescriptor::new("Anton", "https://fonts.test/anton.ttf")
    }

    #[tokio::test]
    async fn test_list_fonts_sends_api_key() {
        let mock = MockFetcher::new();
        mock.respond(
            CATALOG,
            FetchResponse::ok(
                r#"{"data":[{"family":"Anton","downloadUrl":"https://fonts.test/anton.ttf"}]}"#,
            ),
        );
        let (registry, mock) = registry(mock);

        assert_eq!(registry.list_fonts().await, vec![anton()]);
        assert_eq!(registry.descriptor("anton"), Some(anton()));

        let requests = mock.requests();
        assert!(requests[0]
            .headers
            .contains(&("x-api-key".to_string(), "secret".to_string())));
    }

    #[tokio::test]
    async fn test_list_fonts_failure_is_empty() {
        let mock = MockFetcher::new();
        mock.respond(CATALOG, FetchResponse::new(500, "oops"));
        let (registry, _) = registry(mock);
        assert!(registry.list_fonts().await.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_loaded_activates_once() {
        let mock = MockFetcher::new();
        mock.respond("https://fonts.test/anton.ttf", FetchResponse::ok(minimal_font()));
        let (registry, mock) = registry(mock);

        assert_eq!(registry.ensure_loaded(&anton()).await, LoadStatus::Ready);
        assert_eq!(registry.ensure_loaded(&anton()).await, LoadStatus::Ready);

        assert_eq!(registry.table().activations("Anton"), 1);
        assert_eq!(mock.request_count("https://fonts.test/anton.ttf"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let mock = MockFetcher::new();
        mock.respond("https://fonts.test/anton.ttf", FetchResponse::ok(minimal_font()))
            .delay("https://fonts.test/anton.ttf", Duration::from_millis(20));
        let (registry, mock) = registry(mock);

        let (anton_a, anton_b) = (anton(), anton());
        let (a, b) = tokio::join!(
            registry.ensure_loaded(&anton_a),
            registry.ensure_loaded(&anton_b)
        );
        assert_eq!((a, b), (LoadStatus::Ready, LoadStatus::Ready));
        assert_eq!(mock.request_count("https://fonts.test/anton.ttf"), 1);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_others() {
        let broken = FontDescriptor::new("Broken", "https://fonts.test/broken.ttf");
        let missing = FontDescriptor::new("Missing", "https://fonts.test/missing.ttf");

        let mock = MockFetcher::new();
        mock.respond("https://fonts.test/anton.ttf", FetchResponse::ok(minimal_font()))
            .respond("https://fonts.test/broken.ttf", FetchResponse::ok("nope"))
            .respond("https://fonts.test/missing.ttf", FetchResponse::new(404, ""));
        let (registry, _) = registry(mock);

        let statuses = registry.load_all(&[broken, anton(), missing]).await;
        assert_eq!(
            statuses,
            vec![LoadStatus::Failed, LoadStatus::Ready, LoadStatus::Failed]
        );
        assert_eq!(registry.status("Broken"), LoadStatus::Failed);
        assert_eq!(registry.status("Anton"), LoadStatus::Ready);
        assert_eq!(registry.status("Unrequested"), LoadStatus::Pending);
        assert!(registry.is_settled());
    }

    #[tokio::test]
    async fn test_wait_settled_tracks_in_flight_loads() {
        let mock = MockFetcher::new();
        mock.respond("https://fonts.test/anton.ttf", FetchResponse::ok(minimal_font()))
            .delay("https://fonts.test/anton.ttf", Duration::from_millis(50));
        let (registry, _) = registry(mock);
        let descriptor = anton();

        assert!(registry.wait_settled(Duration::from_millis(10)).await);

        let load = registry.ensure_loaded(&descriptor);
        let wait = async {
            tokio::task::yield_now().await;
            let early = registry.wait_settled(Duration::from_millis(5)).await;
            let late = registry.wait_settled(Duration::from_secs(2)).await;
            (early, late)
        };
        let (status, (early, late)) = tokio::join!(load, wait);

        assert_eq!(status, LoadStatus::Ready);
        assert!(!early);
        assert!(late);
    }
}
