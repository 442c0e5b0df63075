//! Base image loader
//!
//! Loading prefers a capture-safe copy of the artwork: a cache-busted CORS
//! request whose response grants this origin access to its pixels. When that
//! is refused, the image is fetched plainly and marked tainted, so it still
//! shows on screen but full-fidelity capture must leave it out.

use crate::source::{decode_data_uri, ImageSource};
use crate::{ImageError, Result};
use image::RgbaImage;
use imprint_core::LoadStatus;
use imprint_fetch::{cache_busted, cache_stamp, FetchRequest, Fetcher};
use std::sync::Arc;

/// The product being personalized. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductAsset {
    pub id: String,
    pub image_url: String,
}

impl ProductAsset {
    pub fn new(id: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image_url: image_url.into(),
        }
    }
}

/// Decoded base artwork
#[derive(Debug, Clone)]
pub struct BaseImage {
    pixels: RgbaImage,
    tainted: bool,
}

impl BaseImage {
    /// A capture-safe image
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            tainted: false,
        }
    }

    /// An image whose pixels may be shown but not read back
    pub fn tainted(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            tainted: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Straight (non-premultiplied) RGBA pixels
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Whether the image was obtained without cross-origin permission
    pub fn is_tainted(&self) -> bool {
        self.tainted
    }
}

/// Outcome of a load
#[derive(Debug, Clone, Default)]
pub struct ImageLoad {
    pub status: LoadStatus,
    pub image: Option<Arc<BaseImage>>,
}

impl ImageLoad {
    pub fn ready(image: BaseImage) -> Self {
        Self {
            status: LoadStatus::Ready,
            image: Some(Arc::new(image)),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: LoadStatus::Failed,
            image: None,
        }
    }
}

/// Loads product artwork on behalf of `origin`
pub struct ImageLoader<F: Fetcher> {
    fetcher: Arc<F>,
    origin: String,
}

impl<F: Fetcher> ImageLoader<F> {
    pub fn new(fetcher: Arc<F>, origin: impl Into<String>) -> Self {
        Self {
            fetcher,
            origin: origin.into(),
        }
    }

    /// Origin sent with CORS requests
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Load the asset's image. Never fails: errors become `Failed`.
    pub async fn load(&self, asset: &ProductAsset) -> ImageLoad {
        match self.try_load(asset).await {
            Ok(image) => {
                tracing::debug!(
                    "product {} image ready: {}x{} (tainted={})",
                    asset.id,
                    image.width(),
                    image.height(),
                    image.is_tainted()
                );
                ImageLoad::ready(image)
            }
            Err(e) => {
                tracing::warn!("product {} image failed: {}", asset.id, e);
                ImageLoad::failed()
            }
        }
    }

    /// Reload after a failure, going through both paths again
    pub async fn retry(&self, asset: &ProductAsset) -> ImageLoad {
        tracing::debug!("retrying image for product {}", asset.id);
        self.load(asset).await
    }

    /// Load the asset's image, reporting why it failed
    pub async fn try_load(&self, asset: &ProductAsset) -> Result<BaseImage> {
        let url = match ImageSource::from_uri(&asset.image_url) {
            None => return Err(ImageError::MissingUrl),
            Some(ImageSource::DataUri(uri)) => {
                return decode(&decode_data_uri(&uri)?).map(BaseImage::new);
            }
            Some(ImageSource::Url(url)) => url,
        };

        match self.load_shared(&url).await {
            Ok(pixels) => Ok(BaseImage::new(pixels)),
            Err(e) => {
                tracing::debug!("CORS load of {} refused ({}), falling back", url, e);
                self.load_plain(&url).await.map(BaseImage::tainted)
            }
        }
    }

    /// Cache-busted CORS request; the response must grant our origin access
    async fn load_shared(&self, url: &str) -> Result<RgbaImage> {
        let busted = cache_busted(url, cache_stamp());
        let response = self
            .fetcher
            .fetch(FetchRequest::cors(&busted, &self.origin))
            .await?
            .error_for_status(&busted)?;

        if !response.allows_origin(&self.origin) {
            return Err(ImageError::NotShared {
                url: url.to_string(),
                origin: self.origin.clone(),
            });
        }
        decode(&response.body)
    }

    /// Plain request for the original URL, no access checks
    async fn load_plain(&self, url: &str) -> Result<RgbaImage> {
        let response = self
            .fetcher
            .fetch(FetchRequest::get(url))
            .await?
            .error_for_status(url)?;
        decode(&response.body)
    }
}

/// Decode any supported format into straight RGBA
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    let pixels = image::load_from_memory(bytes)
        .map_err(|e| ImageError::Decode(e.to_string()))?
        .to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(ImageError::Empty);
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use image::{ImageFormat, Rgba};
    use imprint_fetch::mock::MockFetcher;
    use imprint_fetch::FetchResponse;
    use std::io::Cursor;

    const ORIGIN: &str = "https://shop.test";
    const SHIRT: &str = "https://cdn.test/shirt.png";

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn loader(mock: MockFetcher) -> (ImageLoader<MockFetcher>, Arc<MockFetcher>) {
        let mock = Arc::new(mock);
        (ImageLoader::new(Arc::clone(&mock), ORIGIN), mock)
    }

    fn asset(url: &str) -> ProductAsset {
        ProductAsset::new("tee-1", url)
    }

    #[tokio::test]
    async fn test_cors_load_is_capture_safe() {
        let mock = MockFetcher::new();
        mock.respond(SHIRT, FetchResponse::ok(png(4, 2)).with_any_origin());
        let (loader, mock) = loader(mock);

        let load = loader.load(&asset(SHIRT)).await;
        assert_eq!(load.status, LoadStatus::Ready);
        let image = load.image.unwrap();
        assert!(!image.is_tainted());
        assert_eq!((image.width(), image.height()), (4, 2));

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].is_cors());
        assert!(requests[0].url.starts_with("https://cdn.test/shirt.png?_t="));
    }

    #[tokio::test]
    async fn test_missing_cors_header_falls_back_tainted() {
        let mock = MockFetcher::new();
        mock.respond(SHIRT, FetchResponse::ok(png(3, 3)));
        let (loader, mock) = loader(mock);

        let load = loader.load(&asset(SHIRT)).await;
        assert_eq!(load.status, LoadStatus::Ready);
        assert!(load.image.unwrap().is_tainted());

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[1].is_cors());
        assert_eq!(requests[1].url, SHIRT);
    }

    #[tokio::test]
    async fn test_cors_transport_error_falls_back() {
        let mock = MockFetcher::new();
        mock.respond(SHIRT, FetchResponse::ok(png(3, 3)))
            .fail_cors(SHIRT, "blocked by CORS policy");
        let (loader, _) = loader(mock);

        let load = loader.load(&asset(SHIRT)).await;
        assert!(load.image.unwrap().is_tainted());
    }

    #[tokio::test]
    async fn test_both_paths_failing_is_failed() {
        let mock = MockFetcher::new();
        mock.respond(SHIRT, FetchResponse::new(404, ""));
        let (loader, _) = loader(mock);

        let load = loader.load(&asset(SHIRT)).await;
        assert_eq!(load.status, LoadStatus::Failed);
        assert!(load.image.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_failed() {
        let mock = MockFetcher::new();
        mock.respond(SHIRT, FetchResponse::ok("<html>").with_any_origin());
        let (loader, _) = loader(mock);

        assert_eq!(loader.load(&asset(SHIRT)).await.status, LoadStatus::Failed);
    }

    #[tokio::test]
    async fn test_missing_url_is_failed() {
        let (loader, mock) = loader(MockFetcher::new());
        assert!(matches!(
            loader.try_load(&asset("")).await,
            Err(ImageError::MissingUrl)
        ));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_data_uri_needs_no_network() {
        let uri = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png(2, 5))
        );
        let (loader, mock) = loader(MockFetcher::new());

        let load = loader.load(&asset(&uri)).await;
        let image = load.image.unwrap();
        assert!(!image.is_tainted());
        assert_eq!(image.height(), 5);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let mock = MockFetcher::new();
        mock.fail(SHIRT, "offline");
        let (loader, mock) = loader(mock);
        assert_eq!(loader.load(&asset(SHIRT)).await.status, LoadStatus::Failed);

        mock.respond(SHIRT, FetchResponse::ok(png(1, 1)).with_any_origin());
        assert_eq!(loader.retry(&asset(SHIRT)).await.status, LoadStatus::Ready);
    }
}
