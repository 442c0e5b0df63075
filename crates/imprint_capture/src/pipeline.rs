//! Capture pipeline
//!
//! ```text
//!   ensure selected font ─▶ wait fonts (bounded) ─▶ settle delay
//!       ─▶ rasterize (full) ─▶ encode PNG ─▶ artifact
//!   any failure or attempt timeout
//!       ─▶ rasterize (reduced) ─▶ encode PNG (fast) ─▶ artifact | None
//! ```

use crate::encode::{CaptureArtifact, PngCompression};
use crate::frame::Frame;
use crate::raster::{Fidelity, RasterOptions, Rasterizer};
use crate::scene::Scene;
use crate::{CaptureError, Result};
use imprint_fetch::Fetcher;
use imprint_text::FontRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Scale used when the device pixel ratio is unknown
pub const DEFAULT_DEVICE_PIXEL_RATIO: f32 = 2.0;

/// Upper bound on the capture scale
pub const MAX_DEVICE_PIXEL_RATIO: f32 = 4.0;

/// Timing and quality knobs
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Upper bound on waiting for font loads to settle
    pub font_wait: Duration,
    /// Pause for layout reflow before rasterizing
    pub settle_delay: Duration,
    /// Upper bound on the whole full-fidelity attempt
    pub attempt_timeout: Duration,
    /// `None` when the host does not know it
    pub device_pixel_ratio: Option<f32>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            font_wait: Duration::from_secs(3),
            settle_delay: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(10),
            device_pixel_ratio: None,
        }
    }
}

impl CaptureSettings {
    /// Effective full-fidelity scale, at most [`MAX_DEVICE_PIXEL_RATIO`]
    pub fn scale(&self) -> f32 {
        match self.device_pixel_ratio {
            Some(dpr) if dpr.is_finite() && dpr > 0.0 => dpr.min(MAX_DEVICE_PIXEL_RATIO),
            _ => DEFAULT_DEVICE_PIXEL_RATIO,
        }
    }
}

/// Produces PNG captures of a scene, one at a time
pub struct CapturePipeline<R: Rasterizer> {
    rasterizer: Arc<R>,
    settings: CaptureSettings,
    /// Serializes overlapping capture requests
    in_flight: Mutex<()>,
}

impl<R: Rasterizer + 'static> CapturePipeline<R> {
    pub fn new(rasterizer: R, settings: CaptureSettings) -> Self {
        Self {
            rasterizer: Arc::new(rasterizer),
            settings,
            in_flight: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Capture `scene`. Returns `None` when the image is not loaded or both
    /// the full and the reduced attempt fail; never errors or panics.
    pub async fn capture<F: Fetcher>(
        &self,
        scene: &Scene,
        fonts: &FontRegistry<F>,
    ) -> Option<CaptureArtifact> {
        if scene.image.is_none() {
            tracing::debug!("capture skipped: {}", CaptureError::ImageNotReady);
            return None;
        }

        let _guard = self.in_flight.lock().await;

        let full = tokio::time::timeout(self.settings.attempt_timeout, self.full(scene, fonts))
            .await
            .unwrap_or(Err(CaptureError::Timeout(self.settings.attempt_timeout)));

        match full {
            Ok(artifact) => return Some(artifact),
            Err(e) => tracing::warn!("capture failed, retrying at reduced fidelity: {}", e),
        }

        match self.reduced(scene, fonts).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::warn!("reduced-fidelity capture failed: {}", e);
                None
            }
        }
    }

    async fn full<F: Fetcher>(
        &self,
        scene: &Scene,
        fonts: &FontRegistry<F>,
    ) -> Result<CaptureArtifact> {
        // Font loading shares one budget; whatever is active when it runs
        // out is used, the rest resolves through the fallback chain
        let deadline = Instant::now() + self.settings.font_wait;
        let family = &scene.style.font_family;
        if let Some(descriptor) = fonts.descriptor(family) {
            let load = tokio::time::timeout_at(deadline, fonts.ensure_loaded(&descriptor)).await;
            if load.is_err() {
                tracing::debug!("font '{}' still loading, capturing with fallback", family);
            }
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !fonts.wait_settled(remaining).await {
            tracing::debug!("capturing with fonts still loading");
        }
        tokio::time::sleep(self.settings.settle_delay).await;

        let options = RasterOptions::full(self.settings.scale());
        self.render(scene, fonts, options, PngCompression::Best, Fidelity::Full)
            .await
    }

    async fn reduced<F: Fetcher>(
        &self,
        scene: &Scene,
        fonts: &FontRegistry<F>,
    ) -> Result<CaptureArtifact> {
        let options = RasterOptions::reduced();
        self.render(scene, fonts, options, PngCompression::Fast, Fidelity::Reduced)
            .await
    }

    /// Rasterize and encode on the blocking pool
    async fn render<F: Fetcher>(
        &self,
        scene: &Scene,
        fonts: &FontRegistry<F>,
        options: RasterOptions,
        compression: PngCompression,
        fidelity: Fidelity,
    ) -> Result<CaptureArtifact> {
        let scene = scene.settled();
        let table = Arc::clone(fonts.table());
        let rasterizer = Arc::clone(&self.rasterizer);

        tokio::task::spawn_blocking(move || {
            let pixmap = rasterizer.rasterize(&scene, &table, &options)?;
            let frame = Frame::from_pixmap(&pixmap);
            tracing::debug!(
                "captured {}x{} at {:?} fidelity",
                frame.width,
                frame.height,
                fidelity
            );
            CaptureArtifact::from_frame(&frame, compression, fidelity)
        })
        .await
        .map_err(|e| CaptureError::Raster(format!("render task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{SoftwareRasterizer, TaintPolicy};
    use crate::scene::{SceneLayout, TextDefaults};
    use image::{Rgba, RgbaImage};
    use imprint_core::StyleState;
    use imprint_fetch::mock::MockFetcher;
    use imprint_fetch::FetchResponse;
    use imprint_image::BaseImage;
    use imprint_text::fixtures::minimal_font;
    use imprint_text::{FontSource, FontTable};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tiny_skia::Pixmap;

    fn settings() -> CaptureSettings {
        CaptureSettings {
            font_wait: Duration::from_millis(50),
            settle_delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(2),
            device_pixel_ratio: Some(1.0),
        }
    }

    fn registry() -> FontRegistry<MockFetcher> {
        FontRegistry::new(
            Arc::new(MockFetcher::new()),
            Arc::new(FontTable::with_system_fonts(false)),
            FontSource::default(),
        )
    }

    fn scene(image: Option<BaseImage>) -> Scene {
        let layout = SceneLayout {
            width: 8.0,
            ..SceneLayout::default()
        };
        Scene::new(
            layout,
            image.map(Arc::new),
            StyleState::new("Hi", "Anton", "#fff", 16.0),
            TextDefaults::default(),
        )
    }

    fn blue() -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]))
    }

    /// Fails every full-fidelity render, counts calls
    struct FlakyRasterizer {
        calls: AtomicUsize,
    }

    impl Rasterizer for FlakyRasterizer {
        fn rasterize(
            &self,
            scene: &Scene,
            fonts: &FontTable,
            options: &RasterOptions,
        ) -> Result<Pixmap> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if options.tainted_images == TaintPolicy::Reject {
                return Err(CaptureError::Raster("GPU lost".to_string()));
            }
            SoftwareRasterizer.rasterize(scene, fonts, options)
        }
    }

    /// Blocks the thread on every full-fidelity render
    struct StallingRasterizer;

    impl Rasterizer for StallingRasterizer {
        fn rasterize(
            &self,
            scene: &Scene,
            fonts: &FontTable,
            options: &RasterOptions,
        ) -> Result<Pixmap> {
            if options.tainted_images == TaintPolicy::Reject {
                std::thread::sleep(Duration::from_millis(400));
            }
            SoftwareRasterizer.rasterize(scene, fonts, options)
        }
    }

    /// Registry whose catalog lists Anton, served after `font_delay`
    async fn slow_font_registry(font_delay: Duration) -> FontRegistry<MockFetcher> {
        const CATALOG: &str = "https://api.test/v2/font";
        const ANTON: &str = "https://fonts.test/anton.ttf";

        let mock = MockFetcher::new();
        mock.respond(
            CATALOG,
            FetchResponse::ok(format!(
                r#"[{{"family":"Anton","downloadUrl":"{ANTON}"}}]"#
            )),
        )
        .respond(ANTON, FetchResponse::ok(minimal_font()))
        .delay(ANTON, font_delay);

        let registry = FontRegistry::new(
            Arc::new(mock),
            Arc::new(FontTable::with_system_fonts(false)),
            FontSource {
                endpoint: CATALOG.to_string(),
                api_key: None,
            },
        );
        assert_eq!(registry.list_fonts().await.len(), 1);
        registry
    }

    struct BrokenRasterizer;

    impl Rasterizer for BrokenRasterizer {
        fn rasterize(&self, _: &Scene, _: &FontTable, _: &RasterOptions) -> Result<Pixmap> {
            Err(CaptureError::Raster("always".to_string()))
        }
    }

    #[tokio::test]
    async fn test_capture_happy_path() {
        let pipeline = CapturePipeline::new(SoftwareRasterizer, settings());
        let artifact = pipeline
            .capture(&scene(Some(BaseImage::new(blue()))), &registry())
            .await
            .unwrap();

        assert_eq!(artifact.fidelity, Fidelity::Full);
        assert_eq!((artifact.width, artifact.height), (8, 8));
        assert!(artifact.data_uri.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_capture_without_image_is_none() {
        let pipeline = CapturePipeline::new(SoftwareRasterizer, settings());
        assert!(pipeline.capture(&scene(None), &registry()).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_dpr_defaults_to_two() {
        let settings = CaptureSettings {
            device_pixel_ratio: None,
            ..settings()
        };
        assert_eq!(settings.scale(), 2.0);

        let pipeline = CapturePipeline::new(SoftwareRasterizer, settings);
        let artifact = pipeline
            .capture(&scene(Some(BaseImage::new(blue()))), &registry())
            .await
            .unwrap();
        assert_eq!(artifact.width, 16);
    }

    #[tokio::test]
    async fn test_tainted_image_retries_reduced() {
        let pipeline = CapturePipeline::new(SoftwareRasterizer, settings());
        let artifact = pipeline
            .capture(&scene(Some(BaseImage::tainted(blue()))), &registry())
            .await
            .unwrap();
        assert_eq!(artifact.fidelity, Fidelity::Reduced);
    }

    #[tokio::test]
    async fn test_raster_failure_retries_once() {
        let rasterizer = FlakyRasterizer {
            calls: AtomicUsize::new(0),
        };
        let pipeline = CapturePipeline::new(rasterizer, settings());
        let artifact = pipeline
            .capture(&scene(Some(BaseImage::new(blue()))), &registry())
            .await
            .unwrap();

        assert_eq!(artifact.fidelity, Fidelity::Reduced);
        assert_eq!(pipeline.rasterizer().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_both_attempts_failing_is_none() {
        let pipeline = CapturePipeline::new(BrokenRasterizer, settings());
        assert!(pipeline
            .capture(&scene(Some(BaseImage::new(blue()))), &registry())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_slow_attempt_times_out_into_retry() {
        let settings = CaptureSettings {
            settle_delay: Duration::from_millis(200),
            attempt_timeout: Duration::from_millis(20),
            ..settings()
        };
        let pipeline = CapturePipeline::new(SoftwareRasterizer, settings);
        let artifact = pipeline
            .capture(&scene(Some(BaseImage::new(blue()))), &registry())
            .await
            .unwrap();
        assert_eq!(artifact.fidelity, Fidelity::Reduced);
    }

    #[tokio::test]
    async fn test_hung_font_costs_only_the_font_wait() {
        let registry = slow_font_registry(Duration::from_secs(5)).await;
        let settings = CaptureSettings {
            font_wait: Duration::from_millis(50),
            attempt_timeout: Duration::from_millis(800),
            device_pixel_ratio: Some(2.0),
            ..settings()
        };
        let pipeline = CapturePipeline::new(SoftwareRasterizer, settings);

        let started = std::time::Instant::now();
        let artifact = pipeline
            .capture(&scene(Some(BaseImage::new(blue()))), &registry)
            .await
            .unwrap();

        assert_eq!(artifact.fidelity, Fidelity::Full);
        assert_eq!(artifact.width, 16);
        assert!(started.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_selected_font_loaded_before_rendering() {
        let registry = slow_font_registry(Duration::from_millis(10)).await;
        let pipeline = CapturePipeline::new(SoftwareRasterizer, settings());

        pipeline
            .capture(&scene(Some(BaseImage::new(blue()))), &registry)
            .await
            .unwrap();
        assert!(registry.table().contains("Anton"));
    }

    #[test]
    fn test_device_pixel_ratio_is_clamped() {
        let settings = CaptureSettings {
            device_pixel_ratio: Some(50.0),
            ..settings()
        };
        assert_eq!(settings.scale(), MAX_DEVICE_PIXEL_RATIO);
    }

    #[tokio::test]
    async fn test_attempt_timeout_preempts_a_stalled_render() {
        let settings = CaptureSettings {
            attempt_timeout: Duration::from_millis(100),
            ..settings()
        };
        let pipeline = CapturePipeline::new(StallingRasterizer, settings);

        let started = std::time::Instant::now();
        let artifact = pipeline
            .capture(&scene(Some(BaseImage::new(blue()))), &registry())
            .await
            .unwrap();

        assert_eq!(artifact.fidelity, Fidelity::Reduced);
        assert!(started.elapsed() < Duration::from_millis(350));
    }
}
