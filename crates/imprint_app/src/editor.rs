//! The editor handle
//!
//! One [`Editor`] per mounted product. It owns the style and editing state,
//! loads the base image and the fonts on [`Editor::mount`], and produces the
//! flattened PNG on [`Editor::capture_image`].

use crate::blink::CaretBlinkTask;
use crate::config::EditorConfig;
use imprint_capture::{
    CaptureArtifact, CapturePipeline, Frame, RasterOptions, Rasterizer, Scene, SoftwareRasterizer,
};
use imprint_core::{
    CaretBlink, EditingMachine, EditingState, EditorEffect, FocusTarget, LoadStatus, Readiness,
    StyleState, Tool,
};
use imprint_fetch::Fetcher;
use imprint_image::{ImageLoad, ImageLoader, ProductAsset};
use imprint_text::{FontDescriptor, FontRegistry, FontTable};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// A text-overlay editor for one product
pub struct Editor<F: Fetcher, R: Rasterizer = SoftwareRasterizer> {
    config: EditorConfig,
    asset: ProductAsset,
    fonts: FontRegistry<F>,
    images: ImageLoader<F>,
    pipeline: CapturePipeline<R>,
    image: ImageLoad,
    fonts_settled: bool,
    style: StyleState,
    editing: EditingMachine,
    caret: Arc<Mutex<CaretBlink>>,
    blink_task: Option<CaretBlinkTask>,
}

impl<F: Fetcher> Editor<F> {
    /// Editor rendering with the software rasterizer into the process-wide
    /// font table
    pub fn new(fetcher: Arc<F>, config: EditorConfig, asset: ProductAsset) -> Self {
        Self::with_parts(fetcher, FontTable::global(), SoftwareRasterizer, config, asset)
    }
}

impl<F: Fetcher, R: Rasterizer + 'static> Editor<F, R> {
    pub fn with_parts(
        fetcher: Arc<F>,
        table: Arc<FontTable>,
        rasterizer: R,
        config: EditorConfig,
        asset: ProductAsset,
    ) -> Self {
        let fonts = FontRegistry::new(Arc::clone(&fetcher), table, config.font_source());
        let images = ImageLoader::new(fetcher, config.image.origin.clone());
        let pipeline = CapturePipeline::new(rasterizer, config.capture_settings());

        Self {
            style: config.initial_style(),
            editing: EditingMachine::new(config.viewport.touch),
            fonts,
            images,
            pipeline,
            image: ImageLoad::default(),
            fonts_settled: false,
            caret: Arc::new(Mutex::new(CaretBlink::default())),
            blink_task: None,
            config,
            asset,
        }
    }

    /// Load the font catalog, every font in it and the base image, all
    /// concurrently, and start the caret hint. Returns the resulting
    /// readiness; the editor is interactive once it is ready.
    pub async fn mount(&mut self) -> Readiness {
        tracing::debug!("mounting editor for product {}", self.asset.id);

        let fonts = &self.fonts;
        let load_fonts = async {
            let catalog = fonts.list_fonts().await;
            fonts.load_all(&catalog).await
        };
        let (statuses, image) = tokio::join!(load_fonts, self.images.load(&self.asset));

        let failed = statuses.iter().filter(|s| **s == LoadStatus::Failed).count();
        if failed > 0 {
            tracing::warn!("{} of {} fonts failed to load", failed, statuses.len());
        }

        self.fonts_settled = true;
        self.image = image;
        self.start_blink();

        let readiness = self.readiness();
        if readiness.is_ready() {
            tracing::debug!("editor ready");
        }
        readiness
    }

    /// Load the base image again after a failure
    pub async fn reload_image(&mut self) -> LoadStatus {
        self.image = self.images.retry(&self.asset).await;
        self.image.status
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            image: self.image.status,
            fonts_settled: self.fonts_settled,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness().is_ready()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn asset(&self) -> &ProductAsset {
        &self.asset
    }

    /// Read-only view of the current style
    pub fn style(&self) -> &StyleState {
        &self.style
    }

    /// Fonts offered by the font picker
    pub fn fonts(&self) -> Vec<FontDescriptor> {
        self.fonts.descriptors()
    }

    /// Colors offered by the color picker
    pub fn palette(&self) -> &[String] {
        &self.config.style.palette
    }

    /// Sizes offered by the size picker
    pub fn sizes(&self) -> &[f32] {
        &self.config.style.sizes
    }

    pub fn font_registry(&self) -> &FontRegistry<F> {
        &self.fonts
    }

    // ------------------------------------------------------------------
    // Style
    // ------------------------------------------------------------------

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.style.set_text(text);
        self.editing.text_changed(&self.style.text);
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) -> Vec<EditorEffect> {
        self.style.set_font_family(family);
        self.editing.refocus_input()
    }

    pub fn set_color(&mut self, color_hex: impl Into<String>) -> Vec<EditorEffect> {
        self.style.set_color(color_hex);
        self.editing.refocus_input()
    }

    pub fn set_size(&mut self, size_px: f32) -> Vec<EditorEffect> {
        self.style.set_size(size_px);
        self.editing.refocus_input()
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    pub fn editing_state(&self) -> EditingState {
        self.editing.state()
    }

    /// Caret offset in characters while editing
    pub fn caret(&self) -> Option<usize> {
        self.editing.caret()
    }

    pub fn set_caret(&mut self, offset: usize) {
        self.editing.set_caret(offset);
    }

    /// Whether the blinking caret hint is currently shown
    pub fn caret_visible(&self) -> bool {
        self.caret.lock().is_visible()
    }

    /// Tap on the text, or the toolbar's edit button. Refused until the
    /// image is shown and the fonts have settled.
    pub fn begin_editing(&mut self) -> Vec<EditorEffect> {
        let ready = self.is_ready();
        let effects = self.editing.begin_editing(&self.style.text, ready);
        self.apply(&effects);
        effects
    }

    /// The toolbar's close button
    pub fn close(&mut self) -> Vec<EditorEffect> {
        let effects = self.editing.close();
        self.apply(&effects);
        effects
    }

    /// The text input lost focus to `related`
    pub fn blur(&mut self, related: FocusTarget) -> Vec<EditorEffect> {
        let effects = self.editing.blur(related);
        self.apply(&effects);
        effects
    }

    pub fn select_tool(&mut self, tool: Tool) -> bool {
        self.editing.select_tool(tool)
    }

    fn apply(&mut self, effects: &[EditorEffect]) {
        for effect in effects {
            match effect {
                EditorEffect::StartCaretBlink => self.start_blink(),
                EditorEffect::StopCaretBlink => {
                    self.blink_task = None;
                    self.caret.lock().stop();
                }
                EditorEffect::FocusInput { .. } | EditorEffect::ScrollIntoView { .. } => {}
            }
        }
    }

    fn start_blink(&mut self) {
        if self.editing.is_editing() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_ok() {
            if self.blink_task.is_none() {
                self.blink_task = Some(CaretBlinkTask::spawn(Arc::clone(&self.caret)));
            }
        } else {
            self.caret.lock().start(Instant::now());
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Snapshot of the composite as currently shown
    pub fn scene(&self) -> Scene {
        Scene::new(
            self.config.layout.clone(),
            self.image.image.clone(),
            self.style.clone(),
            self.config.text_defaults(),
        )
    }

    /// Render the live composite, cross-origin image included
    pub fn preview(&self) -> Option<Frame> {
        let options = RasterOptions::preview(self.pipeline.settings().scale());
        match self
            .pipeline
            .rasterizer()
            .rasterize(&self.scene(), self.fonts.table(), &options)
        {
            Ok(pixmap) => Some(Frame::from_pixmap(&pixmap)),
            Err(e) => {
                tracing::warn!("preview failed: {}", e);
                None
            }
        }
    }

    /// Flatten the composite into a PNG data URI.
    ///
    /// `None` when the image is not loaded or capture failed even at reduced
    /// fidelity. Overlapping calls run one after another.
    pub async fn capture_image(&self) -> Option<CaptureArtifact> {
        if !self.image.status.is_ready() {
            tracing::debug!("capture requested before the image is ready");
            return None;
        }
        self.pipeline.capture(&self.scene(), &self.fonts).await
    }
}
