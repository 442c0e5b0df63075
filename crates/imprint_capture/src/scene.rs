//! Composite scene model
//!
//! A [`Scene`] is everything the editor shows: the base image placed in the
//! layout and one text layer resolved from a style snapshot. Both the live
//! preview and the capture render the same scene.

use imprint_core::{Color, StyleState};
use imprint_image::{BaseImage, ObjectFit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Logical geometry of the composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLayout {
    /// Logical width in CSS-like pixels
    #[serde(default = "default_width")]
    pub width: f32,
    /// Logical height; follows the image's aspect ratio when unset
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default = "default_max_image_width")]
    pub max_image_width: f32,
    #[serde(default)]
    pub fit: ObjectFit,
    /// Center of the text block as fractions of width and height
    #[serde(default = "default_text_anchor")]
    pub text_anchor: [f32; 2],
}

fn default_width() -> f32 {
    500.0
}

fn default_max_image_width() -> f32 {
    500.0
}

fn default_text_anchor() -> [f32; 2] {
    [0.5, 0.35]
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: None,
            max_image_width: default_max_image_width(),
            fit: ObjectFit::default(),
            text_anchor: default_text_anchor(),
        }
    }
}

/// Values substituted for invalid style fields, and the font fallback chain
#[derive(Debug, Clone, PartialEq)]
pub struct TextDefaults {
    pub color: Color,
    pub size_px: f32,
    /// Sizes offered by the size picker; empty allows any positive size
    pub allowed_sizes: Vec<f32>,
    pub fallback_families: Vec<String>,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            size_px: 32.0,
            allowed_sizes: Vec::new(),
            fallback_families: imprint_text::DEFAULT_FALLBACK_FAMILIES
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

/// The text overlay, fully resolved
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    /// Displayed lines (the placeholder when the text is blank)
    pub lines: Vec<String>,
    pub family: String,
    pub color: Color,
    pub size_px: f32,
}

impl TextLayer {
    /// Resolve `style` for rendering, substituting defaults for invalid values
    pub fn resolve(style: &StyleState, defaults: &TextDefaults) -> Self {
        Self {
            lines: style.display_text().lines().map(str::to_string).collect(),
            family: style.font_family.clone(),
            color: style.resolved_color(defaults.color),
            size_px: style.resolved_size(&defaults.allowed_sizes, defaults.size_px),
        }
    }
}

/// The composite to render
#[derive(Debug, Clone)]
pub struct Scene {
    pub layout: SceneLayout,
    pub image: Option<Arc<BaseImage>>,
    /// Image fade-in opacity at the time of the snapshot
    pub image_opacity: f32,
    pub style: StyleState,
    pub defaults: TextDefaults,
}

impl Scene {
    pub fn new(
        layout: SceneLayout,
        image: Option<Arc<BaseImage>>,
        style: StyleState,
        defaults: TextDefaults,
    ) -> Self {
        let image_opacity = if image.is_some() { 1.0 } else { 0.0 };
        Self {
            layout,
            image,
            image_opacity,
            style,
            defaults,
        }
    }

    /// Set the image fade-in opacity
    pub fn with_image_opacity(mut self, opacity: f32) -> Self {
        self.image_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// The text layer, re-resolved from the style snapshot
    pub fn text_layer(&self) -> TextLayer {
        TextLayer::resolve(&self.style, &self.defaults)
    }

    /// Logical `(width, height)`
    pub fn logical_size(&self) -> (f32, f32) {
        let height = match (self.layout.height, &self.image) {
            (Some(height), _) => height,
            (None, Some(image)) => self.image_box(image)[3],
            (None, None) => self.layout.width,
        };
        (self.layout.width, height)
    }

    /// Box the base image occupies, `[x, y, width, height]`
    pub fn image_box(&self, image: &BaseImage) -> [f32; 4] {
        imprint_image::image_box(
            image.width(),
            image.height(),
            self.layout.width,
            self.layout.max_image_width,
            self.layout.height,
        )
    }

    /// Copy of the scene with transitional visuals settled, as captured
    pub fn settled(&self) -> Scene {
        let mut scene = self.clone();
        if scene.image.is_some() {
            scene.image_opacity = 1.0;
        }
        scene
    }
}
