//! Off-screen rasterization of a [`Scene`]

use crate::scene::Scene;
use crate::{CaptureError, Result};
use imprint_image::{calculate_fit_rects, BaseImage, ObjectPosition};
use imprint_text::{outline_line, shape_line, FontTable, LineMetrics};
use serde::Serialize;
use tiny_skia::{
    FillRule, FilterQuality, IntSize, Paint, Pattern, Pixmap, Rect, SpreadMode, Transform,
};

/// What to do with an image obtained without cross-origin permission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaintPolicy {
    /// Fail the render; the result would be unreadable
    Reject,
    /// Render without the image
    Omit,
    /// Draw it (on-screen preview only)
    Draw,
}

/// Capture quality level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fidelity {
    Full,
    Reduced,
}

/// Rasterization parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Device pixels per logical pixel
    pub scale: f32,
    pub anti_alias: bool,
    pub tainted_images: TaintPolicy,
}

impl RasterOptions {
    /// Full-fidelity capture at `device_pixel_ratio`
    pub fn full(device_pixel_ratio: f32) -> Self {
        Self {
            scale: device_pixel_ratio,
            anti_alias: true,
            tainted_images: TaintPolicy::Reject,
        }
    }

    /// Simplified capture: scale 1, no anti-aliasing, no cross-origin reads
    pub fn reduced() -> Self {
        Self {
            scale: 1.0,
            anti_alias: false,
            tainted_images: TaintPolicy::Omit,
        }
    }

    /// On-screen preview, where tainted images may be shown
    pub fn preview(device_pixel_ratio: f32) -> Self {
        Self {
            scale: device_pixel_ratio,
            anti_alias: true,
            tainted_images: TaintPolicy::Draw,
        }
    }
}

/// Renders a scene into a premultiplied RGBA pixmap
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, scene: &Scene, fonts: &FontTable, options: &RasterOptions)
        -> Result<Pixmap>;
}

/// CPU rasterizer on tiny-skia
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareRasterizer;

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(
        &self,
        scene: &Scene,
        fonts: &FontTable,
        options: &RasterOptions,
    ) -> Result<Pixmap> {
        if !(options.scale.is_finite() && options.scale > 0.0) {
            return Err(CaptureError::Raster(format!(
                "invalid scale {}",
                options.scale
            )));
        }

        let (width, height) = scene.logical_size();
        let px_w = (width * options.scale).ceil() as u32;
        let px_h = (height * options.scale).ceil() as u32;
        let mut pixmap = Pixmap::new(px_w, px_h).ok_or_else(|| {
            CaptureError::Raster(format!("cannot allocate {px_w}x{px_h} surface"))
        })?;
        let transform = Transform::from_scale(options.scale, options.scale);

        if let Some(image) = &scene.image {
            if image.is_tainted() {
                match options.tainted_images {
                    TaintPolicy::Reject => return Err(CaptureError::Tainted),
                    TaintPolicy::Omit => {
                        tracing::debug!("omitting cross-origin image from capture");
                    }
                    TaintPolicy::Draw => draw_image(&mut pixmap, scene, image, options, transform)?,
                }
            } else {
                draw_image(&mut pixmap, scene, image, options, transform)?;
            }
        }

        draw_text(&mut pixmap, scene, fonts, options, transform)?;
        Ok(pixmap)
    }
}

fn draw_image(
    pixmap: &mut Pixmap,
    scene: &Scene,
    image: &BaseImage,
    options: &RasterOptions,
    transform: Transform,
) -> Result<()> {
    if scene.image_opacity <= 0.0 {
        return Ok(());
    }

    let source = to_pixmap(image)?;
    let [box_x, box_y, box_w, box_h] = scene.image_box(image);
    let (src, dst) = calculate_fit_rects(
        image.width(),
        image.height(),
        box_w,
        box_h,
        scene.layout.fit,
        ObjectPosition::CENTER,
    );

    let sx = dst[2] / src[2];
    let sy = dst[3] / src[3];
    if !(sx.is_finite() && sy.is_finite()) {
        return Err(CaptureError::Raster("degenerate image placement".to_string()));
    }
    let (dst_x, dst_y) = (box_x + dst[0], box_y + dst[1]);
    let pattern_ts = Transform::from_row(sx, 0.0, 0.0, sy, dst_x - src[0] * sx, dst_y - src[1] * sy);

    let quality = if options.anti_alias {
        FilterQuality::Bilinear
    } else {
        FilterQuality::Nearest
    };
    let mut paint = Paint::default();
    paint.shader = Pattern::new(
        source.as_ref(),
        SpreadMode::Pad,
        quality,
        scene.image_opacity,
        pattern_ts,
    );
    paint.anti_alias = options.anti_alias;

    let rect = Rect::from_xywh(dst_x, dst_y, dst[2], dst[3])
        .ok_or_else(|| CaptureError::Raster("empty image rect".to_string()))?;
    pixmap.fill_rect(rect, &paint, transform, None);
    Ok(())
}

fn draw_text(
    pixmap: &mut Pixmap,
    scene: &Scene,
    fonts: &FontTable,
    options: &RasterOptions,
    transform: Transform,
) -> Result<()> {
    let layer = scene.text_layer();
    let resolved = fonts.resolve(&layer.family, &scene.defaults.fallback_families);
    let Some(face) = resolved.face else {
        tracing::warn!("no font for '{}', text not drawn", layer.family);
        return Ok(());
    };

    let metrics = LineMetrics::for_face(&face, layer.size_px);
    let (width, height) = scene.logical_size();
    let [anchor_x, anchor_y] = scene.layout.text_anchor;
    let block_height = metrics.line_height * layer.lines.len() as f32;
    let top = height * anchor_y - block_height / 2.0;

    let mut paint = Paint::default();
    let [r, g, b, a] = layer.color.to_rgba8();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = options.anti_alias;

    for (i, text) in layer.lines.iter().enumerate() {
        let line = shape_line(&face, text, layer.size_px)
            .map_err(|e| CaptureError::Raster(e.to_string()))?;
        let x = width * anchor_x - line.width / 2.0;
        let baseline = top + metrics.line_height * i as f32 + metrics.ascent;

        if let Some(path) = outline_line(&face, &line, layer.size_px, x, baseline) {
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }
    }
    Ok(())
}

/// Premultiply straight RGBA into a pixmap
fn to_pixmap(image: &BaseImage) -> Result<Pixmap> {
    let pixels = image.pixels();
    let mut data = Vec::with_capacity(pixels.as_raw().len());
    for pixel in pixels.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        data.push((r as f32 * alpha).round() as u8);
        data.push((g as f32 * alpha).round() as u8);
        data.push((b as f32 * alpha).round() as u8);
        data.push(a);
    }

    let size = IntSize::from_wh(pixels.width(), pixels.height())
        .ok_or_else(|| CaptureError::Raster("empty image".to_string()))?;
    Pixmap::from_vec(data, size)
        .ok_or_else(|| CaptureError::Raster("image buffer size mismatch".to_string()))
}
