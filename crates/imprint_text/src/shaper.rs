//! Text shaping and glyph outlines
//!
//! Lines are shaped with rustybuzz and turned into a single tiny-skia path
//! in pixel space, ready to be filled by the rasterizer.

use crate::table::FontFace;
use crate::{FontError, Result};
use rustybuzz::UnicodeBuffer;
use tiny_skia::{Path, PathBuilder};
use ttf_parser::{GlyphId, OutlineBuilder};

/// A positioned glyph in pixels, relative to the line origin on the baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    pub glyph_id: u16,
    pub x: f32,
    pub y: f32,
}

/// One shaped line of text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapedLine {
    pub glyphs: Vec<ShapedGlyph>,
    /// Total advance in pixels
    pub width: f32,
}

/// Vertical metrics of a face at a given size, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    /// Positive distance below the baseline
    pub descent: f32,
    pub line_height: f32,
}

impl LineMetrics {
    pub fn for_face(face: &FontFace, size_px: f32) -> Self {
        let scale = face.scale(size_px);
        let (ascender, descender, line_gap) = face.vertical_metrics();
        let ascent = ascender as f32 * scale;
        let descent = -(descender as f32) * scale;
        let line_height = ascent + descent + line_gap as f32 * scale;
        Self {
            ascent,
            descent,
            // Faces with degenerate metrics still advance one em per line
            line_height: if line_height > 0.0 { line_height } else { size_px },
        }
    }
}

/// Shape a single line of `text` with `face` at `size_px`
pub fn shape_line(face: &FontFace, text: &str, size_px: f32) -> Result<ShapedLine> {
    let rb_face =
        rustybuzz::Face::from_slice(face.data(), face.index()).ok_or_else(|| FontError::Parse {
            family: face.family().to_string(),
            message: "face rejected by shaper".to_string(),
        })?;

    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    let output = rustybuzz::shape(&rb_face, &[], buffer);

    let scale = face.scale(size_px);
    let mut pen_x = 0.0;
    let mut glyphs = Vec::with_capacity(output.len());
    for (info, pos) in output.glyph_infos().iter().zip(output.glyph_positions()) {
        glyphs.push(ShapedGlyph {
            glyph_id: info.glyph_id as u16,
            x: pen_x + pos.x_offset as f32 * scale,
            y: -(pos.y_offset as f32) * scale,
        });
        pen_x += pos.x_advance as f32 * scale;
    }

    tracing::trace!(
        "shaped {:?} with '{}': {} glyphs, {:.1}px",
        text,
        face.family(),
        glyphs.len(),
        pen_x
    );

    Ok(ShapedLine {
        glyphs,
        width: pen_x,
    })
}

/// Outline a shaped line into one path with its origin at (`x`, `baseline`).
/// Returns `None` when no glyph has an outline (spaces, empty faces).
pub fn outline_line(
    face: &FontFace,
    line: &ShapedLine,
    size_px: f32,
    x: f32,
    baseline: f32,
) -> Option<Path> {
    let parsed = ttf_parser::Face::parse(face.data(), face.index()).ok()?;
    let scale = face.scale(size_px);

    let mut sink = GlyphSink {
        builder: PathBuilder::new(),
        scale,
        origin_x: 0.0,
        origin_y: 0.0,
    };
    for glyph in &line.glyphs {
        sink.origin_x = x + glyph.x;
        sink.origin_y = baseline + glyph.y;
        parsed.outline_glyph(GlyphId(glyph.glyph_id), &mut sink);
    }
    sink.builder.finish()
}

/// Maps font units (y up) into pixel space (y down) around a glyph origin
struct GlyphSink {
    builder: PathBuilder,
    scale: f32,
    origin_x: f32,
    origin_y: f32,
}

impl GlyphSink {
    fn px(&self, x: f32) -> f32 {
        self.origin_x + x * self.scale
    }

    fn py(&self, y: f32) -> f32 {
        self.origin_y - y * self.scale
    }
}

impl OutlineBuilder for GlyphSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1, x, y) = (self.px(x1), self.py(y1), self.px(x), self.py(y));
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = (self.px(x1), self.py(y1));
        let (x2, y2) = (self.px(x2), self.py(y2));
        let (x, y) = (self.px(x), self.py(y));
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::minimal_font;

    fn face() -> FontFace {
        FontFace::from_data("Fixture", minimal_font(), 0).unwrap()
    }

    #[test]
    fn test_line_metrics_scale_with_size() {
        let metrics = LineMetrics::for_face(&face(), 50.0);
        assert!((metrics.ascent - 40.0).abs() < 1e-4);
        assert!((metrics.descent - 10.0).abs() < 1e-4);
        assert!((metrics.line_height - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_shape_produces_one_glyph_per_char() {
        let line = shape_line(&face(), "abc", 32.0).unwrap();
        assert_eq!(line.glyphs.len(), 3);
        assert!(line.glyphs.iter().all(|g| g.glyph_id == 1));
        assert!((line.width - 3.0 * 600.0 * 0.032).abs() < 1e-3);
    }

    #[test]
    fn test_outline_of_blank_text_is_none() {
        let face = face();
        let line = shape_line(&face, "   ", 32.0).unwrap();
        assert!(outline_line(&face, &line, 32.0, 10.0, 40.0).is_none());
    }

    #[test]
    fn test_outline_sits_upright_on_the_baseline() {
        let face = face();
        let line = shape_line(&face, "AB", 100.0).unwrap();
        assert!((line.width - 120.0).abs() < 1e-3);

        let path = outline_line(&face, &line, 100.0, 10.0, 80.0).unwrap();
        let bounds = path.bounds();
        // Boxes span x 100..500 and y 0..700 in font units, scale 0.1
        assert!((bounds.left() - 20.0).abs() < 1e-3);
        assert!((bounds.right() - 120.0).abs() < 1e-3);
        assert!((bounds.top() - 10.0).abs() < 1e-3);
        assert!((bounds.bottom() - 80.0).abs() < 1e-3);
    }
}
