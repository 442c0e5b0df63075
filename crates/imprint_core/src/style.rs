//! Live text style
//!
//! [`StyleState`] is a plain record: setters assign and nothing else. Values
//! are checked only when they are resolved for rendering, where invalid ones
//! are replaced by defaults.

use crate::color::Color;
use serde::{Deserialize, Serialize};

/// Shown on the product when the text is blank
pub const PLACEHOLDER_TEXT: &str = "Your Text Here";

/// Current text and its styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleState {
    pub text: String,
    pub font_family: String,
    pub color_hex: String,
    pub size_px: f32,
}

impl StyleState {
    pub fn new(
        text: impl Into<String>,
        font_family: impl Into<String>,
        color_hex: impl Into<String>,
        size_px: f32,
    ) -> Self {
        Self {
            text: text.into(),
            font_family: font_family.into(),
            color_hex: color_hex.into(),
            size_px,
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) {
        self.font_family = family.into();
    }

    pub fn set_color(&mut self, color_hex: impl Into<String>) {
        self.color_hex = color_hex.into();
    }

    pub fn set_size(&mut self, size_px: f32) {
        self.size_px = size_px;
    }

    /// Text as displayed: the placeholder when blank
    pub fn display_text(&self) -> &str {
        if self.text.trim().is_empty() {
            PLACEHOLDER_TEXT
        } else {
            &self.text
        }
    }

    /// Parsed color, or `fallback` when `color_hex` is not a valid color
    pub fn resolved_color(&self, fallback: Color) -> Color {
        Color::parse_hex(&self.color_hex).unwrap_or_else(|| {
            tracing::debug!("invalid color {:?}, using default", self.color_hex);
            fallback
        })
    }

    /// `size_px` when it is one of `allowed`, otherwise `fallback`
    pub fn resolved_size(&self, allowed: &[f32], fallback: f32) -> f32 {
        let valid = self.size_px.is_finite()
            && self.size_px > 0.0
            && (allowed.is_empty() || allowed.iter().any(|s| (s - self.size_px).abs() < f32::EPSILON));
        if valid {
            self.size_px
        } else {
            tracing::debug!("size {} not allowed, using {}", self.size_px, fallback);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> StyleState {
        StyleState::new("JOHN", "Anton", "#FF0000", 32.0)
    }

    #[test]
    fn test_setters_assign_only() {
        let mut s = style();
        s.set_text("Hello");
        s.set_font_family("Nope");
        s.set_color("not a color");
        s.set_size(-3.0);

        assert_eq!(s.text, "Hello");
        assert_eq!(s.font_family, "Nope");
        assert_eq!(s.color_hex, "not a color");
        assert_eq!(s.size_px, -3.0);
    }

    #[test]
    fn test_display_text_placeholder() {
        let mut s = style();
        assert_eq!(s.display_text(), "JOHN");
        s.set_text("   ");
        assert_eq!(s.display_text(), PLACEHOLDER_TEXT);
    }

    #[test]
    fn test_resolved_color_substitutes_default() {
        let mut s = style();
        assert_eq!(s.resolved_color(Color::BLACK), Color::from_rgba8(255, 0, 0, 255));
        s.set_color("chartreuse-ish");
        assert_eq!(s.resolved_color(Color::BLACK), Color::BLACK);
    }

    #[test]
    fn test_resolved_size_bounded_by_allowed_set() {
        let allowed = [16.0, 24.0, 32.0];
        let mut s = style();
        assert_eq!(s.resolved_size(&allowed, 24.0), 32.0);

        s.set_size(33.0);
        assert_eq!(s.resolved_size(&allowed, 24.0), 24.0);

        s.set_size(f32::NAN);
        assert_eq!(s.resolved_size(&allowed, 24.0), 24.0);

        s.set_size(0.0);
        assert_eq!(s.resolved_size(&[], 24.0), 24.0);
    }
}
