//! Font handling for the Imprint editor
//!
//! This crate provides:
//! - The font catalog (descriptors fetched from the shop's font endpoint)
//! - The process-wide, append-only font table that rendering resolves
//!   families against, with system fallback families via fontdb
//! - The font registry that lazily loads and activates fonts
//! - Text shaping (HarfBuzz via rustybuzz) and glyph outlines for the
//!   software rasterizer

pub mod descriptor;
pub mod registry;
pub mod shaper;
pub mod table;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use descriptor::{parse_catalog, FontDescriptor, FontSource};
pub use registry::FontRegistry;
pub use shaper::{outline_line, shape_line, LineMetrics, ShapedGlyph, ShapedLine};
pub use table::{FontFace, FontTable, ResolvedFont, DEFAULT_FALLBACK_FAMILIES};

use thiserror::Error;

/// Font errors
#[derive(Error, Debug)]
pub enum FontError {
    #[error("Failed to fetch font '{family}': {source}")]
    Fetch {
        family: String,
        #[source]
        source: imprint_fetch::FetchError,
    },

    #[error("Failed to parse font '{family}': {message}")]
    Parse { family: String, message: String },

    #[error("Invalid font catalog: {0}")]
    Catalog(String),
}

pub type Result<T> = std::result::Result<T, FontError>;
