//! Imprint Editor
//!
//! Mounts a product, lets the shopper style a text overlay, and flattens the
//! result into one PNG for the fulfillment flow.
//!
//! # Example
//!
//! ```ignore
//! use imprint_app::prelude::*;
//!
//! let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(10))?);
//! let config = EditorConfig::load(Path::new("imprint.toml"))?;
//! let mut editor = Editor::new(fetcher, config, ProductAsset::new("tee-1", url));
//!
//! if editor.mount().await.is_ready() {
//!     editor.begin_editing();
//!     editor.set_text("JOHN");
//!     editor.set_color("#FF0000");
//!     let artifact = editor.capture_image().await;
//! }
//! ```

mod blink;
mod config;
mod editor;

pub use blink::CaretBlinkTask;
pub use config::{
    CaptureConfig, EditorConfig, FontsConfig, ImageConfig, StyleConfig, ViewportConfig,
};
pub use editor::Editor;

/// Prelude module - import everything commonly needed
pub mod prelude {
    pub use crate::config::EditorConfig;
    pub use crate::editor::Editor;

    pub use imprint_capture::{CaptureArtifact, Fidelity, Frame};
    pub use imprint_core::{
        EditMode, EditorEffect, EditorElement, FocusTarget, LoadStatus, Readiness, StyleState,
        Tool,
    };
    pub use imprint_fetch::{Fetcher, HttpFetcher};
    pub use imprint_image::ProductAsset;
    pub use imprint_text::FontDescriptor;
}
