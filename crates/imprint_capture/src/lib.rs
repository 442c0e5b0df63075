//! Imprint Capture
//!
//! Flattens the product image and the styled text overlay into one PNG.
//!
//! The composite is described by a [`Scene`] and drawn off-screen by a
//! [`Rasterizer`] (the default [`SoftwareRasterizer`] renders with
//! tiny-skia). [`CapturePipeline`] orders the capture steps: font settle,
//! layout settle delay, full-fidelity attempt, and a single reduced-fidelity
//! retry.
//!
//! # Example
//!
//! ```ignore
//! use imprint_capture::{CapturePipeline, CaptureSettings, SoftwareRasterizer};
//!
//! let pipeline = CapturePipeline::new(SoftwareRasterizer, CaptureSettings::default());
//! if let Some(artifact) = pipeline.capture(&scene, &fonts).await {
//!     assert!(artifact.data_uri.starts_with("data:image/png;base64,"));
//! }
//! ```

mod encode;
mod frame;
mod pipeline;
mod raster;
mod scene;

pub use encode::{encode_png, to_data_uri, CaptureArtifact, PngCompression};
pub use frame::Frame;
pub use pipeline::{
    CapturePipeline, CaptureSettings, DEFAULT_DEVICE_PIXEL_RATIO, MAX_DEVICE_PIXEL_RATIO,
};
pub use raster::{Fidelity, RasterOptions, Rasterizer, SoftwareRasterizer, TaintPolicy};
pub use scene::{Scene, SceneLayout, TextDefaults, TextLayer};

use std::time::Duration;
use thiserror::Error;

/// Capture errors. These never reach the host: a failed capture is retried
/// once and then reported as `None`.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Base image is not ready")]
    ImageNotReady,

    /// Drawing the image would read pixels from a non-shared origin
    #[error("Base image is cross-origin and may not be read back")]
    Tainted,

    #[error("Rasterization failed: {0}")]
    Raster(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Capture attempt timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
