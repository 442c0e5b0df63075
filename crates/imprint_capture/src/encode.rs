//! PNG encoding and data URIs

use crate::frame::Frame;
use crate::raster::Fidelity;
use crate::{CaptureError, Result};
use base64::Engine;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use serde::Serialize;

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// PNG compression effort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngCompression {
    /// Smallest output
    Best,
    /// Fastest encode
    Fast,
}

/// A finished capture, handed to the caller and not retained
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureArtifact {
    /// Always `"png"`
    pub encoding: String,
    pub data_uri: String,
    /// Pixel size of the encoded image
    pub width: u32,
    pub height: u32,
    pub fidelity: Fidelity,
}

impl CaptureArtifact {
    /// Encode `frame` and wrap it as a data URI
    pub fn from_frame(
        frame: &Frame,
        compression: PngCompression,
        fidelity: Fidelity,
    ) -> Result<Self> {
        let png = encode_png(frame, compression)?;
        Ok(Self {
            encoding: "png".to_string(),
            data_uri: to_data_uri(&png),
            width: frame.width,
            height: frame.height,
            fidelity,
        })
    }

    /// The encoded PNG bytes
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let payload = self
            .data_uri
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or_else(|| CaptureError::Encode("not a PNG data URI".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| CaptureError::Encode(e.to_string()))
    }
}

/// Encode a straight-RGBA frame as PNG
pub fn encode_png(frame: &Frame, compression: PngCompression) -> Result<Vec<u8>> {
    let (compression, filter) = match compression {
        PngCompression::Best => (CompressionType::Best, FilterType::Adaptive),
        PngCompression::Fast => (CompressionType::Fast, FilterType::NoFilter),
    };

    if frame.data.len() != frame.pixel_count() * 4 {
        return Err(CaptureError::Encode(format!(
            "frame buffer holds {} bytes, expected {}",
            frame.data.len(),
            frame.pixel_count() * 4
        )));
    }

    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, compression, filter)
        .write_image(&frame.data, frame.width, frame.height, ExtendedColorType::Rgba8)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(buf)
}

/// `data:image/png;base64,...`
pub fn to_data_uri(png: &[u8]) -> String {
    let mut uri = String::from(DATA_URI_PREFIX);
    base64::engine::general_purpose::STANDARD.encode_string(png, &mut uri);
    uri
}
