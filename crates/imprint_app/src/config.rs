//! Editor configuration file handling (imprint.toml)

use anyhow::{Context, Result};
use imprint_capture::{CaptureSettings, SceneLayout, TextDefaults};
use imprint_core::{Color, StyleState};
use imprint_text::{FontSource, DEFAULT_FALLBACK_FAMILIES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level editor configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub fonts: FontsConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub layout: SceneLayout,
    #[serde(default)]
    pub viewport: ViewportConfig,
}

/// Font catalog and fallback settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FontsConfig {
    /// Catalog endpoint; no catalog is fetched when empty
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_fallback")]
    pub fallback: Vec<String>,
    /// Upper bound on waiting for fonts during capture
    #[serde(default = "default_font_wait_ms")]
    pub wait_ms: u64,
}

fn default_fallback() -> Vec<String> {
    DEFAULT_FALLBACK_FAMILIES
        .iter()
        .map(|f| f.to_string())
        .collect()
}

fn default_font_wait_ms() -> u64 {
    3000
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            fallback: default_fallback(),
            wait_ms: default_font_wait_ms(),
        }
    }
}

/// Network settings for the base image
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Origin sent with cross-origin requests
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_origin() -> String {
    "http://localhost".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Capture timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CaptureConfig {
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Falls back to 2.0 when unset
    #[serde(default)]
    pub device_pixel_ratio: Option<f32>,
}

fn default_settle_ms() -> u64 {
    500
}

fn default_attempt_timeout_ms() -> u64 {
    10_000
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            device_pixel_ratio: None,
        }
    }
}

/// Initial style and picker options
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StyleConfig {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_size")]
    pub size_px: f32,
    #[serde(default = "default_sizes")]
    pub sizes: Vec<f32>,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_color() -> String {
    "#000000".to_string()
}

fn default_size() -> f32 {
    32.0
}

fn default_sizes() -> Vec<f32> {
    vec![16.0, 20.0, 24.0, 28.0, 32.0, 36.0, 40.0, 48.0]
}

fn default_palette() -> Vec<String> {
    [
        "#000000", "#FFFFFF", "#FF0000", "#FFD700", "#008000", "#0000FF", "#800080", "#FFA500",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: default_font_family(),
            color: default_color(),
            size_px: default_size(),
            sizes: default_sizes(),
            palette: default_palette(),
        }
    }
}

/// Host viewport
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ViewportConfig {
    /// Touch device with an on-screen keyboard
    #[serde(default)]
    pub touch: bool,
}

impl EditorConfig {
    /// Load configuration from a file, or from `imprint.toml` in a directory
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join("imprint.toml")
        } else {
            path.to_path_buf()
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EditorConfig = toml::from_str(content).context("Invalid editor config")?;
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn font_source(&self) -> FontSource {
        FontSource {
            endpoint: self.fonts.endpoint.clone(),
            api_key: self.fonts.api_key.clone(),
        }
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            font_wait: Duration::from_millis(self.fonts.wait_ms),
            settle_delay: Duration::from_millis(self.capture.settle_ms),
            attempt_timeout: Duration::from_millis(self.capture.attempt_timeout_ms),
            device_pixel_ratio: self.capture.device_pixel_ratio,
        }
    }

    pub fn text_defaults(&self) -> TextDefaults {
        TextDefaults {
            color: Color::parse_hex(&self.style.color).unwrap_or(Color::BLACK),
            size_px: if self.style.size_px > 0.0 {
                self.style.size_px
            } else {
                default_size()
            },
            allowed_sizes: self.style.sizes.clone(),
            fallback_families: self.fonts.fallback.clone(),
        }
    }

    pub fn initial_style(&self) -> StyleState {
        StyleState::new(
            self.style.text.clone(),
            self.style.font_family.clone(),
            self.style.color.clone(),
            self.style.size_px,
        )
    }
}
