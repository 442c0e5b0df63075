//! Imprint CLI
//!
//! Mounts a product image, applies a text overlay and writes the flattened
//! PNG, the same way the storefront editor does on "add to cart".

use anyhow::{bail, Context, Result};
use clap::Parser;
use imprint_app::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Render a personalized product image
#[derive(Parser, Debug)]
#[command(name = "imprint")]
#[command(about = "Render a text overlay onto a product image")]
#[command(version)]
struct Args {
    /// Product image URL (http(s) or data URI)
    image: String,

    /// Config file, or a directory containing imprint.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overlay text
    #[arg(short, long)]
    text: Option<String>,

    /// Font family
    #[arg(short, long)]
    font: Option<String>,

    /// Text color as hex
    #[arg(long)]
    color: Option<String>,

    /// Text size in CSS pixels
    #[arg(short, long)]
    size: Option<f32>,

    /// Device pixel ratio of the capture
    #[arg(long)]
    dpr: Option<f32>,

    /// Product identifier for logs
    #[arg(long, default_value = "cli")]
    product: String,

    /// Output file
    #[arg(short, long, default_value = "imprint.png")]
    output: PathBuf,

    /// Write the data URI instead of PNG bytes
    #[arg(long)]
    data_uri: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    if args.dpr.is_some() {
        config.capture.device_pixel_ratio = args.dpr;
    }

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let fetcher = Arc::new(
        HttpFetcher::new(Duration::from_millis(config.image.timeout_ms))
            .context("Failed to create HTTP client")?,
    );
    let asset = ProductAsset::new(args.product.clone(), args.image.clone());
    let mut editor = Editor::new(fetcher, config, asset);

    let mut readiness = editor.mount().await;
    if readiness.needs_retry() {
        tracing::warn!("image failed to load, retrying once");
        editor.reload_image().await;
        readiness = editor.readiness();
    }
    if !readiness.is_ready() {
        bail!("Could not load product image {}", args.image);
    }

    editor.begin_editing();
    if let Some(text) = args.text {
        editor.set_text(text);
    }
    if let Some(font) = args.font {
        editor.set_font_family(font);
    }
    if let Some(color) = args.color {
        editor.set_color(color);
    }
    if let Some(size) = args.size {
        editor.set_size(size);
    }
    editor.close();

    let Some(artifact) = editor.capture_image().await else {
        bail!("Capture failed");
    };
    tracing::info!(
        "captured {}x{} ({:?} fidelity)",
        artifact.width,
        artifact.height,
        artifact.fidelity
    );

    if args.data_uri {
        std::fs::write(&args.output, &artifact.data_uri)
    } else {
        std::fs::write(&args.output, artifact.png_bytes()?)
    }
    .with_context(|| format!("Failed to write {}", args.output.display()))?;

    tracing::info!("wrote {}", args.output.display());
    Ok(())
}
