//! Imprint Image
//!
//! Loads the product artwork the text is composited onto.
//!
//! # Features
//!
//! - `data:` URIs and remote URLs (through any [`imprint_fetch::Fetcher`])
//! - Cross-origin-safe loading with a tainted fallback
//! - PNG, JPEG, GIF, WebP and BMP decoding into straight RGBA
//! - CSS-style object-fit placement of the image in the composite
//!
//! # Example
//!
//! ```ignore
//! use imprint_image::{ImageLoader, ProductAsset};
//!
//! let loader = ImageLoader::new(fetcher, "https://shop.example.com");
//! let load = loader.load(&ProductAsset::new("tee-1", "https://cdn.example.com/tee.png")).await;
//! if load.status.is_ready() {
//!     let image = load.image.unwrap();
//!     println!("{}x{}, tainted: {}", image.width(), image.height(), image.is_tainted());
//! }
//! ```

mod error;
mod fit;
mod loader;
mod source;

pub use error::{ImageError, Result};
pub use fit::{calculate_fit_rects, image_box, ObjectFit, ObjectPosition};
pub use loader::{decode, BaseImage, ImageLoad, ImageLoader, ProductAsset};
pub use source::{decode_data_uri, ImageSource};
