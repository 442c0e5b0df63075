//! Resource load status and editor readiness

use serde::{Deserialize, Serialize};

/// Load status of a single resource (the base image or one font)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadStatus {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl LoadStatus {
    /// Succeeded or definitively failed
    pub fn is_settled(self) -> bool {
        !matches!(self, LoadStatus::Pending)
    }

    pub fn is_ready(self) -> bool {
        matches!(self, LoadStatus::Ready)
    }
}

/// Combined readiness of the image and the requested fonts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub image: LoadStatus,
    /// Every requested font has loaded or failed
    pub fonts_settled: bool,
}

impl Readiness {
    /// Image shown and fonts settled. Failed fonts do not block readiness.
    pub fn is_ready(&self) -> bool {
        self.image.is_ready() && self.fonts_settled
    }

    /// Nothing is still loading, whether or not it succeeded
    pub fn is_settled(&self) -> bool {
        self.image.is_settled() && self.fonts_settled
    }

    /// The image failed for good; the host should offer a reload
    pub fn needs_retry(&self) -> bool {
        self.image == LoadStatus::Failed
    }
}
