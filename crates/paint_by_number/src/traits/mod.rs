use image::{GrayImage, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    types::{EdgeMask, MarkerPosition, Region},
};

/// Trait for gradient-based edge classification
pub trait EdgeDetector: Send + Sync {
    /// Classify every pixel of a luminance image as edge or non-edge
    fn detect(&self, gray: &GrayImage) -> Result<EdgeMask>;
}

/// Trait for edge-noise removal
pub trait EdgeCleaner: Send + Sync {
    /// Produce a cleaned copy of the mask; the input is never modified
    fn clean(&self, mask: &EdgeMask) -> EdgeMask;
}

/// Trait for partitioning an image into enclosed regions
pub trait RegionSegmenter: Send + Sync {
    /// Find regions in `image` bounded by the edges of `mask`
    fn segment(&self, image: &RgbaImage, mask: &EdgeMask) -> Result<Vec<Region>>;
}

/// Trait for choosing numbered marker anchors
pub trait NumberPlacer: Send + Sync {
    /// Number the regions, largest first
    fn place(&self, regions: &[Region]) -> Vec<MarkerPosition>;
}

/// Colour-reduction modes offered by an external reduction service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "colors", rename_all = "snake_case")]
pub enum ColorMode {
    /// Quantize to an exact palette size
    Palette(u8),
    /// Edge-traced vector rendering
    Vector,
}

/// External colour-reduction or vectorization collaborator
pub trait ColorReducer: Send + Sync {
    fn reduce(&self, image: &RgbaImage, mode: ColorMode) -> Result<RgbaImage>;
}

/// Receives the full marker list whenever markers change
pub trait MarkerObserver: Send + Sync {
    fn markers_changed(&self, markers: &[MarkerPosition]);
}
