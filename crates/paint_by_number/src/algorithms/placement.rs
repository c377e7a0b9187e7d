use tracing::debug;

use crate::{
    config::PlacementConfig,
    traits::NumberPlacer,
    types::{MarkerPosition, Point, Region},
};

/// Numbers regions largest-first and anchors each number at its most
/// central member pixel.
///
/// A pixel scores `min(distance to each bounding-box side) - centroid_weight
/// * distance to centroid`. This uses the bounding box as a stand-in for the
/// region boundary, so anchors in concave regions can land near an inner
/// edge.
#[derive(Debug, Clone)]
pub struct CentralPointPlacer {
    pub min_region_pixels: usize,
    pub centroid_weight: f64,
}

impl Default for CentralPointPlacer {
    fn default() -> Self {
        Self::from(&PlacementConfig::default())
    }
}

impl From<&PlacementConfig> for CentralPointPlacer {
    fn from(config: &PlacementConfig) -> Self {
        Self {
            min_region_pixels: config.min_region_pixels,
            centroid_weight: config.centroid_weight,
        }
    }
}

impl CentralPointPlacer {
    /// Highest-scoring member pixel; the first one wins on ties.
    pub fn anchor(&self, region: &Region) -> Option<(u32, u32)> {
        let centroid = region.centroid()?;
        let bounds = &region.bounds;

        let mut best: Option<((u32, u32), f64)> = None;
        for &(x, y) in &region.pixels {
            let to_boundary = x
                .saturating_sub(bounds.min_x)
                .min(bounds.max_x.saturating_sub(x))
                .min(y.saturating_sub(bounds.min_y))
                .min(bounds.max_y.saturating_sub(y)) as f64;
            let to_centroid = Point::new(x as f64, y as f64).distance(&centroid);
            let score = to_boundary - self.centroid_weight * to_centroid;

            if best.is_none_or(|(_, top)| score > top) {
                best = Some(((x, y), score));
            }
        }

        best.map(|(point, _)| point)
    }
}

impl NumberPlacer for CentralPointPlacer {
    fn place(&self, regions: &[Region]) -> Vec<MarkerPosition> {
        let mut ordered: Vec<&Region> = regions.iter().collect();
        // Stable: equal sizes keep discovery order
        ordered.sort_by(|a, b| b.pixel_count().cmp(&a.pixel_count()));

        let markers: Vec<MarkerPosition> = ordered
            .into_iter()
            .filter(|region| region.pixel_count() >= self.min_region_pixels)
            .filter_map(|region| self.anchor(region))
            .zip(1u32..)
            .map(|((x, y), number)| MarkerPosition {
                x: x as f64,
                y: y as f64,
                number,
            })
            .collect();

        debug!(regions = regions.len(), markers = markers.len(), "Placed numbers");
        markers
    }
}
