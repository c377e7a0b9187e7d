use std::collections::{HashMap, VecDeque};

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::{
    config::SegmentationConfig,
    error::{PaintError, Result},
    traits::RegionSegmenter,
    types::{BoundingBox, EdgeMask, Region},
};

const BOUNDARY: [u8; 3] = [0, 0, 0];

/// Paint edge pixels black over a copy of the original colours.
///
/// Pure black in the result marks a boundary, whether it came from the edge
/// mask or was already black in the image.
pub fn combine_with_edges(image: &RgbaImage, mask: &EdgeMask) -> Result<RgbaImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PaintError::EmptyImage);
    }
    if image.dimensions() != (mask.width(), mask.height()) {
        return Err(PaintError::InvalidDimensions {
            width: mask.width(),
            height: mask.height(),
        });
    }

    let mut combined = image.clone();
    for (x, y, pixel) in combined.enumerate_pixels_mut() {
        if mask.is_edge(x, y) {
            *pixel = Rgba([0, 0, 0, pixel[3]]);
        }
    }
    Ok(combined)
}

fn rgb(pixel: &Rgba<u8>) -> [u8; 3] {
    [pixel[0], pixel[1], pixel[2]]
}

/// Most frequent exact colour in the square window of `radius` around
/// `(x, y)`, ignoring boundary black. Ties go to the colour that reached the
/// winning count first in raster order.
pub fn dominant_color(image: &RgbaImage, x: u32, y: u32, radius: u32) -> Option<[u8; 3]> {
    let (width, height) = image.dimensions();
    let radius = radius as i64;
    let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
    let mut best: Option<([u8; 3], usize)> = None;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }

            let color = rgb(image.get_pixel(nx as u32, ny as u32));
            if color == BOUNDARY {
                continue;
            }

            let count = counts.entry(color).or_insert(0);
            *count += 1;
            if best.is_none_or(|(_, max)| *count > max) {
                best = Some((color, *count));
            }
        }
    }

    best.map(|(color, _)| color)
}

/// Breadth-first flood fill of enclosed, non-background areas.
///
/// Seeds are visited in raster order over the interior (one-pixel inset) and
/// expanded with 4-connectivity in the order +x, -x, +y, -y, so results are
/// reproducible for a given input.
#[derive(Debug, Clone)]
pub struct FloodFillSegmenter {
    pub sample_radius: u32,
    pub min_region_pixels: usize,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    pub background_cutoff: u8,
}

impl Default for FloodFillSegmenter {
    fn default() -> Self {
        Self::from(&SegmentationConfig::default())
    }
}

impl From<&SegmentationConfig> for FloodFillSegmenter {
    fn from(config: &SegmentationConfig) -> Self {
        Self {
            sample_radius: config.sample_radius,
            min_region_pixels: config.min_region_pixels,
            min_aspect_ratio: config.min_aspect_ratio,
            max_aspect_ratio: config.max_aspect_ratio,
            background_cutoff: config.background_cutoff,
        }
    }
}

impl FloodFillSegmenter {
    fn is_background(&self, color: [u8; 3]) -> bool {
        color.iter().all(|&c| c > self.background_cutoff)
    }

    fn accepts(&self, pixel_count: usize, bounds: &BoundingBox) -> bool {
        if pixel_count <= self.min_region_pixels {
            return false;
        }
        match bounds.aspect_ratio() {
            Some(ratio) => ratio > self.min_aspect_ratio && ratio < self.max_aspect_ratio,
            None => false,
        }
    }

    /// Segment an already combined buffer where `(0, 0, 0)` marks boundaries.
    pub fn segment_combined(&self, combined: &RgbaImage) -> Vec<Region> {
        let (width, height) = combined.dimensions();
        let index = |x: u32, y: u32| (y * width + x) as usize;

        let boundary: Vec<bool> = combined.pixels().map(|p| rgb(p) == BOUNDARY).collect();
        let mut visited = vec![false; boundary.len()];
        let mut regions = Vec::new();
        let mut rejected = 0usize;

        if width < 3 || height < 3 {
            return regions;
        }

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let seed = index(x, y);
                if visited[seed] || boundary[seed] {
                    continue;
                }

                let color = dominant_color(combined, x, y, self.sample_radius).unwrap_or(BOUNDARY);
                if self.is_background(color) {
                    continue;
                }

                let mut pixels = Vec::new();
                let mut bounds = BoundingBox::at(x, y);
                let mut queue = VecDeque::from([(x, y)]);
                visited[seed] = true;

                while let Some((px, py)) = queue.pop_front() {
                    bounds.include(px, py);
                    pixels.push((px, py));

                    let neighbors = [
                        (px as i64 + 1, py as i64),
                        (px as i64 - 1, py as i64),
                        (px as i64, py as i64 + 1),
                        (px as i64, py as i64 - 1),
                    ];
                    for (nx, ny) in neighbors {
                        if nx <= 0 || ny <= 0 || nx >= width as i64 - 1 || ny >= height as i64 - 1 {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        let next = index(nx, ny);
                        if !boundary[next] && !visited[next] {
                            visited[next] = true;
                            queue.push_back((nx, ny));
                        }
                    }
                }

                if self.accepts(pixels.len(), &bounds) {
                    regions.push(Region { color, pixels, bounds });
                } else {
                    rejected += 1;
                }
            }
        }

        debug!(accepted = regions.len(), rejected, "Segmented regions");
        regions
    }
}

impl RegionSegmenter for FloodFillSegmenter {
    fn segment(&self, image: &RgbaImage, mask: &EdgeMask) -> Result<Vec<Region>> {
        let combined = combine_with_edges(image, mask)?;
        Ok(self.segment_combined(&combined))
    }
}
