use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use tracing::debug;

use crate::{
    config::EdgeConfig,
    error::{PaintError, Result},
    traits::EdgeDetector,
    types::EdgeMask,
};

/// Sobel gradient-magnitude detector with an image-relative threshold.
///
/// A pixel is an edge when its magnitude exceeds `threshold_ratio` times the
/// strongest magnitude in the image. The one-pixel image border is never an
/// edge.
#[derive(Debug, Clone)]
pub struct GradientEdgeDetector {
    pub threshold_ratio: f64,
}

impl Default for GradientEdgeDetector {
    fn default() -> Self {
        Self::from(&EdgeConfig::default())
    }
}

impl From<&EdgeConfig> for GradientEdgeDetector {
    fn from(config: &EdgeConfig) -> Self {
        Self {
            threshold_ratio: config.threshold_ratio,
        }
    }
}

impl GradientEdgeDetector {
    /// Per-pixel gradient magnitudes (row-major) and their maximum.
    /// Border pixels are left at zero.
    pub fn magnitudes(&self, gray: &GrayImage) -> (Vec<f64>, f64) {
        let (width, height) = gray.dimensions();
        let mut magnitudes = vec![0.0; width as usize * height as usize];
        let mut max_magnitude = 0.0f64;

        if width < 3 || height < 3 {
            return (magnitudes, max_magnitude);
        }

        let gx = horizontal_sobel(gray);
        let gy = vertical_sobel(gray);

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let dx = gx.get_pixel(x, y)[0] as f64;
                let dy = gy.get_pixel(x, y)[0] as f64;
                let magnitude = (dx * dx + dy * dy).sqrt();
                magnitudes[(y * width + x) as usize] = magnitude;
                max_magnitude = max_magnitude.max(magnitude);
            }
        }

        (magnitudes, max_magnitude)
    }
}

impl EdgeDetector for GradientEdgeDetector {
    fn detect(&self, gray: &GrayImage) -> Result<EdgeMask> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(PaintError::EmptyImage);
        }

        let (magnitudes, max_magnitude) = self.magnitudes(gray);
        let threshold = max_magnitude * self.threshold_ratio;

        let mut mask = EdgeMask::blank(width, height);
        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                if magnitudes[(y * width + x) as usize] > threshold {
                    mask.set_edge(x, y, true);
                }
            }
        }

        debug!(
            width,
            height,
            max_magnitude,
            threshold,
            edges = mask.edge_count(),
            "Detected gradient edges"
        );

        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Solid `level` image with a black frame `thickness` pixels wide.
    fn framed_image(width: u32, height: u32, thickness: u32, level: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let on_frame = x < thickness
                || y < thickness
                || x >= width - thickness
                || y >= height - thickness;
            if on_frame { Luma([0]) } else { Luma([level]) }
        })
    }

    #[test]
    fn test_frame_is_edge_interior_is_not() {
        let (width, height) = (30, 20);
        let image = framed_image(width, height, 2, 29);
        let mask = GradientEdgeDetector::default()
            .detect(&image)
            .expect("Should detect");

        assert_eq!(mask.width(), width);
        assert_eq!(mask.height(), height);

        // Drawn frame pixels inside the excluded image border
        for x in 2..width - 2 {
            assert!(mask.is_edge(x, 1), "({x}, 1) should be an edge");
            assert!(mask.is_edge(x, height - 2), "({x}, {}) should be an edge", height - 2);
        }
        for y in 2..height - 2 {
            assert!(mask.is_edge(1, y), "(1, {y}) should be an edge");
            assert!(mask.is_edge(width - 2, y));
        }

        // Interior two or more pixels away from the frame
        for y in 4..height - 4 {
            for x in 4..width - 4 {
                assert!(!mask.is_edge(x, y), "({x}, {y}) should not be an edge");
            }
        }
    }

    #[test]
    fn test_border_never_edge() {
        let image = GrayImage::from_fn(12, 12, |x, _| Luma([if x % 2 == 0 { 0 } else { 255 }]));
        let mask = GradientEdgeDetector::default()
            .detect(&image)
            .expect("Should detect");

        for i in 0..12 {
            assert!(!mask.is_edge(i, 0));
            assert!(!mask.is_edge(i, 11));
            assert!(!mask.is_edge(0, i));
            assert!(!mask.is_edge(11, i));
        }
    }

    #[test]
    fn test_uniform_image_has_no_edges() {
        let image = GrayImage::from_pixel(16, 16, Luma([128]));
        let mask = GradientEdgeDetector::default()
            .detect(&image)
            .expect("Should detect");
        assert_eq!(mask.edge_count(), 0);
    }

    #[test]
    fn test_threshold_is_relative() {
        // Same geometry at two contrasts must give the same edges
        let faint = framed_image(20, 20, 3, 20);
        let strong = framed_image(20, 20, 3, 240);
        let detector = GradientEdgeDetector::default();

        let faint_mask = detector.detect(&faint).expect("Should detect");
        let strong_mask = detector.detect(&strong).expect("Should detect");
        assert_eq!(faint_mask, strong_mask);
    }

    #[test]
    fn test_tiny_and_empty_images() {
        let detector = GradientEdgeDetector::default();

        let tiny = GrayImage::from_pixel(2, 2, Luma([255]));
        let mask = detector.detect(&tiny).expect("Should handle 2x2");
        assert_eq!(mask.edge_count(), 0);

        let empty = GrayImage::new(0, 0);
        assert!(matches!(detector.detect(&empty), Err(PaintError::EmptyImage)));
    }
}
