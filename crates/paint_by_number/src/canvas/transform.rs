use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    config::CanvasConfig,
    error::{PaintError, Result},
    types::Point,
};

/// Placement of the source image on the display surface.
///
/// `display = origin + original * scale`. Scale is relative to the image's
/// intrinsic size, so the intrinsic display width term of
/// `left + (x / original_width) * display_width * scale_x` cancels out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CanvasTransform {
    pub left: f64,
    pub top: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for CanvasTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

impl CanvasTransform {
    pub fn new(left: f64, top: f64, scale_x: f64, scale_y: f64) -> Self {
        Self {
            left,
            top,
            scale_x,
            scale_y,
        }
    }

    /// Scale the longest image side to `fit_size` and centre it on the canvas.
    pub fn fit(image_width: u32, image_height: u32, config: &CanvasConfig) -> Result<Self> {
        if image_width == 0 || image_height == 0 {
            return Err(PaintError::EmptyImage);
        }

        let (width, height) = (image_width as f64, image_height as f64);
        let aspect = width / height;
        let fit = config.fit_size as f64;
        let (display_width, display_height) = if image_width > image_height {
            (fit, fit / aspect)
        } else {
            (fit * aspect, fit)
        };

        Ok(Self {
            left: (config.width as f64 - display_width) / 2.0,
            top: (config.height as f64 - display_height) / 2.0,
            scale_x: display_width / width,
            scale_y: display_height / height,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.left.is_finite() && self.top.is_finite()) {
            return Err(PaintError::InvalidTransform(format!(
                "offset ({}, {}) is not finite",
                self.left, self.top
            )));
        }
        if !(self.scale_x.is_finite() && self.scale_x > 0.0)
            || !(self.scale_y.is_finite() && self.scale_y > 0.0)
        {
            return Err(PaintError::InvalidTransform(format!(
                "scale ({}, {}) must be positive",
                self.scale_x, self.scale_y
            )));
        }
        Ok(())
    }

    pub fn to_display(&self, original: Point) -> Point {
        Point::new(
            self.left + original.x * self.scale_x,
            self.top + original.y * self.scale_y,
        )
    }

    /// Exact inverse of [`CanvasTransform::to_display`].
    pub fn to_original(&self, display: Point) -> Point {
        Point::new(
            (display.x - self.left) / self.scale_x,
            (display.y - self.top) / self.scale_y,
        )
    }

    /// Size of an image of the given intrinsic size once placed.
    pub fn display_size(&self, width: u32, height: u32) -> (f64, f64) {
        (width as f64 * self.scale_x, height as f64 * self.scale_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_inverse() {
        let transform = CanvasTransform::new(50.0, 50.0, 2.0, 2.0);
        assert_eq!(transform.to_original(Point::new(200.0, 150.0)), Point::new(75.0, 50.0));
        assert_eq!(transform.to_display(Point::new(75.0, 50.0)), Point::new(200.0, 150.0));
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let transforms = [
            CanvasTransform::new(0.0, 0.0, 1.0, 1.0),
            CanvasTransform::new(100.0, 25.0, 0.35, 0.35),
            CanvasTransform::new(-40.5, 812.25, 3.7, 0.013),
            CanvasTransform::new(1e4, -1e4, 123.456, 1e-3),
        ];
        let points = [
            Point::new(0.0, 0.0),
            Point::new(75.0, 50.0),
            Point::new(1999.0, 0.5),
            Point::new(0.333, 4095.9),
        ];

        for transform in transforms {
            for point in points {
                let back = transform.to_original(transform.to_display(point));
                assert!((back.x - point.x).abs() < 1e-6, "{transform:?} {point:?} -> {back:?}");
                assert!((back.y - point.y).abs() < 1e-6, "{transform:?} {point:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn test_fit_landscape_and_portrait() {
        let config = CanvasConfig::default();

        let landscape = CanvasTransform::fit(1400, 700, &config).expect("Should fit");
        assert_eq!(landscape.scale_x, 0.5);
        assert_eq!(landscape.scale_y, 0.5);
        assert_eq!(landscape.left, 100.0);
        assert_eq!(landscape.top, 200.0);

        let portrait = CanvasTransform::fit(350, 700, &config).expect("Should fit");
        assert_eq!(portrait.scale_x, 1.0);
        assert_eq!(portrait.scale_y, 1.0);
        assert_eq!(portrait.left, 275.0);
        assert_eq!(portrait.top, 25.0);
    }

    #[test]
    fn test_invalid_transforms_rejected() {
        assert!(CanvasTransform::new(0.0, 0.0, 0.0, 1.0).validate().is_err());
        assert!(CanvasTransform::new(0.0, 0.0, 1.0, -2.0).validate().is_err());
        assert!(CanvasTransform::new(f64::NAN, 0.0, 1.0, 1.0).validate().is_err());
        assert!(CanvasTransform::new(5.0, 5.0, 0.5, 4.0).validate().is_ok());
        assert!(CanvasTransform::fit(0, 10, &CanvasConfig::default()).is_err());
    }
}
