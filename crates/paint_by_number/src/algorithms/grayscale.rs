use image::{GrayImage, Luma, RgbaImage};

use crate::error::{PaintError, Result};

const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Rec. 601 luminance of an RGB triple, rounded to the nearest level.
pub fn luminance(rgb: [u8; 3]) -> u8 {
    let value = LUMA_R * rgb[0] as f64 + LUMA_G * rgb[1] as f64 + LUMA_B * rgb[2] as f64;
    value.round().clamp(0.0, 255.0) as u8
}

/// Convert a colour image to single-channel luminance.
pub fn to_luminance(image: &RgbaImage) -> Result<GrayImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PaintError::EmptyImage);
    }

    Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        Luma([luminance([p[0], p[1], p[2]])])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_luminance_weights() {
        assert_eq!(luminance([0, 0, 0]), 0);
        assert_eq!(luminance([255, 255, 255]), 255);
        assert_eq!(luminance([255, 0, 0]), 76);
        assert_eq!(luminance([0, 255, 0]), 150);
        assert_eq!(luminance([0, 0, 255]), 29);
    }

    #[test]
    fn test_to_luminance_ignores_alpha() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 10]));
        let gray = to_luminance(&image).expect("Should convert");
        assert_eq!(gray.dimensions(), (3, 2));
        assert!(gray.pixels().all(|p| p[0] == 76));
    }

    #[test]
    fn test_empty_image_rejected() {
        let image = RgbaImage::new(0, 4);
        assert!(matches!(to_luminance(&image), Err(PaintError::EmptyImage)));
    }
}
