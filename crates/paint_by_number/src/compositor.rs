//! Flattening the outline, the source image and the numbered markers into
//! exportable rasters.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut};
use imageproc::rect::Rect;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{PaintError, Result},
    io,
    types::{EdgeMask, MarkerPosition},
};

const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const PAPER_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

// font8x8 glyphs are 8x8 cells, bit 0 of each row byte is the leftmost pixel
const GLYPH_CELL: u32 = 8;

/// Appearance of numbered markers, in original-image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MarkerStyle {
    /// Minimum radius of the disc behind a number
    pub radius: u32,
    /// Target glyph height; the 8px font is scaled by whole pixels to get close
    pub digit_height: u32,
    pub ink: [u8; 4],
    pub background: [u8; 4],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 10,
            digit_height: 12,
            ink: [0, 0, 0, 255],
            background: [255, 255, 255, 255],
        }
    }
}

impl MarkerStyle {
    fn glyph_scale(&self) -> u32 {
        ((self.digit_height + GLYPH_CELL / 2) / GLYPH_CELL).max(1)
    }

    fn glyph_size(&self) -> u32 {
        GLYPH_CELL * self.glyph_scale()
    }

    fn text_width(&self, digits: usize) -> u32 {
        digits as u32 * self.glyph_size()
    }
}

/// Builds the outline layer and flattened composites.
#[derive(Debug, Clone, Default)]
pub struct OutlineCompositor {
    pub style: MarkerStyle,
}

impl OutlineCompositor {
    pub fn new(style: MarkerStyle) -> Self {
        Self { style }
    }

    /// Transparent raster with only the edge pixels opaque black.
    pub fn outline_layer(mask: &EdgeMask) -> RgbaImage {
        RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
            if mask.is_edge(x, y) { OPAQUE_BLACK } else { TRANSPARENT }
        })
    }

    /// Original image, then the outline, then marker discs, then marker numbers.
    pub fn compose(
        &self,
        original: &RgbaImage,
        outline: &RgbaImage,
        markers: &[MarkerPosition],
    ) -> Result<RgbaImage> {
        self.flatten(original.clone(), outline, markers)
    }

    /// Print-ready page: outline and numbers on white paper, no source colours.
    pub fn coloring_page(&self, outline: &RgbaImage, markers: &[MarkerPosition]) -> Result<RgbaImage> {
        let paper = RgbaImage::from_pixel(outline.width(), outline.height(), PAPER_WHITE);
        self.flatten(paper, outline, markers)
    }

    fn flatten(
        &self,
        mut base: RgbaImage,
        outline: &RgbaImage,
        markers: &[MarkerPosition],
    ) -> Result<RgbaImage> {
        if base.width() == 0 || base.height() == 0 {
            return Err(PaintError::EmptyImage);
        }
        if base.dimensions() != outline.dimensions() {
            return Err(PaintError::InvalidDimensions {
                width: base.width(),
                height: base.height(),
            });
        }

        imageops::overlay(&mut base, outline, 0, 0);
        self.draw_markers(&mut base, markers);

        debug!(markers = markers.len(), "Composited outline layers");
        Ok(base)
    }

    /// Draw marker discs and numbers at the given positions of `canvas`.
    pub fn draw_markers(&self, canvas: &mut RgbaImage, markers: &[MarkerPosition]) {
        // All backgrounds go down before any number so no disc covers a digit
        for marker in markers {
            self.draw_background(canvas, marker);
        }
        for marker in markers {
            self.draw_number(canvas, marker);
        }
    }

    fn draw_background(&self, canvas: &mut RgbaImage, marker: &MarkerPosition) {
        let digits = marker.number.to_string().len();
        let radius = self
            .style
            .radius
            .max(self.style.text_width(digits) / 2 + 3) as i32;
        let center = (marker.x.round() as i32, marker.y.round() as i32);

        draw_filled_circle_mut(canvas, center, radius, Rgba(self.style.background));
        draw_hollow_circle_mut(canvas, center, radius, Rgba(self.style.ink));
    }

    fn draw_number(&self, canvas: &mut RgbaImage, marker: &MarkerPosition) {
        let text = marker.number.to_string();
        let scale = self.style.glyph_scale();
        let size = self.style.glyph_size() as i32;
        let left = marker.x.round() as i32 - self.style.text_width(text.len()) as i32 / 2;
        let top = marker.y.round() as i32 - size / 2;
        let ink = Rgba(self.style.ink);

        for (i, ch) in text.chars().enumerate() {
            let Some(glyph) = BASIC_FONTS.get(ch) else {
                continue;
            };
            let origin_x = left + i as i32 * size;
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_CELL {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }
                    let x = origin_x + (col * scale) as i32;
                    let y = top + row as i32 * scale as i32;
                    draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(scale, scale), ink);
                }
            }
        }
    }

    /// Composite encoded as PNG for download or print.
    pub fn export_png(
        &self,
        original: &RgbaImage,
        outline: &RgbaImage,
        markers: &[MarkerPosition],
    ) -> Result<Vec<u8>> {
        io::encode_png(&self.compose(original, outline, markers)?)
    }

    /// Outline layer as a `data:` URL, the payload handed to outline consumers.
    pub fn outline_data_url(outline: &RgbaImage) -> Result<String> {
        io::to_data_url(outline)
    }
}
