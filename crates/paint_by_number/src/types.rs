use image::{Rgba, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Channel value of an edge pixel in an [`EdgeMask`].
pub const EDGE_VALUE: u8 = 0;
/// Channel value of a non-edge pixel in an [`EdgeMask`].
pub const NON_EDGE_VALUE: u8 = 255;

const EDGE_PIXEL: Rgba<u8> = Rgba([EDGE_VALUE, EDGE_VALUE, EDGE_VALUE, 255]);
const NON_EDGE_PIXEL: Rgba<u8> = Rgba([NON_EDGE_VALUE, NON_EDGE_VALUE, NON_EDGE_VALUE, 255]);

/// A point in either original-image or display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Binary edge classification with the exact dimensions of its source image.
///
/// Stored as an opaque RGBA raster: edge pixels are black (`0`), everything
/// else is white (`255`).
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMask {
    image: RgbaImage,
}

impl EdgeMask {
    /// A mask of the given size with no edges.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, NON_EDGE_PIXEL),
        }
    }

    /// Wraps an existing raster; any pixel whose red channel is `0` is an edge.
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] == EDGE_VALUE
    }

    pub fn set_edge(&mut self, x: u32, y: u32, edge: bool) {
        let pixel = if edge { EDGE_PIXEL } else { NON_EDGE_PIXEL };
        self.image.put_pixel(x, y, pixel);
    }

    pub fn edge_count(&self) -> usize {
        self.image.pixels().filter(|p| p[0] == EDGE_VALUE).count()
    }

    /// Number of the 8 surrounding pixels that are edges. Out-of-bounds
    /// neighbours count as non-edge.
    pub fn edge_neighbors(&self, x: u32, y: u32) -> u8 {
        let mut count = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= self.width() as i64 || ny >= self.height() as i64 {
                    continue;
                }
                if self.is_edge(nx as u32, ny as u32) {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Inclusive axis-aligned pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Extent along x, measured as `max_x - min_x`.
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    /// Extent along y, measured as `max_y - min_y`.
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    /// `width / height`, or `None` for boxes that are degenerate along either axis.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width() == 0 || self.height() == 0 {
            return None;
        }
        Some(self.width() as f64 / self.height() as f64)
    }
}

/// A connected, paintable area found by the segmenter.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Most frequent colour around the seed pixel
    pub color: [u8; 3],
    /// Member pixels in discovery (breadth-first) order
    pub pixels: Vec<(u32, u32)>,
    pub bounds: BoundingBox,
}

impl Region {
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Arithmetic mean of the member coordinates.
    pub fn centroid(&self) -> Option<Point> {
        if self.pixels.is_empty() {
            return None;
        }
        let (sum_x, sum_y) = self
            .pixels
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x as f64, sy + y as f64));
        let n = self.pixels.len() as f64;
        Some(Point::new(sum_x / n, sum_y / n))
    }
}

/// How a marker came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkerOrigin {
    /// Generated by number placement
    Auto,
    /// Added by clicking the canvas
    Manual,
}

/// A numbered label anchored in original-image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NumberMarker {
    pub number: u32,
    pub position: Point,
    pub origin: MarkerOrigin,
    /// Set once the user has dragged the marker
    #[serde(default)]
    pub user_edited: bool,
}

impl NumberMarker {
    pub fn auto(number: u32, position: Point) -> Self {
        Self {
            number,
            position,
            origin: MarkerOrigin::Auto,
            user_edited: false,
        }
    }

    pub fn manual(number: u32, position: Point) -> Self {
        Self {
            number,
            position,
            origin: MarkerOrigin::Manual,
            user_edited: false,
        }
    }

    pub fn to_position(&self) -> MarkerPosition {
        MarkerPosition {
            x: self.position.x,
            y: self.position.y,
            number: self.number,
        }
    }
}

/// The `{x, y, number}` payload published to marker observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarkerPosition {
    pub x: f64,
    pub y: f64,
    pub number: u32,
}

/// The paint colour behind a generated number: the dominant colour of the
/// region the marker was anchored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PaletteEntry {
    pub number: u32,
    pub color: [u8; 3],
}

/// Result of one outline-and-numbering pass over an image.
#[derive(Debug, Clone)]
pub struct OutlineAnalysis {
    /// Cleaned edge classification
    pub edge_mask: EdgeMask,
    /// Transparent layer with opaque black edges
    pub outline: RgbaImage,
    /// Regions accepted by the segmenter, before the placement filter
    pub regions_found: usize,
    /// Generated markers, largest region first
    pub markers: Vec<MarkerPosition>,
    /// Region colour for each marker anchored inside a region
    pub palette: Vec<PaletteEntry>,
    pub image_width: u32,
    pub image_height: u32,
}
