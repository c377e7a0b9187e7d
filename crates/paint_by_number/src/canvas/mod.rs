//! The display surface: where the image sits, which markers exist, and how
//! pointer positions map back to image pixels.

pub mod scene;
pub mod transform;

pub use scene::{GridLine, Layer, LayerKind, Scene};
pub use transform::CanvasTransform;

use image::{Pixel, Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, warn};

use crate::{
    compositor::OutlineCompositor,
    config::CanvasConfig,
    error::{PaintError, Result},
    types::{MarkerPosition, NumberMarker, Point},
};

const CANVAS_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GRID_COLOR: Rgba<u8> = Rgba([235, 235, 235, 255]);

/// Whether the image frame or the markers receive pointer input.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FrameMode {
    /// Image fixed; clicks add markers
    #[default]
    Locked,
    /// Image can be moved and resized; markers ignore clicks
    Editable,
}

impl FrameMode {
    pub fn toggle(self) -> Self {
        match self {
            FrameMode::Locked => FrameMode::Editable,
            FrameMode::Editable => FrameMode::Locked,
        }
    }
}

/// What a canvas operation changed. Marker changes always carry the full,
/// ordered marker list.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    MarkersChanged(Vec<MarkerPosition>),
    FrameChanged(FrameMode),
    GridChanged(bool),
    TransformChanged(CanvasTransform),
    Unchanged,
}

/// Owns the canvas transform and the live marker set.
#[derive(Debug, Clone)]
pub struct Canvas {
    config: CanvasConfig,
    transform: CanvasTransform,
    image_size: Option<(u32, u32)>,
    frame: FrameMode,
    grid_visible: bool,
    markers: Vec<NumberMarker>,
    scene: Scene,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        let mut scene = Scene::new();
        scene.add(Layer::Backgrounds);
        scene.add(Layer::Markers);
        Self {
            config,
            transform: CanvasTransform::default(),
            image_size: None,
            frame: FrameMode::Locked,
            grid_visible: false,
            markers: Vec::new(),
            scene,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn transform(&self) -> CanvasTransform {
        self.transform
    }

    pub fn frame_mode(&self) -> FrameMode {
        self.frame
    }

    pub fn grid_visible(&self) -> bool {
        self.grid_visible
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn markers(&self) -> &[NumberMarker] {
        &self.markers
    }

    pub fn marker_positions(&self) -> Vec<MarkerPosition> {
        self.markers.iter().map(NumberMarker::to_position).collect()
    }

    fn markers_changed(&self) -> CanvasEvent {
        CanvasEvent::MarkersChanged(self.marker_positions())
    }

    /// `max(existing numbers) + 1`, or 1 when there are no markers.
    pub fn next_marker_number(&self) -> u32 {
        self.markers.iter().map(|m| m.number).max().map_or(1, |n| n + 1)
    }

    /// Replace the image. Existing markers belong to the old image and are
    /// dropped, so the event is an empty marker list.
    pub fn set_image(&mut self, image: RgbaImage) -> Result<CanvasEvent> {
        let (width, height) = image.dimensions();
        self.transform = CanvasTransform::fit(width, height, &self.config)?;
        self.image_size = Some((width, height));
        self.markers.clear();
        self.scene.remove(LayerKind::Outline);
        self.scene.add(Layer::Image(image));
        self.scene.normalize();

        debug!(width, height, transform = ?self.transform, "Canvas image set");
        Ok(self.markers_changed())
    }

    /// Remove the image, its outline and every marker.
    pub fn clear_image(&mut self) -> CanvasEvent {
        self.image_size = None;
        self.markers.clear();
        self.scene.remove(LayerKind::Image);
        self.scene.remove(LayerKind::Outline);
        self.markers_changed()
    }

    /// Show an outline layer over the image, sharing its transform.
    pub fn set_outline(&mut self, outline: RgbaImage) -> Result<()> {
        let size = self.image_size.ok_or(PaintError::NoImageLoaded)?;
        if outline.dimensions() != size {
            return Err(PaintError::InvalidDimensions {
                width: size.0,
                height: size.1,
            });
        }
        self.scene.add(Layer::Outline(outline));
        self.scene.normalize();
        Ok(())
    }

    /// Swap in a freshly generated marker set.
    pub fn replace_markers(&mut self, positions: &[MarkerPosition]) -> CanvasEvent {
        self.markers = positions
            .iter()
            .map(|p| NumberMarker::auto(p.number, Point::new(p.x, p.y)))
            .collect();
        self.markers_changed()
    }

    /// Put back a previously captured marker set, origins and edit flags included.
    /// Markers cannot outlive their image, so nothing is restored without one.
    pub fn restore_markers(&mut self, markers: &[NumberMarker]) -> CanvasEvent {
        if self.image_size.is_none() {
            warn!(markers = markers.len(), "No image loaded, markers not restored");
            return CanvasEvent::Unchanged;
        }
        self.markers = markers.to_vec();
        self.markers_changed()
    }

    /// Programmatic placement of the image; not subject to the frame lock.
    pub fn set_transform(&mut self, transform: CanvasTransform) -> Result<CanvasEvent> {
        transform.validate()?;
        self.transform = transform;
        Ok(CanvasEvent::TransformChanged(transform))
    }

    /// User move/resize of the image frame. Ignored while the frame is locked.
    pub fn transform_image(&mut self, transform: CanvasTransform) -> Result<CanvasEvent> {
        if self.frame == FrameMode::Locked {
            return Ok(CanvasEvent::Unchanged);
        }
        self.set_transform(transform)
    }

    pub fn toggle_frame(&mut self) -> CanvasEvent {
        self.frame = self.frame.toggle();
        debug!(mode = %self.frame, "Frame mode toggled");
        CanvasEvent::FrameChanged(self.frame)
    }

    pub fn toggle_grid(&mut self) -> CanvasEvent {
        self.grid_visible = !self.grid_visible;
        if self.grid_visible {
            self.scene.add(Layer::Grid(self.grid_lines()));
            self.scene.normalize();
        } else {
            self.scene.remove(LayerKind::Grid);
        }
        CanvasEvent::GridChanged(self.grid_visible)
    }

    /// Horizontal then vertical lines every `grid_spacing` display pixels.
    pub fn grid_lines(&self) -> Vec<GridLine> {
        let width = self.config.width as f64;
        let height = self.config.height as f64;
        let spacing = self.config.grid_spacing.max(1) as usize;

        let horizontal = (0..self.config.height).step_by(spacing).map(|y| GridLine {
            start: Point::new(0.0, y as f64),
            end: Point::new(width, y as f64),
        });
        let vertical = (0..self.config.width).step_by(spacing).map(|x| GridLine {
            start: Point::new(x as f64, 0.0),
            end: Point::new(x as f64, height),
        });
        horizontal.chain(vertical).collect()
    }

    /// Marker numbers positioned in display coordinates.
    pub fn display_markers(&self) -> Vec<MarkerPosition> {
        self.markers
            .iter()
            .map(|marker| {
                let display = self.transform.to_display(marker.position);
                MarkerPosition {
                    x: display.x,
                    y: display.y,
                    number: marker.number,
                }
            })
            .collect()
    }

    /// Topmost marker within the hit radius of a display point.
    pub fn marker_at(&self, display: Point) -> Option<u32> {
        self.markers
            .iter()
            .rev()
            .find(|marker| {
                self.transform.to_display(marker.position).distance(&display)
                    <= self.config.marker_radius
            })
            .map(|marker| marker.number)
    }

    fn contains_original(&self, point: Point) -> bool {
        self.image_size.is_some_and(|(width, height)| {
            point.x >= 0.0 && point.y >= 0.0 && point.x < width as f64 && point.y < height as f64
        })
    }

    /// Handle a click on the canvas. While locked, a click on empty image area
    /// adds a manual marker with the next free number.
    pub fn add_marker_at_display(&mut self, click: Point) -> Result<CanvasEvent> {
        if self.image_size.is_none() {
            return Err(PaintError::NoImageLoaded);
        }
        if self.frame == FrameMode::Editable {
            return Ok(CanvasEvent::Unchanged);
        }
        if self.marker_at(click).is_some() {
            return Ok(CanvasEvent::Unchanged);
        }

        let original = self.transform.to_original(click);
        if !self.contains_original(original) {
            debug!(?click, ?original, "Click outside image ignored");
            return Ok(CanvasEvent::Unchanged);
        }

        let number = self.next_marker_number();
        self.markers.push(NumberMarker::manual(number, original));
        debug!(number, x = original.x, y = original.y, "Manual marker added");
        Ok(self.markers_changed())
    }

    /// Move a marker to an original-image position, clamped to the image.
    pub fn move_marker(&mut self, number: u32, original: Point) -> Result<CanvasEvent> {
        let (width, height) = self.image_size.ok_or(PaintError::NoImageLoaded)?;
        let clamped = Point::new(
            original.x.clamp(0.0, (width - 1) as f64),
            original.y.clamp(0.0, (height - 1) as f64),
        );
        if clamped != original {
            warn!(number, ?original, ?clamped, "Marker clamped to image bounds");
        }

        let marker = self
            .markers
            .iter_mut()
            .find(|m| m.number == number)
            .ok_or(PaintError::MarkerNotFound(number))?;
        marker.position = clamped;
        marker.user_edited = true;
        Ok(self.markers_changed())
    }

    /// Drop a dragged marker at a display position.
    pub fn drag_marker_to_display(&mut self, number: u32, display: Point) -> Result<CanvasEvent> {
        let original = self.transform.to_original(display);
        self.move_marker(number, original)
    }

    pub fn delete_marker(&mut self, number: u32) -> Result<CanvasEvent> {
        let index = self
            .markers
            .iter()
            .position(|m| m.number == number)
            .ok_or(PaintError::MarkerNotFound(number))?;
        self.markers.remove(index);
        Ok(self.markers_changed())
    }

    /// Rasterize the display surface, walking the scene bottom to top.
    pub fn render(&self, compositor: &OutlineCompositor) -> RgbaImage {
        let mut surface =
            RgbaImage::from_pixel(self.config.width, self.config.height, CANVAS_BACKGROUND);

        for layer in self.scene.layers() {
            match layer {
                Layer::Image(image) | Layer::Outline(image) => {
                    self.draw_placed(&mut surface, image);
                }
                Layer::Grid(lines) => {
                    for line in lines {
                        draw_line_segment_mut(
                            &mut surface,
                            (line.start.x as f32, line.start.y as f32),
                            (line.end.x as f32, line.end.y as f32),
                            GRID_COLOR,
                        );
                    }
                }
                // Discs and numbers are drawn together by the marker layer
                Layer::Backgrounds => {}
                Layer::Markers => compositor.draw_markers(&mut surface, &self.display_markers()),
            }
        }

        surface
    }

    /// Nearest-neighbour placement of an image-sized layer. Only surface pixels
    /// are visited, each sampled through the inverse transform.
    fn draw_placed(&self, surface: &mut RgbaImage, image: &RgbaImage) {
        let (image_width, image_height) = image.dimensions();
        let (width, height) = self.transform.display_size(image_width, image_height);
        let clip = |start: f64, extent: f64, limit: u32| {
            let lo = start.floor().clamp(0.0, limit as f64) as u32;
            let hi = (start + extent).ceil().clamp(0.0, limit as f64) as u32;
            lo..hi
        };
        let columns = clip(self.transform.left, width, surface.width());
        let rows = clip(self.transform.top, height, surface.height());

        for y in rows {
            for x in columns.clone() {
                let source = self
                    .transform
                    .to_original(Point::new(x as f64 + 0.5, y as f64 + 0.5));
                if source.x < 0.0 || source.y < 0.0 {
                    continue;
                }
                let (sx, sy) = (source.x as u32, source.y as u32);
                if sx >= image_width || sy >= image_height {
                    continue;
                }
                surface.get_pixel_mut(x, y).blend(image.get_pixel(sx, sy));
            }
        }
    }
}
