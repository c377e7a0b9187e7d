use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Layer types, declared bottom to top in canonical stacking order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize,
)]
pub enum LayerKind {
    Image,
    Outline,
    Backgrounds,
    Grid,
    Markers,
}

/// A straight grid line in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub start: Point,
    pub end: Point,
}

/// A drawable layer on the display surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// Source image, placed by the canvas transform
    Image(RgbaImage),
    /// Transparent edge layer sharing the image's transform
    Outline(RgbaImage),
    /// Discs behind marker numbers
    Backgrounds,
    Grid(Vec<GridLine>),
    /// Marker numbers; always the top layer
    Markers,
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Image(_) => LayerKind::Image,
            Layer::Outline(_) => LayerKind::Outline,
            Layer::Backgrounds => LayerKind::Backgrounds,
            Layer::Grid(_) => LayerKind::Grid,
            Layer::Markers => LayerKind::Markers,
        }
    }
}

/// Ordered list of layers, bottom first. Holds at most one layer per kind
/// and keeps the marker layer on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    layers: Vec<Layer>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn kinds(&self) -> Vec<LayerKind> {
        self.layers.iter().map(Layer::kind).collect()
    }

    pub fn contains(&self, kind: LayerKind) -> bool {
        self.position(kind).is_some()
    }

    pub fn get(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.kind() == kind)
    }

    fn position(&self, kind: LayerKind) -> Option<usize> {
        self.layers.iter().position(|layer| layer.kind() == kind)
    }

    /// Add a layer, replacing any existing layer of the same kind in place.
    /// New layers go on top, below the markers.
    pub fn add(&mut self, layer: Layer) {
        match self.position(layer.kind()) {
            Some(index) => self.layers[index] = layer,
            None => self.layers.push(layer),
        }
        self.raise_markers();
    }

    pub fn remove(&mut self, kind: LayerKind) -> Option<Layer> {
        let index = self.position(kind)?;
        Some(self.layers.remove(index))
    }

    /// Move a layer to `index` (clamped). The marker layer cannot be lowered.
    pub fn move_to(&mut self, kind: LayerKind, index: usize) -> bool {
        let Some(from) = self.position(kind) else {
            return false;
        };
        let layer = self.layers.remove(from);
        let to = index.min(self.layers.len());
        self.layers.insert(to, layer);
        self.raise_markers();
        true
    }

    /// Restore the canonical order: image, outline, backgrounds, grid, markers.
    pub fn normalize(&mut self) {
        self.layers.sort_by_key(Layer::kind);
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    fn raise_markers(&mut self) {
        if let Some(index) = self.position(LayerKind::Markers) {
            let markers = self.layers.remove(index);
            self.layers.push(markers);
        }
    }
}
