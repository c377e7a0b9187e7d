use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{PaintError, Result};

/// Tunables for the whole outline-and-numbering pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(default)]
pub struct OutlineConfig {
    pub edges: EdgeConfig,
    pub cleanup: CleanupConfig,
    pub segmentation: SegmentationConfig,
    pub placement: PlacementConfig,
    pub canvas: CanvasConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EdgeConfig {
    /// Fraction of the strongest gradient a pixel must exceed to be an edge
    #[schemars(range(min = 0.0, max = 1.0))]
    pub threshold_ratio: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self { threshold_ratio: 0.15 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CleanupConfig {
    /// Edge pixels with fewer edge neighbours than this are dropped
    pub min_neighbors: u8,
    /// Number of cleanup passes; each pass reads only the previous pass's output
    pub passes: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            min_neighbors: 2,
            passes: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Radius of the square window sampled for a seed's dominant colour
    pub sample_radius: u32,
    /// Regions must have strictly more pixels than this
    pub min_region_pixels: usize,
    /// Exclusive lower bound on bounding-box width / height
    pub min_aspect_ratio: f64,
    /// Exclusive upper bound on bounding-box width / height
    pub max_aspect_ratio: f64,
    /// Seeds whose dominant colour has every channel above this are background
    pub background_cutoff: u8,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            sample_radius: 3,
            min_region_pixels: 100,
            min_aspect_ratio: 0.2,
            max_aspect_ratio: 5.0,
            background_cutoff: 240,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PlacementConfig {
    /// Regions with fewer pixels than this get no marker
    pub min_region_pixels: usize,
    /// Penalty applied per pixel of distance from the centroid
    pub centroid_weight: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_region_pixels: 150,
            centroid_weight: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Longest side of a freshly loaded image on the display surface
    pub fit_size: u32,
    pub grid_spacing: u32,
    /// Hit radius of a marker, in display pixels
    pub marker_radius: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 750,
            fit_size: 700,
            grid_spacing: 50,
            marker_radius: 10.0,
        }
    }
}

impl OutlineConfig {
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(OutlineConfig)
    }

    /// Reject settings that would make a pass meaningless.
    pub fn validate(&self) -> Result<()> {
        let ratio = self.edges.threshold_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(PaintError::InvalidConfig(format!(
                "edges.threshold_ratio must be in (0, 1], got {ratio}"
            )));
        }
        if self.cleanup.passes == 0 {
            return Err(PaintError::InvalidConfig(
                "cleanup.passes must be at least 1".to_string(),
            ));
        }
        let seg = &self.segmentation;
        if !(seg.min_aspect_ratio > 0.0 && seg.min_aspect_ratio < seg.max_aspect_ratio) {
            return Err(PaintError::InvalidConfig(format!(
                "segmentation aspect bounds ({}, {}) are inverted or non-positive",
                seg.min_aspect_ratio, seg.max_aspect_ratio
            )));
        }
        if !self.placement.centroid_weight.is_finite() {
            return Err(PaintError::InvalidConfig(
                "placement.centroid_weight must be finite".to_string(),
            ));
        }
        let canvas = &self.canvas;
        if canvas.width == 0 || canvas.height == 0 || canvas.fit_size == 0 {
            return Err(PaintError::InvalidConfig(
                "canvas dimensions must be non-zero".to_string(),
            ));
        }
        if canvas.grid_spacing == 0 {
            return Err(PaintError::InvalidConfig(
                "canvas.grid_spacing must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: OutlineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: OutlineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(PaintError::InvalidConfig(format!(
                "unsupported config format: {}",
                path_ref.display()
            ))),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save configuration, picking the format from the file extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => {
                return Err(PaintError::InvalidConfig(format!(
                    "unsupported config format: {}",
                    path_ref.display()
                )))
            }
        };
        fs::write(path_ref, content)?;
        Ok(())
    }
}
