pub mod builder;

use image::RgbaImage;
use tracing::{debug, info};

use crate::{
    algorithms::to_luminance,
    compositor::OutlineCompositor,
    error::Result,
    traits::{ColorMode, ColorReducer, EdgeCleaner, EdgeDetector, NumberPlacer, RegionSegmenter},
    types::{MarkerPosition, OutlineAnalysis, PaletteEntry, Region},
};

/// Optional colour reduction applied before edge detection
pub struct ColorReduction {
    pub reducer: Box<dyn ColorReducer>,
    pub mode: ColorMode,
}

/// The outline-and-numbering pass: grayscale, edges, cleanup, regions, numbers
pub struct Pipeline {
    color_reduction: Option<ColorReduction>,
    edge_detector: Box<dyn EdgeDetector>,
    cleaner: Box<dyn EdgeCleaner>,
    segmenter: Box<dyn RegionSegmenter>,
    placer: Box<dyn NumberPlacer>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        color_reduction: Option<ColorReduction>,
        edge_detector: Box<dyn EdgeDetector>,
        cleaner: Box<dyn EdgeCleaner>,
        segmenter: Box<dyn RegionSegmenter>,
        placer: Box<dyn NumberPlacer>,
    ) -> Self {
        Self {
            color_reduction,
            edge_detector,
            cleaner,
            segmenter,
            placer,
        }
    }

    /// Run every stage over `image`. Regions are dropped once numbers are
    /// placed; only their colours survive, in the palette.
    pub fn process(&self, image: &RgbaImage) -> Result<OutlineAnalysis> {
        // Step 1: optional external colour reduction
        let reduced;
        let source = match &self.color_reduction {
            Some(reduction) => {
                reduced = reduction.reducer.reduce(image, reduction.mode)?;
                debug!(mode = ?reduction.mode, "Colour reduction applied");
                &reduced
            }
            None => image,
        };

        // Step 2: luminance and edge classification
        let gray = to_luminance(source)?;
        let raw_edges = self.edge_detector.detect(&gray)?;

        // Step 3: noise removal
        let edge_mask = self.cleaner.clean(&raw_edges);
        debug!(
            before = raw_edges.edge_count(),
            after = edge_mask.edge_count(),
            "Edge cleanup finished"
        );

        // Step 4: regions bounded by the cleaned edges
        let regions = self.segmenter.segment(source, &edge_mask)?;

        // Step 5: numbered anchors, largest region first
        let markers = self.placer.place(&regions);
        let palette = palette(&regions, &markers, source.width(), source.height());

        let outline = OutlineCompositor::outline_layer(&edge_mask);
        info!(
            width = source.width(),
            height = source.height(),
            regions = regions.len(),
            markers = markers.len(),
            "Outline pass complete"
        );

        Ok(OutlineAnalysis {
            edge_mask,
            outline,
            regions_found: regions.len(),
            markers,
            palette,
            image_width: source.width(),
            image_height: source.height(),
        })
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let reduction = match &self.color_reduction {
            Some(ColorReduction { mode: ColorMode::Palette(colors), .. }) => {
                format!("{colors}-colour reduction")
            }
            Some(ColorReduction { mode: ColorMode::Vector, .. }) => "vector reduction".to_string(),
            None => "no colour reduction".to_string(),
        };
        format!(
            "Pipeline: {reduction}, 1 edge detector, 1 cleaner, 1 segmenter, 1 number placer"
        )
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        builder::PipelineBuilder::build_default()
    }
}

/// Look up the region owning each marker's anchor pixel.
fn palette(
    regions: &[Region],
    markers: &[MarkerPosition],
    width: u32,
    height: u32,
) -> Vec<PaletteEntry> {
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;
    let mut owner: Vec<Option<usize>> = vec![None; width as usize * height as usize];
    for (region_index, region) in regions.iter().enumerate() {
        for &(x, y) in &region.pixels {
            if let Some(slot) = owner.get_mut(index(x, y)) {
                *slot = Some(region_index);
            }
        }
    }

    markers
        .iter()
        .filter(|marker| marker.x >= 0.0 && marker.y >= 0.0)
        .filter_map(|marker| {
            let (x, y) = (marker.x as u32, marker.y as u32);
            if x >= width || y >= height {
                return None;
            }
            let region = owner[index(x, y)]?;
            Some(PaletteEntry {
                number: marker.number,
                color: regions[region].color,
            })
        })
        .collect()
}
