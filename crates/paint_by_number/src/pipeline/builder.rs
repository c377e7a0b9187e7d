use crate::{
    algorithms::{CentralPointPlacer, FloodFillSegmenter, GradientEdgeDetector, NeighborCountCleaner},
    config::OutlineConfig,
    pipeline::{ColorReduction, Pipeline},
    traits::{ColorMode, ColorReducer, EdgeCleaner, EdgeDetector, NumberPlacer, RegionSegmenter},
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    config: OutlineConfig,
    color_reduction: Option<ColorReduction>,
    edge_detector: Option<Box<dyn EdgeDetector>>,
    cleaner: Option<Box<dyn EdgeCleaner>>,
    segmenter: Option<Box<dyn RegionSegmenter>>,
    placer: Option<Box<dyn NumberPlacer>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: OutlineConfig::default(),
            color_reduction: None,
            edge_detector: None,
            cleaner: None,
            segmenter: None,
            placer: None,
        }
    }

    /// Parameters for any stage left at its default implementation
    pub fn with_config(mut self, config: OutlineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the edge detector (replaces any existing one)
    pub fn set_edge_detector<D>(mut self, detector: D) -> Self
    where
        D: EdgeDetector + 'static,
    {
        self.edge_detector = Some(Box::new(detector));
        self
    }

    /// Set the edge cleaner (replaces any existing one)
    pub fn set_cleaner<C>(mut self, cleaner: C) -> Self
    where
        C: EdgeCleaner + 'static,
    {
        self.cleaner = Some(Box::new(cleaner));
        self
    }

    /// Set the region segmenter (replaces any existing one)
    pub fn set_segmenter<S>(mut self, segmenter: S) -> Self
    where
        S: RegionSegmenter + 'static,
    {
        self.segmenter = Some(Box::new(segmenter));
        self
    }

    /// Set the number placer (replaces any existing one)
    pub fn set_placer<P>(mut self, placer: P) -> Self
    where
        P: NumberPlacer + 'static,
    {
        self.placer = Some(Box::new(placer));
        self
    }

    /// Run the image through an external colour reducer before edge detection
    pub fn with_color_reduction<R>(mut self, reducer: R, mode: ColorMode) -> Self
    where
        R: ColorReducer + 'static,
    {
        self.color_reduction = Some(ColorReduction {
            reducer: Box::new(reducer),
            mode,
        });
        self
    }

    /// Build the pipeline, filling unset stages from the config
    pub fn build(self) -> Pipeline {
        let config = self.config;

        let edge_detector = self
            .edge_detector
            .unwrap_or_else(|| Box::new(GradientEdgeDetector::from(&config.edges)));
        let cleaner = self
            .cleaner
            .unwrap_or_else(|| Box::new(NeighborCountCleaner::from(&config.cleanup)));
        let segmenter = self
            .segmenter
            .unwrap_or_else(|| Box::new(FloodFillSegmenter::from(&config.segmentation)));
        let placer = self
            .placer
            .unwrap_or_else(|| Box::new(CentralPointPlacer::from(&config.placement)));

        Pipeline::new(self.color_reduction, edge_detector, cleaner, segmenter, placer)
    }

    /// Build the standard pipeline with default parameters
    pub fn build_default() -> Pipeline {
        Self::new().build()
    }

    /// Build the standard pipeline from a loaded configuration
    pub fn build_with_config(config: OutlineConfig) -> Pipeline {
        Self::new().with_config(config).build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_config_reaches_default_stages() {
        let mut config = OutlineConfig::default();
        // Nothing can exceed the whole gradient range, so no edges survive
        config.edges.threshold_ratio = 1.0;

        let image = RgbaImage::from_fn(30, 30, |x, _| {
            if x < 15 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });

        let strict = PipelineBuilder::build_with_config(config)
            .process(&image)
            .expect("Should process");
        let standard = PipelineBuilder::build_default()
            .process(&image)
            .expect("Should process");

        assert_eq!(strict.edge_mask.edge_count(), 0);
        assert!(standard.edge_mask.edge_count() > 0);
    }
}
