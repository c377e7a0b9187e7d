//! # Paint-by-Number Library
//!
//! Turns a picture into a numbered colouring page: edges are detected on the
//! luminance image, enclosed areas are flood-filled into regions, and every
//! large enough region gets a number placed at its most central point.
//!
//! ## Core Features
//!
//! - **Trait-based Architecture**: every stage sits behind a trait and can be swapped
//! - **Pipeline System**: grayscale, edge detection, cleanup, segmentation and placement
//! - **Canvas Model**: display transform, frame lock, manual markers and drag reconciliation
//! - **Compositor**: transparent outline layer and flattened PNG exports
//! - **Sessions**: serializable commands with undo/redo of marker edits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paint_by_number::{Pipeline, OutlineCompositor};
//!
//! let image = paint_by_number::load_image("photo.png")?;
//! let analysis = Pipeline::builder().build().process(&image)?;
//!
//! let png = OutlineCompositor::default()
//!     .export_png(&image, &analysis.outline, &analysis.markers)?;
//! std::fs::write("page.png", png)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Interactive Session
//!
//! ```rust,no_run
//! use paint_by_number::{Session, SessionCommand};
//!
//! let mut session = Session::default();
//! session.load_image("photo.png")?;
//! session.execute(SessionCommand::Outline)?;
//! session.execute(SessionCommand::AddMarker { x: 200.0, y: 150.0 })?;
//! session.execute(SessionCommand::Undo)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod config;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod canvas;
pub mod compositor;
pub mod history;
pub mod io;
pub mod manager;

// Re-exports for convenience
pub use error::{PaintError, Result};
pub use types::{BoundingBox, EdgeMask, MarkerOrigin, MarkerPosition, NumberMarker, OutlineAnalysis, PaletteEntry, Point, Region};
pub use config::OutlineConfig;
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{Pipeline, builder::PipelineBuilder};
pub use canvas::{Canvas, CanvasEvent, CanvasTransform, FrameMode, Layer, LayerKind, Scene};
pub use compositor::{MarkerStyle, OutlineCompositor};
pub use history::MarkerHistory;
pub use io::*;
pub use manager::{Session, SessionCommand, SessionEvent};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn bordered_square(color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_fn(100, 100, |x, y| {
            let inside = (30..=70).contains(&x) && (30..=70).contains(&y);
            let border = inside && (x == 30 || x == 70 || y == 30 || y == 70);
            if border {
                Rgba([0, 0, 0, 255])
            } else if inside {
                color
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn test_red_square_stage_by_stage() {
        let image = bordered_square(Rgba([255, 0, 0, 255]));

        let gray = to_luminance(&image).expect("Should convert");
        let edges = GradientEdgeDetector::default().detect(&gray).expect("Should detect");
        for i in 30..=70 {
            assert!(edges.is_edge(30, i) && edges.is_edge(70, i), "Vertical border at {i}");
            assert!(edges.is_edge(i, 30) && edges.is_edge(i, 70), "Horizontal border at {i}");
        }

        let cleaned = NeighborCountCleaner::default().clean(&edges);
        assert_eq!(cleaned, edges, "Thick borders survive cleanup");

        let regions = FloodFillSegmenter::default()
            .segment(&image, &cleaned)
            .expect("Should segment");
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.color, [255, 0, 0]);
        assert!((30..=32).contains(&region.bounds.min_x) && (30..=32).contains(&region.bounds.min_y));
        assert!((68..=70).contains(&region.bounds.max_x) && (68..=70).contains(&region.bounds.max_y));

        let markers = CentralPointPlacer::default().place(&regions);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].number, 1);
        assert!((markers[0].x - 50.0).abs() <= 1.0);
        assert!((markers[0].y - 50.0).abs() <= 1.0);
    }

    #[test]
    fn test_placement_without_regions_is_empty() {
        assert!(CentralPointPlacer::default().place(&[]).is_empty());
    }

    #[test]
    fn test_composite_export_round_trips_through_png() {
        let image = bordered_square(Rgba([30, 120, 220, 255]));
        let analysis = Pipeline::default().process(&image).expect("Should process");

        let png = OutlineCompositor::default()
            .export_png(&image, &analysis.outline, &analysis.markers)
            .expect("Should export");
        let page = load_image_from_bytes(&png).expect("Should decode");

        assert_eq!(page.dimensions(), image.dimensions());
        assert_eq!(*page.get_pixel(30, 40), Rgba([0, 0, 0, 255]));
        assert_eq!(*page.get_pixel(5, 5), Rgba([255, 255, 255, 255]));
    }
}
