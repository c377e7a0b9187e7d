use std::{path::Path, sync::Arc};

use image::RgbaImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr, VariantNames};
use tracing::{info, warn};

use crate::{
    canvas::{Canvas, CanvasEvent, CanvasTransform},
    compositor::OutlineCompositor,
    config::OutlineConfig,
    error::{PaintError, Result},
    history::MarkerHistory,
    io,
    pipeline::{builder::PipelineBuilder, Pipeline},
    traits::MarkerObserver,
    types::{MarkerPosition, NumberMarker, OutlineAnalysis, Point},
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum SessionCommand {
    /// Detect edges, segment regions and regenerate numbered markers
    #[serde(rename = "outline")]
    Outline,

    /// Click at a display position to add a manual marker
    #[serde(rename = "add_marker")]
    AddMarker { x: f64, y: f64 },

    /// Move a marker to an original-image position
    #[serde(rename = "move_marker")]
    MoveMarker {
        #[schemars(range(min = 1))]
        number: u32,
        x: f64,
        y: f64,
    },

    /// Drop a dragged marker at a display position
    #[serde(rename = "drag_marker")]
    DragMarker {
        #[schemars(range(min = 1))]
        number: u32,
        x: f64,
        y: f64,
    },

    /// Remove a marker
    #[serde(rename = "delete_marker")]
    DeleteMarker {
        #[schemars(range(min = 1))]
        number: u32,
    },

    /// Switch between a locked and an editable image frame
    #[serde(rename = "toggle_frame")]
    ToggleFrame,

    /// Show or hide the alignment grid
    #[serde(rename = "toggle_grid")]
    ToggleGrid,

    /// Place the image on the canvas
    #[serde(rename = "set_transform")]
    SetTransform {
        left: f64,
        top: f64,
        #[schemars(range(min = 0.0001))]
        scale_x: f64,
        #[schemars(range(min = 0.0001))]
        scale_y: f64,
    },

    /// Drop the image, its outline and all markers
    #[serde(rename = "clear_image")]
    ClearImage,

    #[serde(rename = "undo")]
    Undo,

    #[serde(rename = "redo")]
    Redo,
}

impl SessionCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SessionCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    /// Every command name with its description
    pub fn catalog() -> Vec<(&'static str, &'static str)> {
        Self::iter()
            .map(|command| (<&'static str>::from(&command), command.description()))
            .collect()
    }

    /// Get a description of the command
    pub fn description(&self) -> &'static str {
        match self {
            Self::Outline => "Detect edges, find enclosed regions and number them largest first",
            Self::AddMarker { .. } => "Add a manual marker at a display position (frame must be locked)",
            Self::MoveMarker { .. } => "Move a marker to original-image coordinates, clamped to the image",
            Self::DragMarker { .. } => "Move a marker to a display position",
            Self::DeleteMarker { .. } => "Delete a marker by number",
            Self::ToggleFrame => "Toggle between locked and editable image frame",
            Self::ToggleGrid => "Toggle the alignment grid",
            Self::SetTransform { .. } => "Set the image offset and scale on the canvas",
            Self::ClearImage => "Remove the image, outline and markers",
            Self::Undo => "Restore the previous marker snapshot",
            Self::Redo => "Reapply the next marker snapshot",
        }
    }
}

/// Result of executing a [`SessionCommand`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Outlined {
        regions_found: usize,
        markers: Vec<MarkerPosition>,
    },
    Canvas(CanvasEvent),
}

/// An editing session: one image, its outline and the live markers.
pub struct Session {
    image: Option<RgbaImage>,
    pipeline: Arc<Pipeline>,
    canvas: Canvas,
    compositor: OutlineCompositor,
    analysis: Option<OutlineAnalysis>,
    history: MarkerHistory,
    observers: Vec<Arc<dyn MarkerObserver>>,
}

impl Session {
    pub fn new(config: OutlineConfig) -> Self {
        let canvas = Canvas::new(config.canvas.clone());
        Self::with_pipeline(PipelineBuilder::build_with_config(config), canvas)
    }

    /// Create a session with a custom pipeline
    pub fn with_pipeline(pipeline: Pipeline, canvas: Canvas) -> Self {
        Self {
            image: None,
            pipeline: Arc::new(pipeline),
            canvas,
            compositor: OutlineCompositor::default(),
            analysis: None,
            history: MarkerHistory::default(),
            observers: Vec::new(),
        }
    }

    pub fn with_compositor(mut self, compositor: OutlineCompositor) -> Self {
        self.compositor = compositor;
        self
    }

    /// Register an observer for marker snapshots
    pub fn subscribe(&mut self, observer: Arc<dyn MarkerObserver>) {
        self.observers.push(observer);
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn analysis(&self) -> Option<&OutlineAnalysis> {
        self.analysis.as_ref()
    }

    pub fn markers(&self) -> Vec<MarkerPosition> {
        self.canvas.marker_positions()
    }

    pub fn pipeline_info(&self) -> String {
        self.pipeline.info()
    }

    /// Load an image file from disk
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let image = io::load_image(path)?;
        self.set_image(image)
    }

    /// Load an encoded image from memory
    pub fn load_image_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let image = io::load_image_from_bytes(bytes)?;
        self.set_image(image)
    }

    /// Load a base64 payload or `data:` URL
    pub fn load_image_from_base64(&mut self, payload: &str) -> Result<()> {
        let image = io::load_image_from_base64(payload)?;
        self.set_image(image)
    }

    /// Replace the image. Markers, outline and history start over.
    pub fn set_image(&mut self, image: RgbaImage) -> Result<()> {
        let event = self.canvas.set_image(image.clone())?;
        self.image = Some(image);
        self.analysis = None;
        self.history.reset();
        if let CanvasEvent::MarkersChanged(markers) = &event {
            self.notify(markers);
        }
        Ok(())
    }

    pub fn execute(&mut self, command: SessionCommand) -> Result<SessionEvent> {
        let event = match command {
            SessionCommand::Outline => return self.outline(),
            SessionCommand::AddMarker { x, y } => {
                self.canvas.add_marker_at_display(Point::new(x, y))?
            }
            SessionCommand::MoveMarker { number, x, y } => {
                self.canvas.move_marker(number, Point::new(x, y))?
            }
            SessionCommand::DragMarker { number, x, y } => {
                self.canvas.drag_marker_to_display(number, Point::new(x, y))?
            }
            SessionCommand::DeleteMarker { number } => self.canvas.delete_marker(number)?,
            SessionCommand::ToggleFrame => self.canvas.toggle_frame(),
            SessionCommand::ToggleGrid => self.canvas.toggle_grid(),
            SessionCommand::SetTransform { left, top, scale_x, scale_y } => self
                .canvas
                .set_transform(CanvasTransform::new(left, top, scale_x, scale_y))?,
            SessionCommand::ClearImage => {
                self.image = None;
                self.analysis = None;
                let event = self.canvas.clear_image();
                // Snapshots of the old image's markers must not come back
                self.history.reset();
                self.notify(&[]);
                return Ok(SessionEvent::Canvas(event));
            }
            SessionCommand::Undo => match self.history.undo().map(<[_]>::to_vec) {
                Some(snapshot) => return Ok(self.restore(&snapshot)),
                None => CanvasEvent::Unchanged,
            },
            SessionCommand::Redo => match self.history.redo().map(<[_]>::to_vec) {
                Some(snapshot) => return Ok(self.restore(&snapshot)),
                None => CanvasEvent::Unchanged,
            },
        };

        if let CanvasEvent::MarkersChanged(markers) = &event {
            self.history.record(self.canvas.markers().to_vec());
            self.notify(markers);
        }
        Ok(SessionEvent::Canvas(event))
    }

    fn outline(&mut self) -> Result<SessionEvent> {
        let Some(image) = &self.image else {
            warn!("Outline requested before any image was loaded");
            return Ok(SessionEvent::Outlined {
                regions_found: 0,
                markers: Vec::new(),
            });
        };

        let analysis = self.pipeline.process(image)?;
        self.canvas.set_outline(analysis.outline.clone())?;
        self.canvas.replace_markers(&analysis.markers);
        self.history.record(self.canvas.markers().to_vec());

        let markers = analysis.markers.clone();
        let regions_found = analysis.regions_found;
        self.analysis = Some(analysis);
        self.notify(&markers);

        info!(regions_found, markers = markers.len(), "Session outline updated");
        Ok(SessionEvent::Outlined {
            regions_found,
            markers,
        })
    }

    fn restore(&mut self, snapshot: &[NumberMarker]) -> SessionEvent {
        let event = self.canvas.restore_markers(snapshot);
        if let CanvasEvent::MarkersChanged(markers) = &event {
            self.notify(markers);
        }
        SessionEvent::Canvas(event)
    }

    fn notify(&self, markers: &[MarkerPosition]) {
        for observer in &self.observers {
            observer.markers_changed(markers);
        }
    }

    /// Original image, outline and current markers flattened to PNG
    pub fn export_png(&self) -> Result<Vec<u8>> {
        let (image, analysis) = self.outlined()?;
        self.compositor
            .export_png(image, &analysis.outline, &self.markers())
    }

    /// Outline and markers on white paper, encoded as PNG
    pub fn coloring_page_png(&self) -> Result<Vec<u8>> {
        let (_, analysis) = self.outlined()?;
        let page = self
            .compositor
            .coloring_page(&analysis.outline, &self.markers())?;
        io::encode_png(&page)
    }

    /// Current outline layer as a `data:` URL
    pub fn outline_data_url(&self) -> Result<String> {
        let (_, analysis) = self.outlined()?;
        OutlineCompositor::outline_data_url(&analysis.outline)
    }

    /// Rasterized display surface
    pub fn render(&self) -> RgbaImage {
        self.canvas.render(&self.compositor)
    }

    fn outlined(&self) -> Result<(&RgbaImage, &OutlineAnalysis)> {
        let image = self.image.as_ref().ok_or(PaintError::NoImageLoaded)?;
        let analysis = self.analysis.as_ref().ok_or(PaintError::NoImageLoaded)?;
        Ok((image, analysis))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(OutlineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        snapshots: Mutex<Vec<Vec<MarkerPosition>>>,
    }

    impl MarkerObserver for Recorder {
        fn markers_changed(&self, markers: &[MarkerPosition]) {
            if let Ok(mut snapshots) = self.snapshots.lock() {
                snapshots.push(markers.to_vec());
            }
        }
    }

    fn red_square() -> RgbaImage {
        RgbaImage::from_fn(100, 100, |x, y| {
            let inside = (30..=70).contains(&x) && (30..=70).contains(&y);
            let border = inside && (x == 30 || x == 70 || y == 30 || y == 70);
            if border {
                Rgba([0, 0, 0, 255])
            } else if inside {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn test_command_serialization() {
        let command = SessionCommand::MoveMarker { number: 2, x: 10.0, y: 12.5 };
        let json = serde_json::to_string(&command).expect("Should serialize");
        assert_eq!(json, r#"{"type":"move_marker","params":{"number":2,"x":10.0,"y":12.5}}"#);

        let parsed: SessionCommand = serde_json::from_str(r#"{"type":"toggle_frame"}"#)
            .expect("Should parse unit variant");
        assert_eq!(parsed, SessionCommand::ToggleFrame);

        assert!(SessionCommand::command_names().contains(&"drag_marker"));
        let catalog = SessionCommand::catalog();
        assert_eq!(catalog.len(), SessionCommand::command_names().len());
        assert_eq!(catalog[0], ("outline", SessionCommand::Outline.description()));
        assert_eq!(SessionCommand::Undo.to_string(), "undo");
        assert!(SessionCommand::schema().schema.subschemas.is_some());
    }

    #[test]
    fn test_outline_without_image_is_noop() {
        let mut session = Session::default();
        let event = session.execute(SessionCommand::Outline).expect("Should not fail");
        assert_eq!(event, SessionEvent::Outlined { regions_found: 0, markers: vec![] });
        assert!(matches!(session.export_png(), Err(PaintError::NoImageLoaded)));
    }

    #[test]
    fn test_session_flow_with_observer_and_undo() {
        let recorder = Arc::new(Recorder::default());
        let mut session = Session::default();
        session.subscribe(recorder.clone());
        session.set_image(red_square()).expect("Should load");

        let event = session.execute(SessionCommand::Outline).expect("Should outline");
        let SessionEvent::Outlined { regions_found, markers } = event else {
            panic!("Expected outline event");
        };
        assert_eq!(regions_found, 1);
        assert_eq!(markers[0].number, 1);

        // Clicking the square's top-left corner area adds marker 2
        let corner = session
            .canvas()
            .transform()
            .to_display(Point::new(35.0, 35.0));
        session
            .execute(SessionCommand::AddMarker { x: corner.x, y: corner.y })
            .expect("Should add");
        assert_eq!(session.markers().len(), 2);
        assert_eq!(session.markers()[1].number, 2);

        session
            .execute(SessionCommand::MoveMarker { number: 2, x: 500.0, y: 20.0 })
            .expect("Should move");
        assert_eq!(session.markers()[1].x, 99.0);

        session.execute(SessionCommand::Undo).expect("Should undo");
        assert_eq!((session.markers()[1].x, session.markers()[1].y), (35.0, 35.0));
        session.execute(SessionCommand::Undo).expect("Should undo");
        assert_eq!(session.markers().len(), 1);
        session.execute(SessionCommand::Redo).expect("Should redo");
        assert_eq!(session.markers().len(), 2);

        let snapshots = recorder.snapshots.lock().expect("Lock");
        // load, outline, add, move, undo, undo, redo
        assert_eq!(snapshots.len(), 7);
        assert_eq!(snapshots.last().map(Vec::len), Some(2));
    }

    #[test]
    fn test_frame_toggle_blocks_manual_add() {
        let mut session = Session::default();
        session.set_image(red_square()).expect("Should load");
        session
            .execute(SessionCommand::SetTransform { left: 50.0, top: 50.0, scale_x: 2.0, scale_y: 2.0 })
            .expect("Should set transform");

        session.execute(SessionCommand::ToggleFrame).expect("Should toggle");
        let event = session
            .execute(SessionCommand::AddMarker { x: 200.0, y: 150.0 })
            .expect("Should handle click");
        assert_eq!(event, SessionEvent::Canvas(CanvasEvent::Unchanged));

        session.execute(SessionCommand::ToggleFrame).expect("Should toggle");
        session
            .execute(SessionCommand::AddMarker { x: 200.0, y: 150.0 })
            .expect("Should add");
        assert_eq!(session.markers(), vec![MarkerPosition { x: 75.0, y: 50.0, number: 1 }]);
    }

    #[test]
    fn test_exports_after_outline() {
        let mut session = Session::default();
        session.set_image(red_square()).expect("Should load");
        session.execute(SessionCommand::Outline).expect("Should outline");

        let png = session.export_png().expect("Should export");
        let decoded = io::load_image_from_bytes(&png).expect("Should decode");
        assert_eq!(decoded.dimensions(), (100, 100));

        assert!(session.coloring_page_png().is_ok());
        assert!(session
            .outline_data_url()
            .expect("Should encode")
            .starts_with("data:image/png;base64,"));

        session.execute(SessionCommand::ClearImage).expect("Should clear");
        assert!(session.markers().is_empty());
        assert!(session.image().is_none());
    }

    #[test]
    fn test_undo_after_clear_keeps_canvas_empty() {
        let mut session = Session::default();
        session.set_image(red_square()).expect("Should load");
        session.execute(SessionCommand::Outline).expect("Should outline");
        assert_eq!(session.markers().len(), 1);

        session.execute(SessionCommand::ClearImage).expect("Should clear");
        let event = session.execute(SessionCommand::Undo).expect("Should undo");
        assert_eq!(event, SessionEvent::Canvas(CanvasEvent::Unchanged));
        assert!(session.markers().is_empty());
        assert_eq!(session.canvas().image_size(), None);
        assert!(matches!(
            session.execute(SessionCommand::MoveMarker { number: 1, x: 5.0, y: 5.0 }),
            Err(PaintError::NoImageLoaded)
        ));
    }

    #[test]
    fn test_render_survives_extreme_zoom() {
        let mut session = Session::default();
        session.set_image(red_square()).expect("Should load");
        session
            .execute(SessionCommand::SetTransform {
                left: -30.0e8,
                top: -50.0e8,
                scale_x: 1.0e8,
                scale_y: 1.0e8,
            })
            .expect("Finite positive scale is valid");

        let surface = session.render();
        assert_eq!(surface.dimensions(), (900, 750));
        // Every visible pixel samples the square's left border at (30, 50)
        assert!(surface.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }
}
