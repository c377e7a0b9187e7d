use paint_by_number::{
    io, MarkerPosition, OutlineCompositor, OutlineConfig, PaintError, PaletteEntry, Pipeline,
    PipelineBuilder,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    PaintError(#[from] PaintError),
    #[error("Job lists no images")]
    MissingImages,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One picture to turn into a numbered page
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ImageEntry {
    pub name: String,
    pub path: String,
    pub description: Option<String>,
    /// Also write an outline-only page on white paper
    #[serde(default)]
    pub coloring_page: bool,
}

/// Batch job file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchJob {
    pub output_dir: String,
    #[serde(default)]
    pub config: OutlineConfig,
    pub images: Vec<ImageEntry>,
}

/// Where the artifacts of one outline run go
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlineOutputs {
    pub outline: PathBuf,
    pub composite: Option<PathBuf>,
    pub coloring_page: Option<PathBuf>,
    pub markers: Option<PathBuf>,
}

impl OutlineOutputs {
    /// `<name>_outline.png`, `<name>_composite.png` and `<name>_markers.json` in `dir`
    pub fn in_dir(dir: &Path, name: &str, coloring_page: bool) -> Self {
        Self {
            outline: dir.join(format!("{name}_outline.png")),
            composite: Some(dir.join(format!("{name}_composite.png"))),
            coloring_page: coloring_page.then(|| dir.join(format!("{name}_page.png"))),
            markers: Some(dir.join(format!("{name}_markers.json"))),
        }
    }
}

/// Summary of one processed image
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OutlineReport {
    pub input: String,
    pub width: u32,
    pub height: u32,
    pub regions_found: usize,
    pub markers: usize,
}

/// Contents of the markers JSON: where each number sits and which colour it paints
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MarkerSheet {
    pub markers: Vec<MarkerPosition>,
    pub palette: Vec<PaletteEntry>,
}

/// Outline a single image file and write the requested artifacts.
pub fn run_outline(
    input: &Path,
    outputs: &OutlineOutputs,
    pipeline: &Pipeline,
) -> Result<OutlineReport, JobError> {
    let image = io::load_image(input)?;
    let analysis = pipeline.process(&image)?;
    let compositor = OutlineCompositor::default();

    fs::write(&outputs.outline, io::encode_png(&analysis.outline)?)?;
    if let Some(path) = &outputs.composite {
        let png = compositor.export_png(&image, &analysis.outline, &analysis.markers)?;
        fs::write(path, png)?;
    }
    if let Some(path) = &outputs.coloring_page {
        let page = compositor.coloring_page(&analysis.outline, &analysis.markers)?;
        fs::write(path, io::encode_png(&page)?)?;
    }
    if let Some(path) = &outputs.markers {
        let sheet = MarkerSheet {
            markers: analysis.markers.clone(),
            palette: analysis.palette.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&sheet)?)?;
    }

    info!(
        "Outlined {} -> {} ({} regions, {} markers)",
        input.display(),
        outputs.outline.display(),
        analysis.regions_found,
        analysis.markers.len()
    );

    Ok(OutlineReport {
        input: input.display().to_string(),
        width: analysis.image_width,
        height: analysis.image_height,
        regions_found: analysis.regions_found,
        markers: analysis.markers.len(),
    })
}

impl BatchJob {
    /// Load BatchJob configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load BatchJob configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, JobError> {
        let job: BatchJob = toml::from_str(content)?;
        job.validate()?;
        Ok(job)
    }

    /// Load BatchJob configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load BatchJob configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, JobError> {
        let job: BatchJob = serde_json::from_str(content)?;
        job.validate()?;
        Ok(job)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(JobError::UnsupportedFileFormat),
        }
    }

    /// Convert BatchJob to TOML string
    pub fn to_toml(&self) -> Result<String, JobError> {
        let toml = toml::to_string_pretty(&self)?;
        Ok(toml)
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.images.is_empty() {
            return Err(JobError::MissingImages);
        }
        self.config.validate()?;
        Ok(())
    }

    pub fn pipeline(&self) -> Pipeline {
        PipelineBuilder::build_with_config(self.config.clone())
    }

    /// Output locations for one entry
    pub fn outputs_for(&self, entry: &ImageEntry) -> OutlineOutputs {
        OutlineOutputs::in_dir(Path::new(&self.output_dir), &entry.name, entry.coloring_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const JOB: &str = r#"
output_dir = "out"

[config.edges]
threshold_ratio = 0.2

[[images]]
name = "cat"
path = "cat.png"

[[images]]
name = "dog"
path = "dog.jpg"
description = "second picture"
coloring_page = true
"#;

    #[test]
    fn test_job_from_toml() {
        let job = BatchJob::from_toml(JOB).expect("Should parse job");
        assert_eq!(job.images.len(), 2);
        assert_eq!(job.config.edges.threshold_ratio, 0.2);
        assert_eq!(job.config.placement.min_region_pixels, 150);
        assert!(!job.images[0].coloring_page);

        let outputs = job.outputs_for(&job.images[1]);
        assert_eq!(outputs.outline, Path::new("out").join("dog_outline.png"));
        assert_eq!(outputs.coloring_page, Some(Path::new("out").join("dog_page.png")));

        let reparsed = BatchJob::from_toml(&job.to_toml().expect("Should serialize"))
            .expect("Should parse again");
        assert_eq!(reparsed, job);
    }

    #[test]
    fn test_job_without_images_rejected() {
        let result = BatchJob::from_json(r#"{"output_dir": "out", "images": []}"#);
        assert!(matches!(result, Err(JobError::MissingImages)));
        assert!(matches!(
            BatchJob::from_file("job.yaml"),
            Err(JobError::UnsupportedFileFormat)
        ));
    }

    #[test]
    fn test_run_outline_writes_artifacts() {
        let dir = std::env::temp_dir().join(format!("pbn_cli_test_{}", std::process::id()));
        fs::create_dir_all(&dir).expect("Should create temp dir");

        let input = dir.join("square.png");
        let image = RgbaImage::from_fn(100, 100, |x, y| {
            let inside = (30..=70).contains(&x) && (30..=70).contains(&y);
            let border = inside && (x == 30 || x == 70 || y == 30 || y == 70);
            if border {
                Rgba([0, 0, 0, 255])
            } else if inside {
                Rgba([0, 160, 60, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        image.save(&input).expect("Should write fixture");

        let outputs = OutlineOutputs::in_dir(&dir, "square", true);
        let report = run_outline(&input, &outputs, &Pipeline::default()).expect("Should outline");

        assert_eq!((report.width, report.height), (100, 100));
        assert_eq!(report.markers, 1);
        assert!(outputs.outline.exists());
        assert!(outputs.composite.as_ref().is_some_and(|p| p.exists()));
        assert!(outputs.coloring_page.as_ref().is_some_and(|p| p.exists()));

        let markers = fs::read_to_string(outputs.markers.as_ref().expect("Markers path"))
            .expect("Should read markers");
        assert!(markers.contains("\"number\": 1"));
        let sheet: MarkerSheet = serde_json::from_str(&markers).expect("Should parse markers");
        assert_eq!(sheet.markers.len(), 1);
        assert_eq!(sheet.palette, vec![PaletteEntry { number: 1, color: [0, 160, 60] }]);

        fs::remove_dir_all(&dir).ok();
    }
}
