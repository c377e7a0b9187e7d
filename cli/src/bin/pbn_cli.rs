use clap::{Parser, Subcommand};
use cli::{run_outline, BatchJob, OutlineOutputs};
use color_eyre::eyre::{eyre, Result};
use paint_by_number::{OutlineConfig, PipelineBuilder, SessionCommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Outline one image and number its regions
    Outline {
        /// Path to the input image (PNG or JPEG)
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the transparent outline layer
        #[arg(short, long)]
        output: PathBuf,
        /// Also write the flattened image + outline + numbers
        #[arg(long)]
        composite: Option<PathBuf>,
        /// Also write the outline-only page on white paper
        #[arg(long)]
        page: Option<PathBuf>,
        /// Also write the marker list as JSON
        #[arg(long)]
        markers: Option<PathBuf>,
        /// Configuration file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Process every image listed in a job file
    Batch {
        /// Path to the job file (.toml or .json)
        #[arg(short, long)]
        job: PathBuf,
    },
    /// Print the JSON schema of the configuration or the session commands
    Schema {
        /// Print the session command schema instead
        #[arg(long)]
        commands: bool,
    },
    /// List the session commands
    Commands,
    /// Write the default configuration
    InitConfig {
        /// Destination (.toml or .json)
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Outline {
            input,
            output,
            composite,
            page,
            markers,
            config,
        } => {
            let outputs = OutlineOutputs {
                outline: output.clone(),
                composite: composite.clone(),
                coloring_page: page.clone(),
                markers: markers.clone(),
            };
            outline(input, &outputs, config.as_deref())?;
        }
        Commands::Batch { job } => {
            batch(job).await?;
        }
        Commands::Schema { commands } => {
            let schema = if *commands {
                serde_json::to_string_pretty(&SessionCommand::schema())?
            } else {
                serde_json::to_string_pretty(&OutlineConfig::schema())?
            };
            println!("{schema}");
        }
        Commands::Commands => {
            for (name, description) in SessionCommand::catalog() {
                println!("{name:<16} {description}");
            }
        }
        Commands::InitConfig { path } => {
            OutlineConfig::default().to_file(path)?;
            info!("Default configuration written to {}", path.display());
        }
    }

    Ok(())
}

fn outline(input: &Path, outputs: &OutlineOutputs, config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => OutlineConfig::from_file(path)?,
        None => OutlineConfig::default(),
    };
    let pipeline = PipelineBuilder::build_with_config(config);
    info!("{}", pipeline.info());

    let report = run_outline(input, outputs, &pipeline)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn batch(job_path: &Path) -> Result<()> {
    let job = BatchJob::from_file(job_path)?;
    info!("Batch job: {} images -> {}", job.images.len(), job.output_dir);

    // Create output directory if it doesn't exist
    std::fs::create_dir_all(&job.output_dir)?;

    let pipeline = Arc::new(job.pipeline());
    let mut tasks = Vec::with_capacity(job.images.len());

    for entry in &job.images {
        let input = PathBuf::from(&entry.path);
        let outputs = job.outputs_for(entry);
        let pipeline = Arc::clone(&pipeline);
        let name = entry.name.clone();
        info!("Queued '{}' -> {}", name, outputs.outline.display());

        let task = tokio::task::spawn_blocking(move || run_outline(&input, &outputs, &pipeline));
        tasks.push((name, task));
    }

    let mut failures = 0;
    for (name, task) in tasks {
        match task.await? {
            Ok(report) => info!(
                "'{}': {} regions, {} markers",
                name, report.regions_found, report.markers
            ),
            Err(e) => {
                error!("'{}' failed: {}", name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(eyre!("{failures} of {} images failed", job.images.len()));
    }
    info!("✅ Batch completed!");
    Ok(())
}
