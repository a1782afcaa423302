use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use coincount::{AnalysisConfig, AnalysisResult, CoinPipeline};

#[derive(Parser)]
#[command(name = "coincount")]
#[command(about = "Detect coins in photos and add up their value")]
#[command(version)]
struct Cli {
    /// Input image files
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// JSON configuration (detector parameters, denomination table, style)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the annotated image (a directory when several images are given)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Print each result as JSON
    #[arg(long)]
    json: bool,

    /// Save intermediate stage images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Smallest circle radius to search for (pixels)
    #[arg(long)]
    min_radius: Option<u32>,

    /// Largest circle radius to search for (pixels)
    #[arg(long)]
    max_radius: Option<u32>,

    /// Minimum distance between detected centers (pixels)
    #[arg(long)]
    min_dist: Option<f32>,

    /// Canny high threshold for the edge stage
    #[arg(long)]
    edge_threshold: Option<f32>,

    /// Votes required for a circle center
    #[arg(long)]
    accumulator_threshold: Option<u32>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = AnalysisConfig::load_or_default(self.config.as_deref())
            .context("Failed to load configuration")?;

        let detector = &mut config.detector;
        if let Some(v) = self.min_radius {
            detector.min_radius = v;
        }
        if let Some(v) = self.max_radius {
            detector.max_radius = v;
        }
        if let Some(v) = self.min_dist {
            detector.min_center_distance = v;
        }
        if let Some(v) = self.edge_threshold {
            detector.edge_threshold = v;
        }
        if let Some(v) = self.accumulator_threshold {
            detector.accumulator_threshold = v;
        }

        config.validate()?;
        Ok(config)
    }

    fn output_path(&self, image_path: &Path) -> Option<PathBuf> {
        let output = self.output.as_ref()?;
        if self.images.len() == 1 {
            return Some(output.clone());
        }
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Some(output.join(format!("{}_annotated.png", stem)))
    }

    fn debug_dir(&self, index: usize, image_path: &Path) -> Option<PathBuf> {
        let root = self.debug_out.as_ref()?;
        if self.images.len() == 1 {
            return Some(root.clone());
        }
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Some(root.join(format!("{:02}_{}", index + 1, stem)))
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_result(
    cli: &Cli,
    config: &AnalysisConfig,
    image_path: &Path,
    result: &AnalysisResult,
) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.summary())?);
        return Ok(());
    }

    println!("\n=== {} ===", image_path.display());
    println!(
        "Total coin value: {}{}",
        config.annotation.label_prefix, result.total_value
    );
    println!(
        "Coins matched: {}, unmatched: {}",
        result.matched_count, result.unmatched_count
    );

    if cli.verbose {
        for (i, coin) in result.coins.iter().enumerate() {
            let value = coin
                .value
                .map(|v| format!("{}{}", config.annotation.label_prefix, v))
                .unwrap_or_else(|| "unmatched".to_string());
            println!(
                "  Coin {} at ({}, {}) radius={} -> {}",
                i + 1,
                coin.circle.x,
                coin.circle.y,
                coin.circle.radius,
                value
            );
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.load_config()?;

    if let Some(output) = &cli.output {
        if cli.images.len() > 1 {
            std::fs::create_dir_all(output).with_context(|| {
                format!("Failed to create output directory {}", output.display())
            })?;
        }
    }

    for (index, image_path) in cli.images.iter().enumerate() {
        // Each image gets its own pipeline, so no buffers outlive a run.
        let mut pipeline = CoinPipeline::new(config.clone());
        if let Some(dir) = cli.debug_dir(index, image_path) {
            pipeline = pipeline.with_debug(dir)?;
        }

        let result = pipeline
            .run_path(image_path)
            .with_context(|| format!("Failed to analyze {}", image_path.display()))?;

        if let Some(path) = cli.output_path(image_path) {
            result
                .annotated_image
                .save(&path)
                .with_context(|| format!("Failed to save annotated image to {}", path.display()))?;
            tracing::info!("Annotated image written to {}", path.display());
        }

        print_result(&cli, &config, image_path, &result)?;
    }

    Ok(())
}
