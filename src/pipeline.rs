use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage};
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::detection::annotate::annotate_all;
use crate::detection::circles::detect_circles;
use crate::detection::classify::classify_circles;
use crate::detection::ingest::{self, LoadedImage};
use crate::detection::preprocessing::{apply_blur, detect_edges};
use crate::error::{CoinError, Result};
use crate::models::AnalysisResult;

/// Where stage images go when debugging is on.
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// Write one stage image as `NN_<stage>/01.png`.
    fn save_stage(&self, index: usize, stage_name: &str, image: &DynamicImage) -> Result<()> {
        let step_dir_name = format!("{:02}_{}", index, stage_name.to_lowercase().replace(' ', "_"));
        let step_dir = self.output_dir.join(&step_dir_name);
        std::fs::create_dir_all(&step_dir).map_err(|e| CoinError::io(&step_dir, e))?;

        let output_path = step_dir.join("01.png");
        image.save(&output_path).map_err(|e| CoinError::Save {
            path: output_path.clone(),
            source: e,
        })?;

        debug!("saved debug image {}/01.png", step_dir_name);
        Ok(())
    }
}

/// Buffers and progress of a single analysis.
///
/// A run owns its images outright, so nothing carries over from one photo to
/// the next.
pub struct PipelineRun<'a> {
    original: RgbImage,
    gray: GrayImage,
    debug: Option<&'a DebugConfig>,
    stage_index: usize,
}

impl<'a> PipelineRun<'a> {
    pub fn new(image: LoadedImage, debug: Option<&'a DebugConfig>) -> Self {
        Self {
            original: image.color,
            gray: image.gray,
            debug,
            stage_index: 0,
        }
    }

    /// Advance to the next stage, dumping its image when debugging.
    fn record(
        &mut self,
        stage_name: &str,
        image: impl FnOnce(&Self) -> DynamicImage,
    ) -> Result<()> {
        if let Some(debug) = self.debug {
            debug.save_stage(self.stage_index, stage_name, &image(self))?;
        }
        self.stage_index += 1;
        Ok(())
    }

    /// Grayscale → blur → detect → classify → annotate.
    pub fn execute(mut self, config: &AnalysisConfig) -> Result<AnalysisResult> {
        config.denominations.validate()?;

        let (width, height) = self.original.dimensions();
        info!(width, height, "analyzing image");
        if width == 0 || height == 0 {
            return Err(CoinError::detection(format!(
                "input image has zero size ({}x{})",
                width, height
            )));
        }

        self.record("Input", |run| DynamicImage::ImageRgb8(run.original.clone()))?;
        self.record("Grayscale", |run| DynamicImage::ImageLuma8(run.gray.clone()))?;

        let blurred = apply_blur(&self.gray, &config.blur)?;
        self.record("Gaussian Blur", |_| DynamicImage::ImageLuma8(blurred.clone()))?;

        let detector = &config.detector;
        let circles = detect_circles(&blurred, detector)?;
        // The detector keeps its edge map internal; rebuild it for inspection.
        self.record("Edge Detection", |_| {
            DynamicImage::ImageLuma8(detect_edges(
                &blurred,
                detector.edge_threshold / 2.0,
                detector.edge_threshold,
            ))
        })?;

        let classified = classify_circles(&circles, &config.denominations);
        let annotated_image = annotate_all(&self.original, &classified.coins, &config.annotation);

        self.record("Annotation", |_| DynamicImage::ImageRgb8(annotated_image.clone()))?;

        info!(
            circles = circles.len(),
            matched = classified.matched_count,
            unmatched = classified.unmatched_count,
            total = %classified.total_value,
            "analysis complete"
        );

        Ok(AnalysisResult {
            total_value: classified.total_value,
            annotated_image,
            matched_count: classified.matched_count,
            unmatched_count: classified.unmatched_count,
            coins: classified.coins,
        })
    }
}

/// Coin analysis with a fixed configuration and optional stage dumps.
pub struct CoinPipeline {
    config: AnalysisConfig,
    debug: Option<DebugConfig>,
}

impl CoinPipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            debug: None,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries =
                std::fs::read_dir(&output_dir).map_err(|e| CoinError::io(&output_dir, e))?;
            if entries.count() > 0 {
                return Err(CoinError::config(format!(
                    "debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir).map_err(|e| CoinError::io(&output_dir, e))?;
        }

        self.debug = Some(DebugConfig { output_dir });

        Ok(self)
    }

    /// Stage dump directory, if debugging is on.
    pub fn debug_dir(&self) -> Option<&Path> {
        self.debug.as_ref().map(|d| d.output_dir.as_path())
    }

    pub fn run(&self, image: LoadedImage) -> Result<AnalysisResult> {
        PipelineRun::new(image, self.debug.as_ref()).execute(&self.config)
    }

    pub fn run_path(&self, path: impl AsRef<Path>) -> Result<AnalysisResult> {
        self.run(ingest::load_image(path)?)
    }
}
