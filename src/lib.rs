pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;

use image::DynamicImage;

pub use config::AnalysisConfig;
pub use detection::{
    AnnotationStyle, BlurParams, DenominationRule, DenominationTable, DetectorParams, LoadedImage,
};
pub use error::{CoinError, Result};
pub use models::{
    AnalysisResult, AnalysisSummary, Amount, Classification, CoinMatch, DetectedCircle,
};
pub use pipeline::{CoinPipeline, PipelineRun};

/// Analyze one decoded photo and total the coins in it.
pub fn analyze(image: &DynamicImage, config: &AnalysisConfig) -> Result<AnalysisResult> {
    analyze_loaded(detection::ingest::from_dynamic(image.clone()), config)
}

/// Analyze a photo that has already been split into color and grayscale.
pub fn analyze_loaded(image: LoadedImage, config: &AnalysisConfig) -> Result<AnalysisResult> {
    PipelineRun::new(image, None).execute(config)
}
