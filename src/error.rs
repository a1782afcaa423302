//! Error types for coin analysis runs.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for coin analysis operations.
pub type Result<T> = std::result::Result<T, CoinError>;

/// Errors that end an analysis run.
///
/// Finding no circles, or finding circles that match no denomination, is not
/// an error.
#[derive(Debug, Error)]
pub enum CoinError {
    /// The image could not be read or decoded.
    #[error("failed to load image from {source_name}: {source}")]
    Load {
        source_name: String,
        #[source]
        source: image::ImageError,
    },

    /// The smoothing kernel parameters are unusable.
    #[error("invalid blur kernel: size {kernel_size} (must be odd and positive), sigma {sigma}")]
    InvalidKernel { kernel_size: u32, sigma: f32 },

    /// A malformed image reached the circle detector.
    #[error("circle detection failed: {0}")]
    Detection(String),

    /// Configuration values are out of range or unparsable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem failure while writing run output.
    #[error("I/O error at {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An image could not be written.
    #[error("failed to save image to {}: {}", path.display(), source)]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl CoinError {
    pub fn load(source_name: impl Into<String>, source: image::ImageError) -> Self {
        Self::Load {
            source_name: source_name.into(),
            source,
        }
    }

    pub fn detection(details: impl Into<String>) -> Self {
        Self::Detection(details.into())
    }

    pub fn config(details: impl Into<String>) -> Self {
        Self::Config(details.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
