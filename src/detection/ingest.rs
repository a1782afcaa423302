use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageReader, RgbImage};
use tracing::debug;

use crate::detection::preprocessing;
use crate::error::{CoinError, Result};

/// A decoded photo in both the color and the grayscale form.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub color: RgbImage,
    pub gray: GrayImage,
}

impl LoadedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }
}

/// Split an already decoded image into color and grayscale buffers.
pub fn from_dynamic(img: DynamicImage) -> LoadedImage {
    let gray = preprocessing::to_grayscale(&img);
    LoadedImage {
        color: img.into_rgb8(),
        gray,
    }
}

/// Load and decode an image file. The format is detected from its content.
pub fn load_image(path: impl AsRef<Path>) -> Result<LoadedImage> {
    let path = path.as_ref();
    let source_name = path.display().to_string();

    let img = ImageReader::open(path)
        .map_err(|e| CoinError::load(&source_name, image::ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| CoinError::load(&source_name, image::ImageError::IoError(e)))?
        .decode()
        .map_err(|e| CoinError::load(&source_name, e))?;

    debug!(path = %source_name, width = img.width(), height = img.height(), "image loaded");
    Ok(from_dynamic(img))
}

/// Decode an in-memory image buffer.
pub fn decode_image(bytes: &[u8]) -> Result<LoadedImage> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CoinError::load("memory buffer", image::ImageError::IoError(e)))?
        .decode()
        .map_err(|e| CoinError::load("memory buffer", e))?;

    debug!(width = img.width(), height = img.height(), "image decoded from memory");
    Ok(from_dynamic(img))
}
