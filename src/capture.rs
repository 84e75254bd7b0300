//! # Capture Boundary
//!
//! Checks applied to images before they enter the pipeline: only JPEG and
//! PNG are accepted, each no larger than the configured ceiling. The
//! pipeline itself assumes every image it receives already passed here.

use image::ImageFormat;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Could not read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image {path} is not a JPEG or PNG")]
    UnsupportedFormat { path: PathBuf },

    #[error("Image {path} is {size} bytes, limit is {max}")]
    TooLarge { path: PathBuf, size: usize, max: usize },

    #[error("No images given")]
    Empty,
}

/// Validates one image buffer, returning its detected format.
pub fn validate_image(path: &Path, bytes: &[u8], max_bytes: usize) -> Result<ImageFormat, CaptureError> {
    if bytes.len() > max_bytes {
        return Err(CaptureError::TooLarge {
            path: path.to_path_buf(),
            size: bytes.len(),
            max: max_bytes,
        });
    }
    match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
        _ => Err(CaptureError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Reads and validates images in the given order.
pub fn load_images(paths: &[PathBuf], max_bytes: usize) -> Result<Vec<Vec<u8>>, CaptureError> {
    if paths.is_empty() {
        return Err(CaptureError::Empty);
    }

    let mut images = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let bytes = fs::read(path).map_err(|source| CaptureError::Io {
            path: path.clone(),
            source,
        })?;
        let format = validate_image(path, &bytes, max_bytes)?;
        info!(
            "Image {} ({:?}) loaded: {} bytes",
            index + 1,
            format,
            bytes.len()
        );
        images.push(bytes);
    }
    Ok(images)
}
