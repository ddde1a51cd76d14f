use std::io::Cursor;

use image::ImageReader;
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Decoded properties of a stored image, as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    /// Lowercase format name, e.g. `jpeg`, `png`, `webp`.
    pub format: String,
}

impl ImageDescriptor {
    /// Decode width, height and format from the image header in `data`.
    ///
    /// Only the header is read; the pixel data is never decoded.
    pub fn probe(key: &str, data: &[u8]) -> Result<Self, StorageError> {
        let missing = |reason: String| StorageError::MissingImageInfo {
            key: key.to_string(),
            reason,
        };

        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| missing(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| missing("unrecognized image format".into()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| missing(e.to_string()))?;

        Ok(Self {
            width,
            height,
            format: format!("{format:?}").to_lowercase(),
        })
    }
}
