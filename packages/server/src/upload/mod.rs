//! Turning an upload source into a stored asset plus its image metadata.

pub mod crawler;
pub mod file;
pub mod source;
pub mod url;

use std::sync::Arc;

use chrono::Utc;
use common::storage::AssetStore;
use tracing::{info, instrument};

use crate::error::AppError;
use source::{PictureSource, StagingFile, stem_of};

/// What the asset store ended up holding for one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedPicture {
    pub url: String,
    /// Original name without extension.
    pub name: String,
    pub size: i64,
    pub width: i32,
    pub height: i32,
    /// width / height, rounded to two decimals.
    pub scale: f64,
    pub format: String,
}

/// Storage key for a picture: `{prefix}/{YYYY-MM-DD}_{id}.{ext}`.
pub fn storage_key(prefix: &str, id: i64, ext: &str) -> String {
    let day = Utc::now().format("%Y-%m-%d");
    format!("{}/{day}_{id}.{ext}", prefix.trim_end_matches('/'))
}

pub fn aspect_ratio(width: u32, height: u32) -> Result<f64, AppError> {
    if width == 0 || height == 0 {
        return Err(AppError::Operation("picture has no dimensions".into()));
    }
    Ok((f64::from(width) / f64::from(height) * 100.0).round() / 100.0)
}

/// Validates, stages and stores picture bytes.
#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<dyn AssetStore>,
    max_size: u64,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn AssetStore>, max_size: u64) -> Self {
        Self { store, max_size }
    }

    /// Run one source through the pipeline, storing under `prefix` with a key
    /// named after picture `id`.
    ///
    /// The staged copy is removed however this returns.
    #[instrument(skip(self, source))]
    pub async fn ingest(
        &self,
        source: &mut dyn PictureSource,
        prefix: &str,
        id: i64,
    ) -> Result<UploadedPicture, AppError> {
        source.validate().await?;

        let original = source.original_name();
        let ext = source
            .extension()
            .ok_or_else(|| AppError::Param("file type error".into()))?;
        let key = storage_key(prefix, id, &ext);

        let mut staging = StagingFile::new(self.max_size)?;
        source.stage(&mut staging).await?;
        if staging.is_empty() {
            return Err(AppError::Param("file is empty".into()));
        }
        let data = staging.read_all().await?;

        let content_type = mime_guess::from_ext(&ext).first_or_octet_stream();
        let descriptor = self.store.put(&key, &data, content_type.as_ref()).await?;
        let scale = aspect_ratio(descriptor.width, descriptor.height)?;

        info!(key = %key, size = data.len(), "Stored picture");
        Ok(UploadedPicture {
            url: self.store.public_url(&key),
            name: stem_of(&original),
            size: data.len() as i64,
            width: i32::try_from(descriptor.width)
                .map_err(|_| AppError::Operation("picture is too wide".into()))?,
            height: i32::try_from(descriptor.height)
                .map_err(|_| AppError::Operation("picture is too tall".into()))?,
            scale,
            format: descriptor.format,
        })
    }
}
