use async_trait::async_trait;
use axum::body::Bytes;

use super::source::{PictureSource, StagingFile, extension_of, is_allowed_extension};
use crate::error::AppError;

/// A file received in a multipart form.
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Picture bytes sent directly by the caller.
pub struct FileSource {
    file: Option<UploadedFile>,
    max_size: u64,
}

impl FileSource {
    pub fn new(file: Option<UploadedFile>, max_size: u64) -> Self {
        Self { file, max_size }
    }

    fn file(&self) -> Result<&UploadedFile, AppError> {
        self.file
            .as_ref()
            .ok_or_else(|| AppError::Param("no file uploaded".into()))
    }
}

#[async_trait]
impl PictureSource for FileSource {
    async fn validate(&mut self) -> Result<(), AppError> {
        let file = self.file()?;
        if file.bytes.is_empty() {
            return Err(AppError::Param("file is empty".into()));
        }
        if file.bytes.len() as u64 > self.max_size {
            return Err(AppError::Param(format!(
                "file size exceeds {} bytes",
                self.max_size
            )));
        }
        let ext = extension_of(&file.file_name)
            .ok_or_else(|| AppError::Param("file format error".into()))?;
        if !is_allowed_extension(&ext) {
            return Err(AppError::Param("file type error".into()));
        }
        Ok(())
    }

    fn original_name(&self) -> String {
        self.file
            .as_ref()
            .map(|f| f.file_name.clone())
            .unwrap_or_default()
    }

    async fn stage(&mut self, staging: &mut StagingFile) -> Result<(), AppError> {
        let bytes = self.file()?.bytes.clone();
        staging.write(&bytes).await
    }
}
