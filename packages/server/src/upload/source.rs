use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::AppError;

/// Extensions accepted for stored pictures (lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "svg", "png", "webp"];

pub fn is_allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Lowercased extension of a file name, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// File name with its extension removed.
pub fn stem_of(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

/// Where picture bytes come from.
#[async_trait]
pub trait PictureSource: Send {
    /// Reject the source before anything is staged.
    async fn validate(&mut self) -> Result<(), AppError>;

    /// Name the caller knows the picture by; used for the default name and
    /// the stored extension.
    fn original_name(&self) -> String;

    /// Lowercase extension for the storage key.
    fn extension(&self) -> Option<String> {
        extension_of(&self.original_name()).filter(|e| is_allowed_extension(e))
    }

    /// Write the picture bytes into `staging`.
    async fn stage(&mut self, staging: &mut StagingFile) -> Result<(), AppError>;
}

/// Anonymous temporary file holding the bytes of one upload.
///
/// The file is unlinked on creation and disappears when this value drops,
/// whichever way the upload ends.
pub struct StagingFile {
    file: File,
    len: u64,
    limit: u64,
}

impl StagingFile {
    pub fn new(limit: u64) -> Result<Self, AppError> {
        let file = tempfile::tempfile()
            .map_err(|e| AppError::System(format!("Failed to create staging file: {e}")))?;
        Ok(Self {
            file: File::from_std(file),
            len: 0,
            limit,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a chunk, refusing to grow past the size limit.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), AppError> {
        let next = self.len + chunk.len() as u64;
        if next > self.limit {
            return Err(AppError::Param(format!(
                "file size exceeds {} bytes",
                self.limit
            )));
        }
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| AppError::System(format!("Failed to write staging file: {e}")))?;
        self.len = next;
        Ok(())
    }

    /// Read everything staged so far.
    pub async fn read_all(&mut self) -> Result<Vec<u8>, AppError> {
        let io = |e: std::io::Error| AppError::System(format!("Failed to read staging file: {e}"));
        self.file.flush().await.map_err(io)?;
        self.file.seek(SeekFrom::Start(0)).await.map_err(io)?;
        let mut data = Vec::with_capacity(self.len as usize);
        self.file.read_to_end(&mut data).await.map_err(io)?;
        Ok(data)
    }
}
