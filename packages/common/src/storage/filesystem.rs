use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::descriptor::ImageDescriptor;
use super::error::StorageError;
use super::traits::AssetStore;

/// Filesystem-backed asset store.
///
/// Objects live at `{base_path}/{key}`; writes go through `{base_path}/.tmp`
/// and are renamed into place. Image analysis is done locally from the
/// image header, standing in for the store-side analysis of a remote bucket.
pub struct FilesystemAssetStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl FilesystemAssetStore {
    pub async fn new(
        base_path: PathBuf,
        public_base_url: impl Into<String>,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain || key.starts_with(".tmp") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(relative))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        let flat = key.replace('/', "_");
        self.base_path
            .join(".tmp")
            .join(format!("{}-{flat}", std::process::id()))
    }
}

#[async_trait]
impl AssetStore for FilesystemAssetStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        _content_type: &str,
    ) -> Result<ImageDescriptor, StorageError> {
        let object_path = self.object_path(key)?;
        let descriptor = ImageDescriptor::probe(key, data)?;

        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path(key);
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(key, width = descriptor.width, height = descriptor.height, "Stored asset");
        Ok(descriptor)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let object_path = self.object_path(key)?;
        match fs::read(&object_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }
}
