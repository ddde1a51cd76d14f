use async_trait::async_trait;

use super::descriptor::ImageDescriptor;
use super::error::StorageError;

/// Key-addressed object storage for picture assets.
///
/// Writing an image also yields its decoded dimensions and format; the
/// ingestion pipeline never trusts those values from the caller.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `data` under `key` and return the store's analysis of the image.
    ///
    /// A backend that cannot report the descriptor must fail with
    /// [`StorageError::MissingImageInfo`].
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<ImageDescriptor, StorageError>;

    /// Retrieve all bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Absolute URL the object under `key` is served from.
    fn public_url(&self, key: &str) -> String;
}
