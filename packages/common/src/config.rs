use std::path::PathBuf;

use serde::Deserialize;

/// Which object-storage backend holds uploaded pictures.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// App-level object storage configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Backend selector. Default: "filesystem".
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub filesystem: FilesystemStorageConfig,
    /// Required when `backend = "s3"`.
    pub s3: Option<S3StorageConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemStorageConfig {
    /// Directory that receives uploaded objects. Default: "./data/assets".
    #[serde(default = "default_fs_root")]
    pub root: PathBuf,
    /// Public URL prefix the objects are served under. Default: "/assets".
    #[serde(default = "default_fs_public_base_url")]
    pub public_base_url: String,
}

fn default_fs_root() -> PathBuf {
    PathBuf::from("./data/assets")
}
fn default_fs_public_base_url() -> String {
    "/assets".into()
}

impl Default for FilesystemStorageConfig {
    fn default() -> Self {
        Self {
            root: default_fs_root(),
            public_base_url: default_fs_public_base_url(),
        }
    }
}

/// S3-compatible bucket with a store-side image-info endpoint
/// (e.g. a COS bucket with image processing enabled).
#[derive(Debug, Deserialize, Clone)]
pub struct S3StorageConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    /// Public host objects are reachable under, e.g. `https://bucket.cos.ap-shanghai.myqcloud.com`.
    pub public_host: String,
    /// Query appended to an object URL to ask the store for decoded image
    /// metadata. Default: "?imageInfo".
    #[serde(default = "default_image_info_suffix")]
    pub image_info_suffix: String,
    #[serde(default)]
    pub path_style: bool,
}

fn default_image_info_suffix() -> String {
    "?imageInfo".into()
}
