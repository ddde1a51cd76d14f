use std::time::Duration;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use serde::{Deserialize, Deserializer};

use super::descriptor::ImageDescriptor;
use super::error::StorageError;
use super::traits::AssetStore;
use crate::config::S3StorageConfig;

/// S3-compatible asset store whose bucket analyses images on request.
///
/// After a successful PUT the store is asked for the decoded image info by
/// fetching `{public_host}/{key}{image_info_suffix}`. A bucket without that
/// capability makes every `put` fail with [`StorageError::MissingImageInfo`].
pub struct S3AssetStore {
    bucket: Box<Bucket>,
    http: reqwest::Client,
    public_host: String,
    image_info_suffix: String,
}

impl S3AssetStore {
    pub fn new(config: &S3StorageConfig) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(Self {
            bucket,
            http,
            public_host: config.public_host.trim_end_matches('/').to_string(),
            image_info_suffix: config.image_info_suffix.clone(),
        })
    }

    async fn image_info(&self, key: &str) -> Result<ImageDescriptor, StorageError> {
        let missing = |reason: String| StorageError::MissingImageInfo {
            key: key.to_string(),
            reason,
        };

        let url = format!("{}{}", self.public_url(key), self.image_info_suffix);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| missing(e.to_string()))?;
        if !response.status().is_success() {
            return Err(missing(format!("image info returned {}", response.status())));
        }

        let info: RemoteImageInfo = response.json().await.map_err(|e| missing(e.to_string()))?;
        Ok(ImageDescriptor {
            width: info.width,
            height: info.height,
            format: info.format.to_lowercase(),
        })
    }
}

/// Image info payload; some stores encode the numbers as strings.
#[derive(Deserialize)]
struct RemoteImageInfo {
    format: String,
    #[serde(deserialize_with = "number_or_string")]
    width: u32,
    #[serde(deserialize_with = "number_or_string")]
    height: u32,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<ImageDescriptor, StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if !(200..300).contains(&response.status_code()) {
            return Err(StorageError::Backend(format!(
                "PUT {key} returned {}",
                response.status_code()
            )));
        }

        match self.image_info(key).await {
            Ok(descriptor) => Ok(descriptor),
            Err(e) => {
                // Nothing will reference an object we could not describe.
                if let Err(cleanup) = self.bucket.delete_object(key).await {
                    tracing::warn!(key, "Failed to remove unanalysed object: {cleanup}");
                }
                Err(e)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        match response.status_code() {
            200..=299 => Ok(response.bytes().to_vec()),
            404 => Err(StorageError::NotFound(key.to_string())),
            code => Err(StorageError::Backend(format!("GET {key} returned {code}"))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_host)
    }
}
