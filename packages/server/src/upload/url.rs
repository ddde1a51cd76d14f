use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use tracing::warn;

use super::source::{PictureSource, StagingFile, extension_of, is_allowed_extension};
use crate::error::AppError;

/// Shared HTTP settings for pulling pictures off remote URLs.
#[derive(Clone)]
pub struct UrlFetcher {
    client: reqwest::Client,
    probe_timeout: Duration,
    download_timeout: Duration,
    max_size: u64,
}

impl UrlFetcher {
    pub fn new(client: reqwest::Client, probe_timeout: Duration, max_size: u64) -> Self {
        Self {
            client,
            probe_timeout,
            download_timeout: probe_timeout * 6,
            max_size,
        }
    }

    pub fn source(&self, url: impl Into<String>) -> UrlSource {
        UrlSource {
            fetcher: self.clone(),
            raw: url.into(),
            url: None,
            subtype: None,
        }
    }
}

/// Split a `Content-Type` value into lowercase `(type, subtype)`, dropping
/// parameters and any structured-syntax suffix (`svg+xml` becomes `svg`).
pub fn parse_content_type(value: &str) -> Option<(String, String)> {
    let essence = value.split(';').next()?.trim().to_ascii_lowercase();
    let (main, sub) = essence.split_once('/')?;
    let sub = sub.split('+').next().unwrap_or(sub).trim();
    if main.is_empty() || sub.is_empty() {
        return None;
    }
    Some((main.to_string(), sub.to_string()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: reqwest::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Picture bytes pulled from a caller-supplied URL.
pub struct UrlSource {
    fetcher: UrlFetcher,
    raw: String,
    url: Option<Url>,
    subtype: Option<String>,
}

impl UrlSource {
    fn validated_url(&self) -> Result<&Url, AppError> {
        self.url
            .as_ref()
            .ok_or_else(|| AppError::System("url source staged before validation".into()))
    }

    fn too_large(&self) -> AppError {
        AppError::Param(format!("file size exceeds {} bytes", self.fetcher.max_size))
    }
}

#[async_trait]
impl PictureSource for UrlSource {
    async fn validate(&mut self) -> Result<(), AppError> {
        let raw = self.raw.trim();
        if raw.is_empty() {
            return Err(AppError::Param("file url is empty".into()));
        }
        let url = Url::parse(raw).map_err(|_| AppError::Param("malformed file url".into()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Param(
                "only http and https file urls are supported".into(),
            ));
        }

        let response = self
            .fetcher
            .client
            .head(url.clone())
            .timeout(self.fetcher.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, "HEAD probe failed: {e}");
                AppError::Operation("file url is not reachable".into())
            })?;
        if !response.status().is_success() {
            return Err(AppError::Param(format!(
                "file url responded with {}",
                response.status()
            )));
        }

        let headers = response.headers();
        let (main, sub) = header_str(headers, CONTENT_TYPE)
            .and_then(parse_content_type)
            .ok_or_else(|| AppError::Param("file url has no content type".into()))?;
        if main != "image" {
            return Err(AppError::Param("file url is not an image".into()));
        }
        if !is_allowed_extension(&sub) {
            return Err(AppError::Param("file type error".into()));
        }

        // `Response::content_length` reports the (empty) body of a HEAD
        // response, so read the header itself.
        let length: u64 = header_str(headers, CONTENT_LENGTH)
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| AppError::Param("file url has no content length".into()))?;
        if length > self.fetcher.max_size {
            return Err(self.too_large());
        }

        self.url = Some(url);
        self.subtype = Some(sub);
        Ok(())
    }

    fn original_name(&self) -> String {
        let from_path = self
            .url
            .as_ref()
            .and_then(|u| u.path_segments())
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        from_path.unwrap_or_else(|| "picture".to_string())
    }

    fn extension(&self) -> Option<String> {
        extension_of(&self.original_name())
            .filter(|e| is_allowed_extension(e))
            .or_else(|| self.subtype.clone())
    }

    async fn stage(&mut self, staging: &mut StagingFile) -> Result<(), AppError> {
        let url = self.validated_url()?.clone();
        let failed = |e: reqwest::Error| {
            warn!(url = %url, "Download failed: {e}");
            AppError::Operation("download file url failed".into())
        };

        let mut response = self
            .fetcher
            .client
            .get(url.clone())
            .timeout(self.fetcher.download_timeout)
            .send()
            .await
            .map_err(failed)?;
        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "Download refused");
            return Err(AppError::Operation("download file url failed".into()));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.fetcher.max_size)
        {
            return Err(self.too_large());
        }

        // The HEAD answer is not trusted; the limit is enforced on the bytes.
        while let Some(chunk) = response.chunk().await.map_err(failed)? {
            staging.write(&chunk).await?;
        }
        Ok(())
    }
}
