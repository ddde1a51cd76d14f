use std::collections::HashSet;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::Url;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::CrawlerConfig;
use crate::error::AppError;

/// Fetches search-engine result pages and pulls image URLs out of them.
///
/// Page fetches share a process-wide concurrency cap, and fetches against
/// the same host are spaced at least `min_interval_ms` apart.
pub struct Crawler {
    client: reqwest::Client,
    config: CrawlerConfig,
    permits: Semaphore,
    min_interval: Duration,
    /// Earliest instant the next fetch against each host may start.
    next_slot: DashMap<String, Instant>,
}

impl Crawler {
    pub fn new(client: reqwest::Client, config: CrawlerConfig) -> Self {
        Self {
            client,
            permits: Semaphore::new(config.max_concurrency.max(1)),
            min_interval: Duration::from_millis(config.min_interval_ms),
            next_slot: DashMap::new(),
            config,
        }
    }

    pub fn default_count(&self) -> u32 {
        self.config.default_count
    }

    pub fn max_count(&self) -> u32 {
        self.config.max_count
    }

    /// Results page URL for `text`, substituted into the configured template.
    pub fn search_url(&self, text: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.config.search_url)
            .map_err(|e| AppError::System(format!("invalid crawler search_url: {e}")))?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if v == "{query}" { text.to_string() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        Ok(url)
    }

    async fn wait_turn(&self, host: &str) {
        let now = Instant::now();
        let start = {
            let mut slot = self.next_slot.entry(host.to_string()).or_insert(now);
            let start = (*slot).max(now);
            *slot = start + self.min_interval;
            start
        };
        if start > now {
            debug!(host, wait_ms = (start - now).as_millis() as u64, "Spacing crawler fetch");
            tokio::time::sleep_until(start).await;
        }
    }

    /// Fetch one results page as text.
    pub async fn fetch_page(&self, url: &Url) -> Result<String, AppError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AppError::System("crawler semaphore closed".into()))?;
        self.wait_turn(url.host_str().unwrap_or_default()).await;

        let failed = |detail: String| {
            warn!(url = %url, "Search page fetch failed: {detail}");
            AppError::Operation("fetch search page failed".into())
        };
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("status {}", response.status())));
        }
        response.text().await.map_err(|e| failed(e.to_string()))
    }

    /// Image URLs on a fetched page, at most `limit`.
    pub fn discover(&self, html: &str, base: &Url, limit: usize) -> Result<Vec<String>, AppError> {
        extract_image_urls(html, &self.config.image_selector, base, limit)
    }
}

/// Drop the query string and fragment from an image URL.
pub fn strip_query(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Collect distinct absolute http(s) image URLs matched by `selector`, in
/// document order. Relative sources are resolved against `base`; `src` is
/// preferred over the lazy-loading `data-src`.
pub fn extract_image_urls(
    html: &str,
    selector: &str,
    base: &Url,
    limit: usize,
) -> Result<Vec<String>, AppError> {
    let selector = Selector::parse(selector)
        .map_err(|e| AppError::System(format!("invalid crawler image_selector: {e}")))?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for element in document.select(&selector) {
        if urls.len() >= limit {
            break;
        }
        let Some(src) = element
            .value()
            .attr("src")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| element.value().attr("data-src"))
        else {
            continue;
        };
        let Ok(resolved) = base.join(src.trim()) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        let cleaned = strip_query(resolved).to_string();
        if seen.insert(cleaned.clone()) {
            urls.push(cleaned);
        }
    }
    Ok(urls)
}
