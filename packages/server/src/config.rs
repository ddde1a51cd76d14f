use common::config::StorageConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Account created at startup when absent, so a fresh deployment has an admin.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub account: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Signs session tokens.
    pub session_secret: String,
    /// Application-wide salt mixed into every password before hashing.
    pub password_salt: String,
    pub cookie_name: String,
    pub session_ttl_hours: i64,
    /// Password given to accounts created by an administrator.
    pub default_password: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub max_file_size: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 2 * 1024 * 1024,
            fetch_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PaginationConfig {
    pub default_size: u64,
    pub max_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    /// Results page URL; `{query}` is replaced by the URL-encoded search text.
    pub search_url: String,
    /// CSS selector matching the result images on that page.
    pub image_selector: String,
    /// Parallel results-page fetches allowed across the whole process.
    pub max_concurrency: usize,
    /// Minimum delay between two fetches against the same domain.
    pub min_interval_ms: u64,
    pub default_count: u32,
    pub max_count: u32,
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            search_url: "https://cn.bing.com/images/async?q={query}&mmasync=1".into(),
            image_selector: "img.mimg".into(),
            max_concurrency: 2,
            min_interval_ms: 1000,
            default_count: 10,
            max_count: 30,
            user_agent: "Mozilla/5.0 (compatible; picshelf/0.1)".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdConfig {
    pub node_id: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub id: IdConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 43200)?
            .set_default("database.url", "sqlite://picshelf.db?mode=rwc")?
            .set_default("auth.cookie_name", "picshelf_session")?
            .set_default("auth.session_ttl_hours", 24 * 7)?
            .set_default("auth.default_password", "12345678")?
            .set_default("id.node_id", 0)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., PICSHELF__AUTH__SESSION_SECRET)
            .add_source(Environment::with_prefix("PICSHELF").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
