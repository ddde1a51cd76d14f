use std::sync::Arc;
use std::time::Duration;

use common::storage::AssetStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::picture::PictureService;
use crate::services::user::UserService;
use crate::upload::UploadPipeline;
use crate::upload::crawler::Crawler;
use crate::upload::url::UrlFetcher;
use crate::utils::hash::PasswordCodec;
use crate::utils::id::IdGenerator;
use crate::utils::session::SessionKeys;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionKeys>,
    pub users: UserService,
    pub pictures: PictureService,
}

impl AppState {
    /// Wire the services together. The id generator is shared so users and
    /// pictures draw from one sequence.
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        store: Arc<dyn AssetStore>,
        ids: Arc<IdGenerator>,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.upload.fetch_timeout_secs))
            .build()
            .map_err(|e| AppError::System(format!("Failed to build HTTP client: {e}")))?;

        let codec = Arc::new(PasswordCodec::new(config.auth.password_salt.clone()));
        let users = UserService::new(
            db.clone(),
            ids.clone(),
            codec,
            config.pagination,
            config.auth.default_password.clone(),
        );

        let pipeline = UploadPipeline::new(store, config.upload.max_file_size);
        let fetcher = UrlFetcher::new(
            http.clone(),
            Duration::from_secs(config.upload.fetch_timeout_secs),
            config.upload.max_file_size,
        );
        let crawler = Arc::new(Crawler::new(http, config.crawler.clone()));
        let pictures = PictureService::new(
            db.clone(),
            ids,
            pipeline,
            fetcher,
            crawler,
            config.pagination,
        );

        Ok(Self {
            sessions: Arc::new(SessionKeys::new(&config.auth)),
            config: Arc::new(config),
            db,
            users,
            pictures,
        })
    }
}
