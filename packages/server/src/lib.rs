pub mod config;
pub mod dal;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod upload;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use common::config::{StorageBackend, StorageConfig};
use common::storage::{AssetStore, StorageError, filesystem::FilesystemAssetStore, s3::S3AssetStore};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Picshelf API",
        version = "0.1.0",
        description = "Picture library with accounts, uploads and moderation. Successful responses are wrapped as `{\"code\":0,\"message\":\"ok\", ...}`."
    ),
    paths(
        handlers::user::register,
        handlers::user::login,
        handlers::user::current_user,
        handlers::user::logout,
        handlers::user::self_edit,
        handlers::user::search,
        handlers::user::add_user,
        handlers::user::delete_user,
        handlers::user::update_user,
        handlers::user::query_users,
        handlers::user::get_user,
        handlers::picture::upload,
        handlers::picture::upload_by_url,
        handlers::picture::self_edit,
        handlers::picture::search,
        handlers::picture::get,
        handlers::picture::tag_category,
        handlers::picture::delete,
        handlers::picture::update,
        handlers::picture::query,
        handlers::picture::get_full,
        handlers::picture::review,
        handlers::picture::batch_upload,
    ),
    tags(
        (name = "User", description = "Registration, login and the caller's own account"),
        (name = "User Admin", description = "Account management for admins"),
        (name = "Picture", description = "Uploading, editing and browsing pictures"),
        (name = "Picture Admin", description = "Moderation and bulk ingestion for admins"),
    ),
)]
struct ApiDoc;

/// Open the asset store selected by the configuration.
pub async fn build_asset_store(config: &StorageConfig) -> Result<Arc<dyn AssetStore>, StorageError> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store = FilesystemAssetStore::new(
                config.filesystem.root.clone(),
                config.filesystem.public_base_url.clone(),
            )
            .await?;
            Ok(Arc::new(store))
        }
        StorageBackend::S3 => {
            let s3 = config.s3.as_ref().ok_or_else(|| {
                StorageError::Backend("storage.s3 must be set for the s3 backend".into())
            })?;
            Ok(Arc::new(S3AssetStore::new(s3)?))
        }
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let config = state.config.clone();

    let mut router = axum::Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()));

    // Locally stored pictures are served by this process.
    let storage = &config.storage;
    if storage.backend == StorageBackend::Filesystem
        && storage.filesystem.public_base_url.starts_with('/')
    {
        router = router.nest_service(
            storage.filesystem.public_base_url.trim_end_matches('/'),
            ServeDir::new(&storage.filesystem.root),
        );
    }

    router
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.server.cors))
        .layer(TraceLayer::new_for_http())
}
