use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use picshelf_server::config::AppConfig;
use picshelf_server::state::AppState;
use picshelf_server::utils::hash::PasswordCodec;
use picshelf_server::utils::id::IdGenerator;
use picshelf_server::{build_asset_store, build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides; otherwise info with quiet dependencies.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,sqlx=warn,hyper=warn,tower_http=info"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    let ids = Arc::new(IdGenerator::new(config.id.node_id)?);

    if let Some(admin) = &config.auth.bootstrap_admin {
        let codec = PasswordCodec::new(config.auth.password_salt.clone());
        seed::seed_admin(&db, &ids, &codec, admin).await?;
    }

    let store = build_asset_store(&config.storage)
        .await
        .context("Failed to open asset store")?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;

    let state = AppState::new(config, db, store, ids)?;
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
