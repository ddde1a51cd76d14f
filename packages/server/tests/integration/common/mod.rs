use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Path;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use common::config::{FilesystemStorageConfig, StorageBackend, StorageConfig};
use image::{ImageFormat, RgbImage};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tempfile::TempDir;

use picshelf_server::config::{
    AppConfig, AuthConfig, BootstrapAdmin, CorsConfig, CrawlerConfig, DatabaseConfig, IdConfig,
    PaginationConfig, ServerConfig, UploadConfig,
};
use picshelf_server::state::AppState;
use picshelf_server::utils::hash::PasswordCodec;
use picshelf_server::utils::id::IdGenerator;

pub const ADMIN_ACCOUNT: &str = "root_admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const DEFAULT_PASSWORD: &str = "12345678";
const PASSWORD_SALT: &str = "integration-salt";

pub mod routes {
    pub const REGISTER: &str = "/api/user/register";
    pub const LOGIN: &str = "/api/user/login";
    pub const SESSION: &str = "/api/user/session";
    pub const LOGOUT: &str = "/api/user/logout";
    pub const USER_SELF_EDIT: &str = "/api/user/self/edit";
    pub const USER_SEARCH: &str = "/api/user/search";
    pub const USER_ADD: &str = "/api/user/add";
    pub const USER_DELETE: &str = "/api/user/delete";
    pub const USER_UPDATE: &str = "/api/user/update";
    pub const USER_QUERY: &str = "/api/user/query";

    pub fn user_get(id: i64) -> String {
        format!("/api/user/get?id={id}")
    }

    pub const PICTURE_UPLOAD: &str = "/api/picture/upload";
    pub const PICTURE_UPLOAD_URL: &str = "/api/picture/upload/url";
    pub const PICTURE_SELF_EDIT: &str = "/api/picture/self-edit";
    pub const PICTURE_SEARCH: &str = "/api/picture/search";
    pub const PICTURE_TAG_CATEGORY: &str = "/api/picture/tag_category";
    pub const PICTURE_DELETE: &str = "/api/picture/delete";
    pub const PICTURE_UPDATE: &str = "/api/picture/update";
    pub const PICTURE_QUERY: &str = "/api/picture/query";
    pub const PICTURE_REVIEW: &str = "/api/picture/review";
    pub const PICTURE_BATCH: &str = "/api/picture/batch-upload";

    pub fn picture_get(id: i64) -> String {
        format!("/api/picture/get?id={id}")
    }

    pub fn picture_get_full(id: i64) -> String {
        format!("/api/picture/get-full?id={id}")
    }
}

/// Encode a blank PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn image_response(content_type: &'static str, body: Vec<u8>) -> Response {
    // Explicit length so HEAD probes see it.
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, body.len().to_string()),
        ],
        body,
    )
        .into_response()
}

async fn fixture_image(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "wide.png" => image_response("image/png", png_bytes(200, 100)),
        "tall.png" => image_response("image/png", png_bytes(50, 100)),
        // No extension in the path; the type comes from the header.
        "download" => image_response("image/png; charset=binary", png_bytes(30, 30)),
        "big.png" => image_response("image/png", vec![0u8; 3 * 1024 * 1024]),
        "note.png" => image_response("text/plain", b"not a picture".to_vec()),
        "anim.gif" => image_response("image/gif", vec![0u8; 16]),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Search results page shaped like the engine's: result thumbnails carry
/// the `mimg` class, everything else is noise.
async fn fixture_search() -> Html<&'static str> {
    Html(
        r#"<html><body>
            <img class="logo" src="/img/wide.png">
            <img class="mimg" src="/img/wide.png?w=200&h=100">
            <img class="mimg" src="/img/missing.png">
            <img class="mimg" src="/img/wide.png?w=400">
            <img class="mimg" src="/img/note.png">
            <img class="mimg" src="/img/tall.png?rs=1">
            <img class="mimg" src="/img/download">
        </body></html>"#,
    )
}

/// Serves the images and the search page the app fetches from.
async fn spawn_fixture_server() -> SocketAddr {
    let app = axum::Router::new()
        .route("/img/{name}", get(fixture_image))
        .route("/search", get(fixture_search));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fixture server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A running test server with an in-memory database and a scratch asset
/// directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub fixtures: SocketAddr,
    pub db: DatabaseConnection,
    _assets: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    /// Envelope code of the response.
    pub fn code(&self) -> i64 {
        self.body["code"].as_i64().unwrap_or(-1)
    }

    pub fn id(&self) -> i64 {
        self.body["id"]
            .as_i64()
            .unwrap_or_else(|| panic!("no id in response: {}", self.text))
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let fixtures = spawn_fixture_server().await;
        let assets = tempfile::tempdir().expect("Failed to create asset dir");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            auth: AuthConfig {
                session_secret: "test-secret-for-integration-tests".to_string(),
                password_salt: PASSWORD_SALT.to_string(),
                cookie_name: "picshelf_session".to_string(),
                session_ttl_hours: 1,
                default_password: DEFAULT_PASSWORD.to_string(),
                bootstrap_admin: Some(BootstrapAdmin {
                    account: ADMIN_ACCOUNT.to_string(),
                    password: ADMIN_PASSWORD.to_string(),
                }),
            },
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                filesystem: FilesystemStorageConfig {
                    root: assets.path().join("assets"),
                    public_base_url: "/assets".to_string(),
                },
                s3: None,
            },
            upload: UploadConfig::default(),
            pagination: PaginationConfig::default(),
            crawler: CrawlerConfig {
                search_url: format!("http://{fixtures}/search?q={{query}}"),
                min_interval_ms: 0,
                ..CrawlerConfig::default()
            },
            id: IdConfig { node_id: 1 },
        };

        let db = picshelf_server::database::init_db(&config.database.url)
            .await
            .expect("Failed to initialize database");
        let ids = Arc::new(IdGenerator::new(config.id.node_id).unwrap());
        let admin = config.auth.bootstrap_admin.clone().unwrap();
        picshelf_server::seed::seed_admin(&db, &ids, &PasswordCodec::new(PASSWORD_SALT), &admin)
            .await
            .expect("Failed to seed admin");

        let store = picshelf_server::build_asset_store(&config.storage)
            .await
            .expect("Failed to open asset store");
        let state = AppState::new(config, db.clone(), store, ids).expect("Failed to build state");
        let app = picshelf_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            fixtures,
            db,
            _assets: assets,
        }
    }

    /// A fresh client with its own cookie jar and nobody logged in.
    pub fn anonymous(&self) -> Session {
        Session {
            base: format!("http://{}", self.addr),
            client: Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to build client"),
        }
    }

    /// Log in with existing credentials.
    pub async fn login(&self, account: &str, password: &str) -> Session {
        let session = self.anonymous();
        let res = session
            .post(
                routes::LOGIN,
                &serde_json::json!({"account": account, "password": password}),
            )
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);
        session
    }

    /// Register `account` and log in as it. Returns the session and user id.
    pub async fn register_and_login(&self, account: &str, password: &str) -> (Session, i64) {
        let res = self
            .anonymous()
            .post(
                routes::REGISTER,
                &serde_json::json!({"account": account, "password": password}),
            )
            .await;
        assert_eq!(res.status, 200, "Registration failed: {}", res.text);
        (self.login(account, password).await, res.id())
    }

    pub async fn admin(&self) -> Session {
        self.login(ADMIN_ACCOUNT, ADMIN_PASSWORD).await
    }

    pub fn fixture_url(&self, path: &str) -> String {
        format!("http://{}{}", self.fixtures, path)
    }
}

/// A client bound to one cookie jar, i.e. one logged-in (or anonymous) user.
pub struct Session {
    base: String,
    client: Client,
}

impl Session {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");
        TestResponse::from_response(res).await
    }

    /// Multipart upload with optional `id` and `name` fields.
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        id: Option<i64>,
        name: Option<&str>,
    ) -> TestResponse {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .expect("Failed to set MIME type");
        let mut form = Form::new().part("file", part);
        if let Some(id) = id {
            form = form.text("id", id.to_string());
        }
        if let Some(name) = name {
            form = form.text("name", name.to_string());
        }

        let res = self
            .client
            .post(self.url(routes::PICTURE_UPLOAD))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart request");
        TestResponse::from_response(res).await
    }

    /// Upload a small PNG and return the new picture id.
    pub async fn upload_png(&self, file_name: &str) -> i64 {
        let res = self
            .upload_file(file_name, png_bytes(40, 20), None, None)
            .await;
        assert_eq!(res.status, 200, "Upload failed: {}", res.text);
        res.id()
    }
}
