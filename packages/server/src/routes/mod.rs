use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/user", user_routes())
        .nest("/picture", picture_routes())
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::user::register))
        .route("/login", post(handlers::user::login))
        .route("/session", get(handlers::user::current_user))
        .route("/logout", post(handlers::user::logout))
        .route("/self/edit", post(handlers::user::self_edit))
        .route("/search", get(handlers::user::search))
        .route("/add", post(handlers::user::add_user))
        .route("/delete", post(handlers::user::delete_user))
        .route("/update", post(handlers::user::update_user))
        .route("/query", get(handlers::user::query_users))
        .route("/get", get(handlers::user::get_user))
}

fn picture_routes() -> Router<AppState> {
    let upload = Router::new()
        .route("/upload", post(handlers::picture::upload))
        .route("/upload/url", post(handlers::picture::upload_by_url))
        .layer(handlers::picture::upload_body_limit());

    Router::new()
        .route("/self-edit", post(handlers::picture::self_edit))
        .route("/search", get(handlers::picture::search))
        .route("/get", get(handlers::picture::get))
        .route("/tag_category", get(handlers::picture::tag_category))
        .route("/delete", post(handlers::picture::delete))
        .route("/update", post(handlers::picture::update))
        .route("/query", get(handlers::picture::query))
        .route("/get-full", get(handlers::picture::get_full))
        .route("/review", post(handlers::picture::review))
        .route("/batch-upload", post(handlers::picture::batch_upload))
        .merge(upload)
}
