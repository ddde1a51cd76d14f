use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::SUCCESS_CODE;

/// Success envelope: `{"code":0,"message":"ok", ...payload}`.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: &'static str,
    #[serde(flatten)]
    pub data: T,
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: SUCCESS_CODE,
        message: "ok",
        data,
    })
}

/// Payload for operations that return nothing beyond success.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Empty {}

/// Request body naming a single row.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct IdRequest {
    #[schema(example = 1843224925818880_i64)]
    pub id: i64,
}

/// Query string naming a single row.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    /// Row ID.
    pub id: i64,
}

/// Payload carrying the ID of a created row.
#[derive(Serialize, utoipa::ToSchema)]
pub struct IdResponse {
    #[schema(example = 1843224925818880_i64)]
    pub id: i64,
}

/// Trim an optional text field, treating blank as absent.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
