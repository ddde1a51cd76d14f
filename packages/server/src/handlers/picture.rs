use axum::{
    Json,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::LoginUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::picture::*;
use crate::models::shared::{ApiResponse, Empty, IdQuery, IdRequest, IdResponse, ok};
use crate::state::AppState;
use crate::upload::file::{FileSource, UploadedFile};

/// Multipart form fields of a file upload.
async fn read_upload_form(
    mut multipart: Multipart,
) -> Result<(UploadPictureRequest, Option<UploadedFile>), AppError> {
    let bad = |e: axum::extract::multipart::MultipartError| AppError::Param(e.body_text());

    let mut req = UploadPictureRequest {
        id: None,
        name: None,
        file_url: None,
    };
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad)?;
                file = Some(UploadedFile { file_name, bytes });
            }
            "id" => {
                let raw = field.text().await.map_err(bad)?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    req.id = Some(
                        raw.parse()
                            .map_err(|_| AppError::Param("id must be an integer".into()))?,
                    );
                }
            }
            "name" => req.name = Some(field.text().await.map_err(bad)?),
            _ => {}
        }
    }
    Ok((req, file))
}

#[utoipa::path(
    post,
    path = "/api/picture/upload",
    tag = "Picture",
    operation_id = "uploadPicture",
    summary = "Upload or re-upload a picture",
    description = "Accepts either `multipart/form-data` with a `file` part (plus optional `id` and `name` fields) or a JSON body with `fileUrl`. Passing `id` replaces the asset of an existing picture, which requires owning it or being an admin. Uploads by non-admins wait for review.",
    request_body(
        content(
            (UploadPictureRequest = "application/json"),
            (UploadPictureRequest = "multipart/form-data"),
        ),
    ),
    responses(
        (status = 200, description = "Picture stored", body = IdResponse),
        (status = 400, description = "Invalid file or URL (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not the owner (40101)", body = ErrorBody),
        (status = 404, description = "No such picture (40400)", body = ErrorBody),
        (status = 500, description = "Storage or download failed (50001)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, request))]
pub async fn upload(
    login_user: LoginUser,
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ApiResponse<IdResponse>>, AppError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let identity = login_user.identity();
    let id = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::Param(e.body_text()))?;
        let (req, file) = read_upload_form(multipart).await?;
        let mut source = FileSource::new(file, state.config.upload.max_file_size);
        state.pictures.upload(&identity, req, &mut source).await?
    } else {
        let AppJson(req) = AppJson::<UploadPictureRequest>::from_request(request, &state).await?;
        let mut source = state
            .pictures
            .url_source(req.file_url.clone().unwrap_or_default());
        state.pictures.upload(&identity, req, &mut source).await?
    };
    Ok(ok(IdResponse { id }))
}

#[utoipa::path(
    post,
    path = "/api/picture/upload/url",
    tag = "Picture",
    operation_id = "uploadPictureByUrl",
    summary = "Upload a picture from a URL",
    request_body = UploadPictureRequest,
    responses(
        (status = 200, description = "Picture stored", body = IdResponse),
        (status = 400, description = "Invalid URL or remote file (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not the owner (40101)", body = ErrorBody),
        (status = 500, description = "Remote file unreachable (50001)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload))]
pub async fn upload_by_url(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadPictureRequest>,
) -> Result<Json<ApiResponse<IdResponse>>, AppError> {
    let mut source = state
        .pictures
        .url_source(payload.file_url.clone().unwrap_or_default());
    let id = state
        .pictures
        .upload(&login_user.identity(), payload, &mut source)
        .await?;
    Ok(ok(IdResponse { id }))
}

#[utoipa::path(
    post,
    path = "/api/picture/self-edit",
    tag = "Picture",
    operation_id = "editOwnPicture",
    summary = "Edit descriptive fields of one's own picture",
    description = "The picture returns to pending review unless the caller is an admin.",
    request_body = PictureEditRequest,
    responses(
        (status = 200, description = "Updated", body = Empty),
        (status = 400, description = "Nothing to update (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not the owner (40101)", body = ErrorBody),
        (status = 404, description = "No such picture (40400)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload), fields(id = payload.id))]
pub async fn self_edit(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PictureEditRequest>,
) -> Result<Json<ApiResponse<Empty>>, AppError> {
    state
        .pictures
        .self_edit(&login_user.identity(), payload)
        .await?;
    Ok(ok(Empty {}))
}

#[utoipa::path(
    get,
    path = "/api/picture/search",
    tag = "Picture",
    operation_id = "searchPictures",
    summary = "Search approved pictures",
    description = "Review filters are ignored; only approved pictures are returned.",
    params(PictureQueryParams),
    responses(
        (status = 200, description = "One page of pictures", body = PicturePage),
        (status = 400, description = "Invalid filters (40000)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, params))]
pub async fn search(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PictureQueryParams>,
) -> Result<Json<ApiResponse<PicturePage>>, AppError> {
    Ok(ok(state.pictures.search(params).await?))
}

#[utoipa::path(
    get,
    path = "/api/picture/get",
    tag = "Picture",
    operation_id = "getPicture",
    summary = "Get one picture",
    params(IdQuery),
    responses(
        (status = 200, description = "Picture", body = PictureResponse),
        (status = 404, description = "No such picture or owner (40400)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query), fields(id = query.id))]
pub async fn get(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<IdQuery>,
) -> Result<Json<ApiResponse<PictureResponse>>, AppError> {
    let picture = state.pictures.get_vo(query.id).await?;
    Ok(ok(PictureResponse { picture }))
}

#[utoipa::path(
    get,
    path = "/api/picture/tag_category",
    tag = "Picture",
    operation_id = "tagCategories",
    summary = "Suggested tags and categories",
    responses(
        (status = 200, description = "Suggestions", body = TagCategoryResponse),
    ),
)]
pub async fn tag_category(State(state): State<AppState>) -> Json<ApiResponse<TagCategoryResponse>> {
    ok(state.pictures.tag_categories())
}

#[utoipa::path(
    post,
    path = "/api/picture/delete",
    tag = "Picture Admin",
    operation_id = "deletePicture",
    summary = "Soft-delete a picture",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Deleted", body = Empty),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
        (status = 404, description = "No such picture (40400)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload), fields(id = payload.id))]
pub async fn delete(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<IdRequest>,
) -> Result<Json<ApiResponse<Empty>>, AppError> {
    state
        .pictures
        .delete(&login_user.identity(), payload.id)
        .await?;
    Ok(ok(Empty {}))
}

#[utoipa::path(
    post,
    path = "/api/picture/update",
    tag = "Picture Admin",
    operation_id = "updatePicture",
    summary = "Edit descriptive fields of any picture",
    request_body = PictureEditRequest,
    responses(
        (status = 200, description = "Updated and approved", body = Empty),
        (status = 400, description = "Nothing to update (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
        (status = 404, description = "No such picture (40400)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload), fields(id = payload.id))]
pub async fn update(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PictureEditRequest>,
) -> Result<Json<ApiResponse<Empty>>, AppError> {
    state
        .pictures
        .admin_update(&login_user.identity(), payload)
        .await?;
    Ok(ok(Empty {}))
}

#[utoipa::path(
    get,
    path = "/api/picture/query",
    tag = "Picture Admin",
    operation_id = "queryPictures",
    summary = "List pictures with review details",
    params(PictureQueryParams),
    responses(
        (status = 200, description = "One page of pictures", body = PictureFullPage),
        (status = 400, description = "Invalid filters (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, params))]
pub async fn query(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PictureQueryParams>,
) -> Result<Json<ApiResponse<PictureFullPage>>, AppError> {
    Ok(ok(state
        .pictures
        .query(&login_user.identity(), params)
        .await?))
}

#[utoipa::path(
    get,
    path = "/api/picture/get-full",
    tag = "Picture Admin",
    operation_id = "getPictureFull",
    summary = "Get one picture with review details",
    params(IdQuery),
    responses(
        (status = 200, description = "Picture", body = PictureFullResponse),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
        (status = 404, description = "No such picture or owner (40400)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, query), fields(id = query.id))]
pub async fn get_full(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<IdQuery>,
) -> Result<Json<ApiResponse<PictureFullResponse>>, AppError> {
    let picture = state
        .pictures
        .get_full(&login_user.identity(), query.id)
        .await?;
    Ok(ok(PictureFullResponse { picture }))
}

#[utoipa::path(
    post,
    path = "/api/picture/review",
    tag = "Picture Admin",
    operation_id = "reviewPicture",
    summary = "Approve or reject a picture",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Reviewed", body = Empty),
        (status = 400, description = "Invalid status or missing message (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
        (status = 404, description = "No such picture (40400)", body = ErrorBody),
        (status = 500, description = "Already in that status (50001)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload), fields(id = payload.id))]
pub async fn review(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ReviewRequest>,
) -> Result<Json<ApiResponse<Empty>>, AppError> {
    state
        .pictures
        .review(&login_user.identity(), payload)
        .await?;
    Ok(ok(Empty {}))
}

#[utoipa::path(
    post,
    path = "/api/picture/batch-upload",
    tag = "Picture Admin",
    operation_id = "batchUploadPictures",
    summary = "Ingest pictures found by an image search",
    request_body = BatchUploadRequest,
    responses(
        (status = 200, description = "Number of pictures stored", body = BatchUploadResponse),
        (status = 400, description = "Invalid search text or count (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
        (status = 500, description = "Search page unavailable (50001)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload))]
pub async fn batch_upload(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BatchUploadRequest>,
) -> Result<Json<ApiResponse<BatchUploadResponse>>, AppError> {
    let upload_count = state
        .pictures
        .batch_upload(&login_user.identity(), payload)
        .await?;
    Ok(ok(BatchUploadResponse { upload_count }))
}

/// Body limit for upload routes; the file itself is capped separately.
pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(4 * 1024 * 1024)
}
