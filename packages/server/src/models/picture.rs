use chrono::{DateTime, Utc};
use common::ReviewStatus;
use serde::{Deserialize, Serialize};

use super::user::{UserFull, UserVo};
use crate::dal::picture::PictureFilter;
use crate::entity::picture;
use crate::error::AppError;

const MAX_NAME_LEN: usize = 128;
const MAX_INTRODUCTION_LEN: usize = 800;
const MAX_TAGS: usize = 20;

fn validate_descriptive(
    name: Option<&str>,
    introduction: Option<&str>,
    tags: Option<&[String]>,
) -> Result<(), AppError> {
    if let Some(name) = name {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::Param(format!(
                "name must be 1-{MAX_NAME_LEN} characters"
            )));
        }
    }
    if introduction.is_some_and(|i| i.chars().count() > MAX_INTRODUCTION_LEN) {
        return Err(AppError::Param(format!(
            "introduction must be at most {MAX_INTRODUCTION_LEN} characters"
        )));
    }
    if let Some(tags) = tags {
        if tags.len() > MAX_TAGS {
            return Err(AppError::Param(format!("at most {MAX_TAGS} tags")));
        }
        if tags.iter().any(|t| t.trim().is_empty()) {
            return Err(AppError::Param("tags must not be blank".into()));
        }
    }
    Ok(())
}

/// JSON body for a URL upload. Multipart uploads carry `id` and `name` as
/// form fields next to `file`.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadPictureRequest {
    /// Existing picture to re-upload; absent to create a new one.
    pub id: Option<i64>,
    /// Overrides the name derived from the file.
    pub name: Option<String>,
    #[schema(example = "https://example.com/cat.png")]
    pub file_url: Option<String>,
}

pub fn validate_upload_request(payload: &UploadPictureRequest) -> Result<(), AppError> {
    if payload.id.is_some_and(|id| id <= 0) {
        return Err(AppError::Param("picture id must be positive".into()));
    }
    validate_descriptive(payload.name.as_deref(), None, None)
}

/// Descriptive fields of a picture. Used both for the owner's edit and the
/// admin update; at least one field besides `id` is required.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PictureEditRequest {
    pub id: i64,
    pub name: Option<String>,
    pub introduction: Option<String>,
    pub category: Option<String>,
    /// Replaces the whole tag list, order preserved.
    #[schema(example = json!(["cat", "cute"]))]
    pub tags: Option<Vec<String>>,
}

pub fn validate_picture_edit_request(payload: &PictureEditRequest) -> Result<(), AppError> {
    if payload.id <= 0 {
        return Err(AppError::Param("picture id is required".into()));
    }
    if payload.name.is_none()
        && payload.introduction.is_none()
        && payload.category.is_none()
        && payload.tags.is_none()
    {
        return Err(AppError::Param("nothing to update".into()));
    }
    validate_descriptive(
        payload.name.as_deref(),
        payload.introduction.as_deref(),
        payload.tags.as_deref(),
    )
}

/// Picture listing filters. The public search ignores the review fields and
/// only ever returns approved pictures.
#[derive(Deserialize, Default, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PictureQueryParams {
    /// Page number (1-based, values below 1 mean 1).
    pub page: Option<i64>,
    /// Page size (defaults to 20, capped at 30).
    pub size: Option<i64>,
    pub id: Option<i64>,
    /// Substring of the name.
    pub name: Option<String>,
    /// Substring of the introduction.
    pub introduction: Option<String>,
    pub category: Option<String>,
    /// Comma-separated; a picture must carry every listed tag.
    #[param(example = "cat,cute")]
    pub tags: Option<String>,
    /// Substring of the name or the introduction.
    pub search_text: Option<String>,
    pub pic_size: Option<i64>,
    pub pic_width: Option<i32>,
    pub pic_height: Option<i32>,
    pub pic_scale: Option<f64>,
    pub pic_format: Option<String>,
    pub user_id: Option<i64>,
    /// 0 pending, 1 approved, 2 rejected.
    pub review_status: Option<i32>,
    pub review_message: Option<String>,
    pub reviewer_id: Option<i64>,
}

impl PictureQueryParams {
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Filter with every field honoured.
    pub fn full_filter(&self) -> Result<PictureFilter, AppError> {
        let review_status = self
            .review_status
            .map(ReviewStatus::try_from)
            .transpose()
            .map_err(|e| AppError::Param(e.to_string()))?;
        Ok(PictureFilter {
            review_status,
            review_message: self.review_message.clone(),
            reviewer_id: self.reviewer_id,
            ..self.public_filter()
        })
    }

    /// Filter restricted to approved pictures; review fields are ignored.
    pub fn public_filter(&self) -> PictureFilter {
        PictureFilter {
            id: self.id,
            name: self.name.clone(),
            introduction: self.introduction.clone(),
            category: self.category.clone(),
            tags: self.tag_list(),
            search_text: self.search_text.clone(),
            pic_size: self.pic_size,
            pic_width: self.pic_width,
            pic_height: self.pic_height,
            pic_scale: self.pic_scale,
            pic_format: self.pic_format.clone(),
            user_id: self.user_id,
            review_status: Some(ReviewStatus::Approved),
            review_message: None,
            reviewer_id: None,
        }
    }
}

/// Admin decision on a picture.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub id: i64,
    /// 1 approved, 2 rejected.
    #[schema(example = 1)]
    pub review_status: i32,
    #[schema(example = "looks good")]
    pub review_message: String,
}

pub fn validate_review_request(payload: &ReviewRequest) -> Result<ReviewStatus, AppError> {
    if payload.id <= 0 {
        return Err(AppError::Param("picture id is required".into()));
    }
    if payload.review_message.trim().is_empty() {
        return Err(AppError::Param("review message is required".into()));
    }
    ReviewStatus::try_from(payload.review_status).map_err(|e| AppError::Param(e.to_string()))
}

/// Admin request to crawl a search engine and ingest the results.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadRequest {
    #[schema(example = "cat")]
    pub search_text: String,
    /// How many pictures to try (defaults to 10, at most 30).
    pub count: Option<i64>,
    /// Names become `{namePrefix}{n}`; defaults to the search text.
    pub name_prefix: Option<String>,
}

/// Picture view for any caller. Review details are not exposed.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PictureVo {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub introduction: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub pic_size: i64,
    pub pic_width: i32,
    pub pic_height: i32,
    pub pic_scale: f64,
    pub pic_format: String,
    pub user_id: i64,
    pub edit_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
    /// Absent when the owner is no longer available.
    pub user: Option<UserVo>,
}

impl PictureVo {
    pub fn new(m: picture::Model, user: Option<UserVo>) -> Result<Self, AppError> {
        let tags = m
            .tag_list()
            .map_err(|e| AppError::System(format!("corrupt tags on picture {}: {e}", m.id)))?;
        Ok(Self {
            id: m.id,
            url: m.url,
            name: m.name,
            introduction: m.introduction,
            category: m.category,
            tags,
            pic_size: m.pic_size,
            pic_width: m.pic_width,
            pic_height: m.pic_height,
            pic_scale: m.pic_scale,
            pic_format: m.pic_format,
            user_id: m.user_id,
            edit_time: m.edit_time,
            create_time: m.create_time,
            user,
        })
    }
}

/// Picture view for admins, including review state and the full owner.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PictureFull {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub introduction: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub pic_size: i64,
    pub pic_width: i32,
    pub pic_height: i32,
    pub pic_scale: f64,
    pub pic_format: String,
    pub user_id: i64,
    pub edit_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    /// 0 pending, 1 approved, 2 rejected.
    #[schema(value_type = i32)]
    pub review_status: ReviewStatus,
    pub review_message: Option<String>,
    pub reviewer_id: Option<i64>,
    pub review_time: Option<DateTime<Utc>>,
    pub user: Option<UserFull>,
}

impl PictureFull {
    pub fn new(m: picture::Model, user: Option<UserFull>) -> Result<Self, AppError> {
        let tags = m
            .tag_list()
            .map_err(|e| AppError::System(format!("corrupt tags on picture {}: {e}", m.id)))?;
        Ok(Self {
            id: m.id,
            url: m.url,
            name: m.name,
            introduction: m.introduction,
            category: m.category,
            tags,
            pic_size: m.pic_size,
            pic_width: m.pic_width,
            pic_height: m.pic_height,
            pic_scale: m.pic_scale,
            pic_format: m.pic_format,
            user_id: m.user_id,
            edit_time: m.edit_time,
            create_time: m.create_time,
            update_time: m.update_time,
            review_status: m.review_status,
            review_message: m.review_message,
            reviewer_id: m.reviewer_id,
            review_time: m.review_time,
            user,
        })
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PictureResponse {
    pub picture: PictureVo,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PictureFullResponse {
    pub picture: PictureFull,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PicturePage {
    /// Matching rows across all pages.
    pub total: u64,
    pub pictures: Vec<PictureVo>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PictureFullPage {
    pub total: u64,
    pub pictures: Vec<PictureFull>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadResponse {
    /// Pictures actually ingested; failed candidates are skipped.
    pub upload_count: u32,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TagCategoryResponse {
    pub tag_list: Vec<String>,
    pub category_list: Vec<String>,
}
