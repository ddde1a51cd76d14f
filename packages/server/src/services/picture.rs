use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::ReviewStatus;
use common::review_status::ReviewTransitionError;
use sea_orm::{ActiveValue::Set, DatabaseConnection, IntoActiveModel};
use tracing::{info, instrument, warn};

use super::policy::{self, Action, Identity, Resource};
use crate::config::PaginationConfig;
use crate::dal::{self, PageRequest};
use crate::entity::{picture, user};
use crate::error::AppError;
use crate::models::picture::*;
use crate::models::shared::trimmed;
use crate::models::user::{UserFull, UserVo};
use crate::upload::crawler::Crawler;
use crate::upload::source::PictureSource;
use crate::upload::url::{UrlFetcher, UrlSource};
use crate::upload::{UploadPipeline, UploadedPicture};
use crate::utils::id::IdGenerator;

pub const AUTO_APPROVE_MESSAGE: &str = "auto-approved by admin";

const TAGS: &[&str] = &[
    "popular",
    "funny",
    "life",
    "hd",
    "art",
    "campus",
    "background",
    "resume",
    "creative",
];
const CATEGORIES: &[&str] = &["template", "e-commerce", "meme", "material", "poster"];

/// Set the review fields for a write made by `identity`: admins approve
/// their own writes, anyone else sends the picture back to the queue.
fn apply_review_policy(active: &mut picture::ActiveModel, identity: &Identity, now: DateTime<Utc>) {
    if identity.is_admin() {
        active.review_status = Set(ReviewStatus::Approved);
        active.review_message = Set(Some(AUTO_APPROVE_MESSAGE.to_string()));
        active.reviewer_id = Set(Some(identity.user_id));
        active.review_time = Set(Some(now));
    } else {
        active.review_status = Set(ReviewStatus::Pending);
        active.review_message = Set(None);
        active.reviewer_id = Set(None);
        active.review_time = Set(None);
    }
}

fn apply_asset(active: &mut picture::ActiveModel, asset: UploadedPicture, name: Option<String>) {
    active.url = Set(asset.url);
    active.name = Set(name.unwrap_or(asset.name));
    active.pic_size = Set(asset.size);
    active.pic_width = Set(asset.width);
    active.pic_height = Set(asset.height);
    active.pic_scale = Set(asset.scale);
    active.pic_format = Set(asset.format);
}

fn apply_edit(active: &mut picture::ActiveModel, req: PictureEditRequest) -> Result<(), AppError> {
    if let Some(name) = req.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(introduction) = req.introduction {
        active.introduction = Set(Some(introduction));
    }
    if let Some(category) = req.category {
        active.category = Set(trimmed(Some(category)));
    }
    if let Some(tags) = req.tags {
        let tags: Vec<String> = tags.into_iter().map(|t| t.trim().to_string()).collect();
        let encoded = picture::encode_tags(&tags)
            .map_err(|e| AppError::System(format!("Failed to encode tags: {e}")))?;
        active.tags = Set(Some(encoded));
    }
    Ok(())
}

fn not_found() -> AppError {
    AppError::NotFound("picture not found".into())
}

/// Picture ingestion, moderation and listings.
#[derive(Clone)]
pub struct PictureService {
    db: DatabaseConnection,
    ids: Arc<IdGenerator>,
    pipeline: UploadPipeline,
    fetcher: UrlFetcher,
    crawler: Arc<Crawler>,
    pagination: PaginationConfig,
}

impl PictureService {
    pub fn new(
        db: DatabaseConnection,
        ids: Arc<IdGenerator>,
        pipeline: UploadPipeline,
        fetcher: UrlFetcher,
        crawler: Arc<Crawler>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            db,
            ids,
            pipeline,
            fetcher,
            crawler,
            pagination,
        }
    }

    /// Source that pulls a picture from `url`.
    pub fn url_source(&self, url: impl Into<String>) -> UrlSource {
        self.fetcher.source(url)
    }

    async fn find(&self, id: i64) -> Result<picture::Model, AppError> {
        dal::picture::find_by_id(&self.db, id)
            .await?
            .ok_or_else(not_found)
    }

    /// Store a new picture, or replace the asset of an existing one.
    ///
    /// A re-upload keeps the original owner even when an admin performs it.
    #[instrument(skip(self, req, source), fields(user_id = identity.user_id))]
    pub async fn upload(
        &self,
        identity: &Identity,
        req: UploadPictureRequest,
        source: &mut dyn PictureSource,
    ) -> Result<i64, AppError> {
        validate_upload_request(&req)?;

        let existing = match req.id {
            Some(id) => {
                let current = self.find(id).await?;
                policy::ensure(
                    identity,
                    Resource::Picture {
                        owner_id: current.user_id,
                    },
                    Action::Reupload,
                )?;
                Some(current)
            }
            None => {
                policy::ensure(identity, Resource::Pictures, Action::Upload)?;
                None
            }
        };
        let (id, owner_id) = match &existing {
            Some(current) => (current.id, current.user_id),
            None => (self.ids.next_id()?, identity.user_id),
        };

        let asset = self
            .pipeline
            .ingest(source, &format!("public/{owner_id}"), id)
            .await?;
        let name = trimmed(req.name);
        let now = Utc::now();

        match existing {
            Some(current) => {
                let mut active = current.into_active_model();
                apply_asset(&mut active, asset, name);
                active.edit_time = Set(now);
                apply_review_policy(&mut active, identity, now);
                dal::picture::update(&self.db, active).await?;
            }
            None => {
                let mut active = picture::ActiveModel {
                    id: Set(id),
                    introduction: Set(None),
                    category: Set(None),
                    tags: Set(None),
                    user_id: Set(owner_id),
                    edit_time: Set(now),
                    is_delete: Set(0),
                    ..Default::default()
                };
                apply_asset(&mut active, asset, name);
                apply_review_policy(&mut active, identity, now);
                dal::picture::insert(&self.db, active).await?;
            }
        }

        info!(id, owner_id, "Picture uploaded");
        Ok(id)
    }

    /// Crawl a results page for `search_text` and ingest what it links to.
    ///
    /// Candidates that fail are logged and skipped; the count of stored
    /// pictures is returned.
    #[instrument(skip(self, req), fields(search_text = %req.search_text))]
    pub async fn batch_upload(
        &self,
        identity: &Identity,
        req: BatchUploadRequest,
    ) -> Result<u32, AppError> {
        policy::ensure(identity, Resource::Pictures, Action::BatchUpload)?;

        let search_text = req.search_text.trim().to_string();
        if search_text.is_empty() {
            return Err(AppError::Param("search text is required".into()));
        }
        let count = match req.count {
            None => self.crawler.default_count(),
            Some(n) if n >= 1 && n <= i64::from(self.crawler.max_count()) => n as u32,
            Some(_) => {
                return Err(AppError::Param(format!(
                    "count must be 1-{}",
                    self.crawler.max_count()
                )));
            }
        };
        let prefix = trimmed(req.name_prefix).unwrap_or_else(|| search_text.clone());

        let page_url = self.crawler.search_url(&search_text)?;
        let html = self.crawler.fetch_page(&page_url).await?;
        let candidates = self.crawler.discover(&html, &page_url, count as usize)?;
        if candidates.is_empty() {
            warn!("Search page yielded no images");
        }

        let mut uploaded = 0u32;
        for candidate in candidates {
            let req = UploadPictureRequest {
                id: None,
                name: Some(format!("{prefix}{}", uploaded + 1)),
                file_url: None,
            };
            let mut source = self.url_source(candidate.as_str());
            match self.upload(identity, req, &mut source).await {
                Ok(id) => {
                    uploaded += 1;
                    info!(id, url = %candidate, "Batch picture stored");
                }
                Err(e) => warn!(url = %candidate, "Skipping batch candidate: {e}"),
            }
        }
        Ok(uploaded)
    }

    /// Owner changes descriptive fields; the picture goes back to review
    /// unless the owner is an admin.
    #[instrument(skip(self, req), fields(id = req.id))]
    pub async fn self_edit(&self, identity: &Identity, req: PictureEditRequest) -> Result<(), AppError> {
        validate_picture_edit_request(&req)?;
        let current = self.find(req.id).await?;
        policy::ensure(
            identity,
            Resource::Picture {
                owner_id: current.user_id,
            },
            Action::SelfEdit,
        )?;
        self.save_edit(identity, current, req).await
    }

    #[instrument(skip(self, req), fields(id = req.id))]
    pub async fn admin_update(&self, identity: &Identity, req: PictureEditRequest) -> Result<(), AppError> {
        policy::ensure(identity, Resource::Pictures, Action::AdminEdit)?;
        validate_picture_edit_request(&req)?;
        let current = self.find(req.id).await?;
        self.save_edit(identity, current, req).await
    }

    async fn save_edit(
        &self,
        identity: &Identity,
        current: picture::Model,
        req: PictureEditRequest,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let mut active = current.into_active_model();
        apply_edit(&mut active, req)?;
        active.edit_time = Set(now);
        apply_review_policy(&mut active, identity, now);
        dal::picture::update(&self.db, active).await?;
        Ok(())
    }

    #[instrument(skip(self, req), fields(id = req.id, status = req.review_status))]
    pub async fn review(&self, identity: &Identity, req: ReviewRequest) -> Result<(), AppError> {
        policy::ensure(identity, Resource::Pictures, Action::Review)?;
        let target = validate_review_request(&req)?;
        let current = self.find(req.id).await?;

        let next = current
            .review_status
            .review_to(target)
            .map_err(|e| match e {
                ReviewTransitionError::Duplicate(_) => AppError::Operation("duplicate review".into()),
                ReviewTransitionError::InvalidTarget => AppError::Param(e.to_string()),
            })?;

        let mut active = current.into_active_model();
        active.review_status = Set(next);
        active.review_message = Set(Some(req.review_message.trim().to_string()));
        active.reviewer_id = Set(Some(identity.user_id));
        active.review_time = Set(Some(Utc::now()));
        dal::picture::update(&self.db, active).await?;

        info!(reviewer = identity.user_id, "Picture reviewed as {next}");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, identity: &Identity, id: i64) -> Result<(), AppError> {
        policy::ensure(identity, Resource::Pictures, Action::Delete)?;
        if !dal::picture::soft_delete(&self.db, id).await? {
            return Err(not_found());
        }
        info!(id, by = identity.user_id, "Picture deleted");
        Ok(())
    }

    async fn owners(&self, rows: &[picture::Model]) -> Result<HashMap<i64, user::Model>, AppError> {
        let mut ids: Vec<i64> = rows.iter().map(|p| p.user_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let users = dal::user::find_by_ids(&self.db, &ids).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    /// Admin listing with every filter and review details.
    pub async fn query(
        &self,
        identity: &Identity,
        params: PictureQueryParams,
    ) -> Result<PictureFullPage, AppError> {
        policy::ensure(identity, Resource::Pictures, Action::ViewFull)?;
        let filter = params.full_filter()?;
        let page = PageRequest::clamped(params.page, params.size, self.pagination);

        let (total, rows) = dal::picture::query(&self.db, &filter, page).await?;
        let mut owners = self.owners(&rows).await?;
        let pictures = rows
            .into_iter()
            .map(|p| {
                let owner = owners.remove(&p.user_id).map(UserFull::from);
                PictureFull::new(p, owner)
            })
            .collect::<Result<_, _>>()?;
        Ok(PictureFullPage { total, pictures })
    }

    /// Public listing; only approved pictures are ever returned.
    pub async fn search(&self, params: PictureQueryParams) -> Result<PicturePage, AppError> {
        let filter = params.public_filter();
        let page = PageRequest::clamped(params.page, params.size, self.pagination);

        let (total, rows) = dal::picture::query(&self.db, &filter, page).await?;
        let owners = self.owners(&rows).await?;
        let pictures = rows
            .into_iter()
            .map(|p| {
                let owner = owners.get(&p.user_id).cloned().map(UserVo::from);
                PictureVo::new(p, owner)
            })
            .collect::<Result<_, _>>()?;
        Ok(PicturePage { total, pictures })
    }

    async fn owner_of(&self, picture: &picture::Model) -> Result<user::Model, AppError> {
        dal::user::find_by_id(&self.db, picture.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("picture owner not found".into()))
    }

    pub async fn get_vo(&self, id: i64) -> Result<PictureVo, AppError> {
        let picture = self.find(id).await?;
        let owner = self.owner_of(&picture).await?;
        PictureVo::new(picture, Some(owner.into()))
    }

    pub async fn get_full(&self, identity: &Identity, id: i64) -> Result<PictureFull, AppError> {
        policy::ensure(identity, Resource::Pictures, Action::ViewFull)?;
        let picture = self.find(id).await?;
        let owner = self.owner_of(&picture).await?;
        PictureFull::new(picture, Some(owner.into()))
    }

    pub fn tag_categories(&self) -> TagCategoryResponse {
        TagCategoryResponse {
            tag_list: TAGS.iter().map(|s| s.to_string()).collect(),
            category_list: CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
