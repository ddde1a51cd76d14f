use chrono::Utc;
use common::ReviewStatus;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{LikeExpr, SimpleExpr};
use sea_orm::*;

use super::{PageRequest, escape_like};
use crate::entity::picture;

/// Filters for picture listings. Every present field narrows the result.
#[derive(Debug, Default, Clone)]
pub struct PictureFilter {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub introduction: Option<String>,
    pub category: Option<String>,
    /// All of these tags must be on the picture.
    pub tags: Vec<String>,
    /// Substring match on name OR introduction.
    pub search_text: Option<String>,
    pub pic_size: Option<i64>,
    pub pic_width: Option<i32>,
    pub pic_height: Option<i32>,
    pub pic_scale: Option<f64>,
    pub pic_format: Option<String>,
    pub user_id: Option<i64>,
    pub review_status: Option<ReviewStatus>,
    pub review_message: Option<String>,
    pub reviewer_id: Option<i64>,
}

fn live() -> Select<picture::Entity> {
    picture::Entity::find().filter(picture::Column::IsDelete.eq(0))
}

fn contains(column: picture::Column, needle: &str) -> SimpleExpr {
    Expr::col(column).like(LikeExpr::new(format!("%{}%", escape_like(needle))).escape('\\'))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<picture::Model>, DbErr> {
    live().filter(picture::Column::Id.eq(id)).one(db).await
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    model: picture::ActiveModel,
) -> Result<picture::Model, DbErr> {
    model.insert(db).await
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    model: picture::ActiveModel,
) -> Result<picture::Model, DbErr> {
    model.update(db).await
}

/// Mark a live picture deleted. Returns `false` when no live row matched.
pub async fn soft_delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
    let result = picture::Entity::update_many()
        .col_expr(picture::Column::IsDelete, Expr::value(1))
        .col_expr(picture::Column::UpdateTime, Expr::value(Utc::now()))
        .filter(picture::Column::Id.eq(id))
        .filter(picture::Column::IsDelete.eq(0))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

fn apply_filter(mut select: Select<picture::Entity>, filter: &PictureFilter) -> Select<picture::Entity> {
    use picture::Column;

    if let Some(id) = filter.id {
        select = select.filter(Column::Id.eq(id));
    }
    if let Some(name) = non_empty(&filter.name) {
        select = select.filter(contains(Column::Name, name));
    }
    if let Some(intro) = non_empty(&filter.introduction) {
        select = select.filter(contains(Column::Introduction, intro));
    }
    if let Some(category) = non_empty(&filter.category) {
        select = select.filter(Column::Category.eq(category));
    }
    if let Some(text) = non_empty(&filter.search_text) {
        select = select.filter(
            Condition::any()
                .add(contains(Column::Name, text))
                .add(contains(Column::Introduction, text)),
        );
    }
    // Tags are stored as a JSON array, so `"tag"` (quoted) only matches a
    // whole element.
    for tag in &filter.tags {
        let quoted = serde_json::Value::String(tag.clone()).to_string();
        select = select.filter(contains(Column::Tags, &quoted));
    }
    if let Some(size) = filter.pic_size {
        select = select.filter(Column::PicSize.eq(size));
    }
    if let Some(width) = filter.pic_width {
        select = select.filter(Column::PicWidth.eq(width));
    }
    if let Some(height) = filter.pic_height {
        select = select.filter(Column::PicHeight.eq(height));
    }
    if let Some(scale) = filter.pic_scale {
        select = select.filter(Column::PicScale.eq(scale));
    }
    if let Some(format) = non_empty(&filter.pic_format) {
        select = select.filter(contains(Column::PicFormat, format));
    }
    if let Some(user_id) = filter.user_id {
        select = select.filter(Column::UserId.eq(user_id));
    }
    if let Some(status) = filter.review_status {
        select = select.filter(Column::ReviewStatus.eq(status));
    }
    if let Some(message) = non_empty(&filter.review_message) {
        select = select.filter(contains(Column::ReviewMessage, message));
    }
    if let Some(reviewer) = filter.reviewer_id {
        select = select.filter(Column::ReviewerId.eq(reviewer));
    }
    select
}

/// Count, then fetch one page, newest first.
pub async fn query<C: ConnectionTrait>(
    db: &C,
    filter: &PictureFilter,
    page: PageRequest,
) -> Result<(u64, Vec<picture::Model>), DbErr> {
    let select = apply_filter(live(), filter);

    let total = select.clone().count(db).await?;
    let rows = select
        .order_by_desc(picture::Column::Id)
        .offset(page.offset())
        .limit(page.size)
        .all(db)
        .await?;

    Ok((total, rows))
}
