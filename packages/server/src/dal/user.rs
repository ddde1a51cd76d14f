use chrono::Utc;
use common::UserRole;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::LikeExpr;
use sea_orm::*;

use super::{PageRequest, escape_like};
use crate::entity::user;

/// Filters for user listings. Every present field narrows the result.
#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub id: Option<i64>,
    pub account: Option<String>,
    /// Substring match on the profile text.
    pub profile: Option<String>,
    pub role: Option<UserRole>,
}

fn live() -> Select<user::Entity> {
    user::Entity::find().filter(user::Column::IsDelete.eq(0))
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<user::Model>, DbErr> {
    live().filter(user::Column::Id.eq(id)).one(db).await
}

pub async fn find_by_account<C: ConnectionTrait>(
    db: &C,
    account: &str,
) -> Result<Option<user::Model>, DbErr> {
    live().filter(user::Column::Account.eq(account)).one(db).await
}

/// Live users among `ids`; missing or deleted ids are simply absent.
pub async fn find_by_ids<C: ConnectionTrait>(db: &C, ids: &[i64]) -> Result<Vec<user::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    live()
        .filter(user::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await
}

pub async fn insert<C: ConnectionTrait>(db: &C, model: user::ActiveModel) -> Result<user::Model, DbErr> {
    model.insert(db).await
}

pub async fn update<C: ConnectionTrait>(db: &C, model: user::ActiveModel) -> Result<user::Model, DbErr> {
    model.update(db).await
}

/// Mark a live user deleted. Returns `false` when no live row matched.
pub async fn soft_delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
    let result = user::Entity::update_many()
        .col_expr(user::Column::IsDelete, Expr::value(1))
        .col_expr(user::Column::UpdateTime, Expr::value(Utc::now()))
        .filter(user::Column::Id.eq(id))
        .filter(user::Column::IsDelete.eq(0))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Count, then fetch one page. The two reads are not isolated from writes
/// that land in between.
pub async fn query<C: ConnectionTrait>(
    db: &C,
    filter: &UserFilter,
    page: PageRequest,
) -> Result<(u64, Vec<user::Model>), DbErr> {
    let mut select = live();

    if let Some(id) = filter.id {
        select = select.filter(user::Column::Id.eq(id));
    }
    if let Some(account) = filter.account.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(user::Column::Account.eq(account));
    }
    if let Some(profile) = filter.profile.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(
            Expr::col(user::Column::Profile)
                .like(LikeExpr::new(format!("%{}%", escape_like(profile))).escape('\\')),
        );
    }
    if let Some(role) = filter.role {
        select = select.filter(user::Column::Role.eq(role));
    }

    let total = select.clone().count(db).await?;
    let rows = select
        .order_by_desc(user::Column::Id)
        .offset(page.offset())
        .limit(page.size)
        .all(db)
        .await?;

    Ok((total, rows))
}
