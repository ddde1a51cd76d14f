use std::sync::Arc;

use chrono::Utc;
use common::UserRole;
use sea_orm::{ActiveValue::Set, DatabaseConnection, DbErr, IntoActiveModel, SqlErr};
use tracing::{info, instrument};

use super::policy::{self, Action, Identity, Resource};
use crate::config::PaginationConfig;
use crate::dal::{self, PageRequest};
use crate::entity::user;
use crate::error::AppError;
use crate::models::user::*;
use crate::utils::hash::PasswordCodec;
use crate::utils::id::IdGenerator;

/// Account lifecycle and lookups.
#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
    ids: Arc<IdGenerator>,
    codec: Arc<PasswordCodec>,
    pagination: PaginationConfig,
    default_password: String,
}

fn account_taken(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Param("account exists".into()),
        _ => err.into(),
    }
}

impl UserService {
    pub fn new(
        db: DatabaseConnection,
        ids: Arc<IdGenerator>,
        codec: Arc<PasswordCodec>,
        pagination: PaginationConfig,
        default_password: String,
    ) -> Self {
        Self {
            db,
            ids,
            codec,
            pagination,
            default_password,
        }
    }

    async fn create_account(
        &self,
        account: &str,
        password: &str,
        avatar: Option<String>,
        profile: Option<String>,
        role: UserRole,
    ) -> Result<i64, AppError> {
        let account = account.trim();
        if dal::user::find_by_account(&self.db, account).await?.is_some() {
            return Err(AppError::Param("account exists".into()));
        }

        let id = self.ids.next_id()?;
        let model = user::ActiveModel {
            id: Set(id),
            account: Set(account.to_string()),
            password: Set(self.codec.hash(password)?),
            avatar: Set(avatar),
            profile: Set(profile),
            role: Set(role),
            edit_time: Set(Utc::now()),
            is_delete: Set(0),
            ..Default::default()
        };
        // The unique index still catches a concurrent registration.
        dal::user::insert(&self.db, model)
            .await
            .map_err(account_taken)?;
        Ok(id)
    }

    #[instrument(skip(self, req), fields(account = %req.account))]
    pub async fn register(&self, req: RegisterRequest) -> Result<i64, AppError> {
        validate_register_request(&req)?;
        let id = self
            .create_account(&req.account, &req.password, None, None, UserRole::User)
            .await?;
        info!(id, "User registered");
        Ok(id)
    }

    /// Check credentials and return the row to put into the session.
    ///
    /// Unknown accounts and wrong passwords fail identically.
    #[instrument(skip(self, req), fields(account = %req.account))]
    pub async fn login(&self, req: LoginRequest) -> Result<user::Model, AppError> {
        validate_login_request(&req)?;
        let rejected = || AppError::Param("account or password incorrect".into());

        let user = dal::user::find_by_account(&self.db, req.account.trim())
            .await?
            .ok_or_else(rejected)?;
        if !self.codec.verify(&user.password, &req.password)? {
            return Err(rejected());
        }
        Ok(user)
    }

    /// Fresh copy of the caller's own row.
    pub async fn current(&self, identity: &Identity) -> Result<user::Model, AppError> {
        dal::user::find_by_id(&self.db, identity.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }

    #[instrument(skip(self, req), fields(user_id = identity.user_id))]
    pub async fn self_edit(
        &self,
        identity: &Identity,
        req: UserEditRequest,
    ) -> Result<UserVo, AppError> {
        validate_user_edit_request(&req)?;
        let existing = self.current(identity).await?;

        let mut active = existing.into_active_model();
        if let Some(password) = &req.password {
            active.password = Set(self.codec.hash(password)?);
        }
        if let Some(avatar) = req.avatar {
            active.avatar = Set(Some(avatar));
        }
        if let Some(profile) = req.profile {
            active.profile = Set(Some(profile));
        }
        active.edit_time = Set(Utc::now());

        let updated = dal::user::update(&self.db, active).await?;
        Ok(updated.into())
    }

    pub async fn search(&self, query: UserSearchQuery) -> Result<UserPage, AppError> {
        let page = PageRequest::clamped(query.page, query.size, self.pagination);
        let (total, rows) = dal::user::query(&self.db, &query.filter(), page).await?;
        Ok(UserPage {
            total,
            users: rows.into_iter().map(UserVo::from).collect(),
        })
    }

    #[instrument(skip(self, req), fields(account = %req.account))]
    pub async fn add_user(&self, identity: &Identity, req: AddUserRequest) -> Result<i64, AppError> {
        policy::ensure(identity, Resource::Users, Action::Manage)?;
        validate_add_user_request(&req)?;
        let id = self
            .create_account(
                &req.account,
                &self.default_password,
                req.avatar,
                req.profile,
                req.role.unwrap_or_default(),
            )
            .await?;
        info!(id, by = identity.user_id, "User added by admin");
        Ok(id)
    }

    #[instrument(skip(self, req), fields(id = req.id))]
    pub async fn update_user(
        &self,
        identity: &Identity,
        req: UpdateUserRequest,
    ) -> Result<UserFull, AppError> {
        policy::ensure(identity, Resource::Users, Action::Manage)?;
        validate_update_user_request(&req)?;
        let existing = dal::user::find_by_id(&self.db, req.id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;

        let mut active = existing.into_active_model();
        if let Some(password) = &req.password {
            active.password = Set(self.codec.hash(password)?);
        }
        if let Some(avatar) = req.avatar {
            active.avatar = Set(Some(avatar));
        }
        if let Some(profile) = req.profile {
            active.profile = Set(Some(profile));
        }
        if let Some(role) = req.role {
            active.role = Set(role);
        }
        active.edit_time = Set(Utc::now());

        let updated = dal::user::update(&self.db, active).await?;
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, identity: &Identity, id: i64) -> Result<(), AppError> {
        policy::ensure(identity, Resource::Users, Action::Manage)?;
        if !dal::user::soft_delete(&self.db, id).await? {
            return Err(AppError::NotFound("user not found".into()));
        }
        info!(id, by = identity.user_id, "User deleted");
        Ok(())
    }

    pub async fn query_users(
        &self,
        identity: &Identity,
        query: UserQuery,
    ) -> Result<UserFullPage, AppError> {
        policy::ensure(identity, Resource::Users, Action::Manage)?;
        let page = PageRequest::clamped(query.page, query.size, self.pagination);
        let (total, rows) = dal::user::query(&self.db, &query.filter(), page).await?;
        Ok(UserFullPage {
            total,
            users: rows.into_iter().map(UserFull::from).collect(),
        })
    }

    pub async fn get_user(&self, identity: &Identity, id: i64) -> Result<UserFull, AppError> {
        policy::ensure(identity, Resource::Users, Action::Manage)?;
        dal::user::find_by_id(&self.db, id)
            .await?
            .map(UserFull::from)
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }
}
