use chrono::{DateTime, Utc};
use common::UserRole;
use serde::{Deserialize, Serialize};

use crate::dal::user::UserFilter;
use crate::entity::user;
use crate::error::AppError;

const MAX_PASSWORD_LEN: usize = 128;
const MAX_AVATAR_LEN: usize = 1024;
const MAX_PROFILE_LEN: usize = 512;

fn validate_account(account: &str) -> Result<(), AppError> {
    let account = account.trim();
    if account.is_empty() || account.chars().count() > 32 {
        return Err(AppError::Param("account must be 1-32 characters".into()));
    }
    if !account
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Param(
            "account must contain only letters, digits, and underscores".into(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() || password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::Param(format!(
            "password must be 1-{MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_profile_fields(avatar: Option<&str>, profile: Option<&str>) -> Result<(), AppError> {
    if avatar.is_some_and(|a| a.len() > MAX_AVATAR_LEN) {
        return Err(AppError::Param("avatar url is too long".into()));
    }
    if profile.is_some_and(|p| p.chars().count() > MAX_PROFILE_LEN) {
        return Err(AppError::Param(format!(
            "profile must be at most {MAX_PROFILE_LEN} characters"
        )));
    }
    Ok(())
}

/// Request body for account registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique account name (1-32 chars, letters, digits and underscores).
    #[schema(example = "alice")]
    pub account: String,
    #[schema(example = "pw1")]
    pub password: String,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_account(&payload.account)?;
    validate_password(&payload.password)
}

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub account: String,
    #[schema(example = "pw1")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.account.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::Param("account and password are required".into()));
    }
    Ok(())
}

/// Changes a user makes to their own account. At least one field is required.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UserEditRequest {
    pub password: Option<String>,
    pub avatar: Option<String>,
    pub profile: Option<String>,
}

pub fn validate_user_edit_request(payload: &UserEditRequest) -> Result<(), AppError> {
    if payload.password.is_none() && payload.avatar.is_none() && payload.profile.is_none() {
        return Err(AppError::Param("nothing to update".into()));
    }
    if let Some(password) = &payload.password {
        validate_password(password)?;
    }
    validate_profile_fields(payload.avatar.as_deref(), payload.profile.as_deref())
}

/// Public user search.
#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserSearchQuery {
    /// Page number (1-based, values below 1 mean 1).
    pub page: Option<i64>,
    /// Page size (defaults to 20, capped at 30).
    pub size: Option<i64>,
    pub id: Option<i64>,
    /// Exact account name.
    pub account: Option<String>,
    /// Substring of the profile text.
    pub profile: Option<String>,
}

impl UserSearchQuery {
    pub fn filter(&self) -> UserFilter {
        UserFilter {
            id: self.id,
            account: self.account.clone(),
            profile: self.profile.clone(),
            role: None,
        }
    }
}

/// Admin user listing; same as the public search plus a role filter.
#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub id: Option<i64>,
    pub account: Option<String>,
    pub profile: Option<String>,
    pub role: Option<UserRole>,
}

impl UserQuery {
    pub fn filter(&self) -> UserFilter {
        UserFilter {
            id: self.id,
            account: self.account.clone(),
            profile: self.profile.clone(),
            role: self.role,
        }
    }
}

/// Admin request creating an account with the default password.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddUserRequest {
    #[schema(example = "bob")]
    pub account: String,
    pub avatar: Option<String>,
    pub profile: Option<String>,
    /// Defaults to `user`.
    pub role: Option<UserRole>,
}

pub fn validate_add_user_request(payload: &AddUserRequest) -> Result<(), AppError> {
    validate_account(&payload.account)?;
    validate_profile_fields(payload.avatar.as_deref(), payload.profile.as_deref())
}

/// Admin request replacing fields of any account.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    pub id: i64,
    pub password: Option<String>,
    pub avatar: Option<String>,
    pub profile: Option<String>,
    pub role: Option<UserRole>,
}

pub fn validate_update_user_request(payload: &UpdateUserRequest) -> Result<(), AppError> {
    if payload.id <= 0 {
        return Err(AppError::Param("user id is required".into()));
    }
    if payload.password.is_none()
        && payload.avatar.is_none()
        && payload.profile.is_none()
        && payload.role.is_none()
    {
        return Err(AppError::Param("nothing to update".into()));
    }
    if let Some(password) = &payload.password {
        validate_password(password)?;
    }
    validate_profile_fields(payload.avatar.as_deref(), payload.profile.as_deref())
}

/// Redacted user view, safe to show to anyone.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserVo {
    pub id: i64,
    pub account: String,
    pub avatar: Option<String>,
    pub profile: Option<String>,
    pub edit_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
}

impl From<user::Model> for UserVo {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            account: m.account,
            avatar: m.avatar,
            profile: m.profile,
            edit_time: m.edit_time,
            create_time: m.create_time,
        }
    }
}

/// Full user view for admins. Still never carries the password digest.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserFull {
    pub id: i64,
    pub account: String,
    pub avatar: Option<String>,
    pub profile: Option<String>,
    pub role: UserRole,
    pub edit_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub is_delete: bool,
}

impl From<user::Model> for UserFull {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            account: m.account,
            avatar: m.avatar,
            profile: m.profile,
            role: m.role,
            edit_time: m.edit_time,
            create_time: m.create_time,
            update_time: m.update_time,
            is_delete: m.is_delete != 0,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub user: UserVo,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserFullResponse {
    pub user: UserFull,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserPage {
    /// Matching rows across all pages.
    pub total: u64,
    pub users: Vec<UserVo>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserFullPage {
    pub total: u64,
    pub users: Vec<UserFull>,
}
