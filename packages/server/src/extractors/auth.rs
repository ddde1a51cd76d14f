use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use crate::error::AppError;
use crate::services::policy::Identity;
use crate::state::AppState;
use crate::utils::session::SessionUser;

/// Logged-in caller, read from the session cookie.
///
/// Add this as a handler parameter to require a session. The user snapshot
/// is whatever was stored at login; role or profile changes made since then
/// are not visible until the next login.
pub struct LoginUser {
    pub user: SessionUser,
}

impl LoginUser {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user.id,
            role: self.user.role,
        }
    }
}

impl FromRequestParts<AppState> for LoginUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(state.sessions.cookie_name())
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::NotLogin)?;

        let claims = state.sessions.verify(&token)?;
        Ok(LoginUser { user: claims.user })
    }
}
