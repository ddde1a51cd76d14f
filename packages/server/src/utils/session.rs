use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use common::UserRole;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::entity::user;
use crate::error::AppError;

/// Snapshot of the user row carried inside a session. Never includes the
/// password digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub account: String,
    pub avatar: Option<String>,
    pub profile: Option<String>,
    pub role: UserRole,
    pub edit_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl From<&user::Model> for SessionUser {
    fn from(m: &user::Model) -> Self {
        Self {
            id: m.id,
            account: m.account.clone(),
            avatar: m.avatar.clone(),
            profile: m.profile.clone(),
            role: m.role,
            edit_time: m.edit_time,
            create_time: m.create_time,
            update_time: m.update_time,
        }
    }
}

/// JWT claims stored in the session cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // Account
    pub user: SessionUser,
    pub iat: usize,
    pub exp: usize,
}

/// Signs and verifies session tokens and builds the cookie that carries them.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    cookie_name: String,
}

impl SessionKeys {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.session_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.session_secret.as_bytes()),
            ttl: Duration::hours(config.session_ttl_hours),
            cookie_name: config.cookie_name.clone(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Sign a new session token for a user row.
    pub fn sign(&self, user: &user::Model) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::System("session expiry overflow".into()))?;

        let claims = SessionClaims {
            sub: user.account.clone(),
            user: SessionUser::from(user),
            iat: now.timestamp() as usize,
            exp: expiration.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::System(format!("Failed to sign session: {e}")))
    }

    /// Verify and decode a session token. Any failure means "not logged in".
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected session token: {e}");
                AppError::NotLogin
            })
    }

    pub fn cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), "")).path("/").build()
    }
}
