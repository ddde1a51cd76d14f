use argon2::password_hash::{
    Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    rand_core::OsRng,
};
use argon2::Argon2;

use crate::error::AppError;

/// Salts and hashes account passwords.
///
/// Every plaintext is suffixed with a fixed application-wide salt before it
/// reaches Argon2, which adds its own random per-hash salt on top.
#[derive(Clone)]
pub struct PasswordCodec {
    app_salt: String,
}

impl PasswordCodec {
    pub fn new(app_salt: impl Into<String>) -> Self {
        Self {
            app_salt: app_salt.into(),
        }
    }

    fn salted(&self, plaintext: &str) -> String {
        let mut salted = String::with_capacity(plaintext.len() + self.app_salt.len());
        salted.push_str(plaintext);
        salted.push_str(&self.app_salt);
        salted
    }

    /// Hash a plaintext password into a PHC-format digest.
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(self.salted(plaintext).as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::System(format!("Password hash error: {e}")))
    }

    /// Check `candidate` against a stored digest.
    ///
    /// A mismatch is `Ok(false)`; a digest that cannot be parsed is a system
    /// error.
    pub fn verify(&self, digest: &str, candidate: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| AppError::System(format!("Stored password hash is invalid: {e}")))?;
        match Argon2::default().verify_password(self.salted(candidate).as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(AppError::System(format!("Password verify error: {e}"))),
        }
    }
}
