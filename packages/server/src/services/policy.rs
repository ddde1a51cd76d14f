//! Who may do what.
//!
//! Every mutating service call asks [`ensure`] before touching a row, so the
//! rules live in one place instead of being re-derived per handler.

use common::UserRole;

use crate::error::AppError;

/// The acting caller as seen by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: UserRole,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A specific picture, identified by its owner.
    Picture { owner_id: i64 },
    /// The picture collection as a whole.
    Pictures,
    /// Accounts other than the caller's own.
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a new picture.
    Upload,
    /// Replace the asset of an existing picture.
    Reupload,
    /// Change descriptive fields of one's own picture.
    SelfEdit,
    /// Change descriptive fields of any picture.
    AdminEdit,
    Review,
    Delete,
    /// Read review state and full owner details.
    ViewFull,
    BatchUpload,
    Manage,
}

pub fn authorize(identity: &Identity, resource: Resource, action: Action) -> bool {
    match (resource, action) {
        (Resource::Pictures, Action::Upload) => true,
        (Resource::Picture { owner_id }, Action::Reupload) => {
            identity.user_id == owner_id || identity.is_admin()
        }
        (Resource::Picture { owner_id }, Action::SelfEdit) => identity.user_id == owner_id,
        (
            Resource::Picture { .. } | Resource::Pictures,
            Action::AdminEdit | Action::Review | Action::Delete | Action::ViewFull | Action::BatchUpload,
        ) => identity.is_admin(),
        (Resource::Users, Action::Manage) => identity.is_admin(),
        _ => false,
    }
}

/// [`authorize`], failing with `NoAuth`.
pub fn ensure(identity: &Identity, resource: Resource, action: Action) -> Result<(), AppError> {
    if authorize(identity, resource, action) {
        Ok(())
    } else {
        Err(AppError::NoAuth)
    }
}
