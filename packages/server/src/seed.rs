use chrono::Utc;
use common::UserRole;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, IntoActiveModel};
use tracing::info;

use crate::config::BootstrapAdmin;
use crate::dal;
use crate::entity::user;
use crate::error::AppError;
use crate::utils::hash::PasswordCodec;
use crate::utils::id::IdGenerator;

/// Make sure the configured bootstrap account exists and is an admin.
///
/// An existing account keeps its password; only its role is raised.
pub async fn seed_admin(
    db: &DatabaseConnection,
    ids: &IdGenerator,
    codec: &PasswordCodec,
    admin: &BootstrapAdmin,
) -> Result<(), AppError> {
    if let Some(existing) = dal::user::find_by_account(db, &admin.account).await? {
        if existing.role != UserRole::Admin {
            let mut active = existing.into_active_model();
            active.role = Set(UserRole::Admin);
            active.update(db).await?;
            info!(account = %admin.account, "Promoted bootstrap account to admin");
        }
        return Ok(());
    }

    let now = Utc::now();
    let model = user::ActiveModel {
        id: Set(ids.next_id()?),
        account: Set(admin.account.clone()),
        password: Set(codec.hash(&admin.password)?),
        avatar: Set(None),
        profile: Set(None),
        role: Set(UserRole::Admin),
        edit_time: Set(now),
        is_delete: Set(0),
        ..Default::default()
    };
    dal::user::insert(db, model).await?;
    info!(account = %admin.account, "Created bootstrap admin");
    Ok(())
}
