use async_trait::async_trait;
use common::UserRole;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ps_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Unique among live rows only; see `database::create_schema`.
    pub account: String,
    pub password: String, // argon2 PHC digest
    pub avatar: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub profile: Option<String>,
    pub role: UserRole,

    /// Last change to the profile fields, by the user or an admin.
    pub edit_time: DateTimeUtc,
    pub create_time: DateTimeUtc,
    pub update_time: DateTimeUtc,
    pub is_delete: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::picture::Entity")]
    Pictures,
}

impl Related<super::picture::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pictures.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();
        if insert {
            self.create_time = Set(now);
        }
        self.update_time = Set(now);
        Ok(self)
    }
}
