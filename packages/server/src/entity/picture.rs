use async_trait::async_trait;
use common::ReviewStatus;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ps_picture")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    pub url: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub introduction: Option<String>,
    pub category: Option<String>,
    /// JSON array of tag strings, e.g. `["cat","cute"]`.
    #[sea_orm(column_type = "Text", nullable)]
    pub tags: Option<String>,

    pub pic_size: i64,   // in bytes
    pub pic_width: i32,  // in pixels
    pub pic_height: i32, // in pixels
    pub pic_scale: f64,  // width / height
    pub pic_format: String,

    #[sea_orm(indexed)]
    pub user_id: i64,

    pub edit_time: DateTimeUtc,
    pub create_time: DateTimeUtc,
    pub update_time: DateTimeUtc,
    pub is_delete: i32,

    pub review_status: ReviewStatus,
    pub review_message: Option<String>,
    pub reviewer_id: Option<i64>,
    pub review_time: Option<DateTimeUtc>,
}

impl Model {
    /// Decode the stored tag list. A missing or empty column is no tags.
    pub fn tag_list(&self) -> Result<Vec<String>, serde_json::Error> {
        match self.tags.as_deref() {
            None | Some("") => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw),
        }
    }
}

/// Encode a tag list for the `tags` column, preserving order.
pub fn encode_tags(tags: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(tags)
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
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
