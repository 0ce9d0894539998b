use sea_orm::entity::prelude::*;

/// An entry in the polled notification feed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    /// Username the entry is meant for, or `all`.
    pub target_user: String,
    pub related_id: Option<String>,
    pub created_at: DateTimeUtc,
    #[sea_orm(default_value = "false")]
    pub read: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
