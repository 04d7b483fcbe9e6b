//! 注册用户实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(column_type = "Text")]
    pub bio: String,
    pub website: Option<String>,
    pub avatar: Option<String>,
    pub comments_count: i64,
    pub likes_received: i64,
    pub show_email: bool,
    pub allow_notifications: bool,
    pub last_comment_at: Option<DateTimeUtc>,
    pub date_joined: DateTimeUtc,
    pub last_login: Option<DateTimeUtc>,
    pub is_active: bool,
    pub is_staff: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
