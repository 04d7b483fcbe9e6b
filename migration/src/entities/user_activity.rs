use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user_activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_identifier: String,
    pub ip_address: String,
    pub session_id: String,
    #[sea_orm(column_type = "Text")]
    pub user_agent: String,
    pub session_start: DateTimeUtc,
    pub last_activity: DateTimeUtc,
    /// 会话时长（秒）
    pub session_duration: i64,
    pub pages_visited: i64,
    pub comments_posted: i64,
    pub files_uploaded: i64,
    pub likes_given: i64,
    pub searches_performed: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
