//! 天级汇总实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "daily_stats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub date: Date,
    pub comments_created: i64,
    pub comments_liked: i64,
    pub replies_created: i64,
    pub files_uploaded: i64,
    pub images_uploaded: i64,
    pub text_files_uploaded: i64,
    pub new_users: i64,
    pub user_logins: i64,
    pub page_views: i64,
    pub unique_visitors: i64,
    pub searches_performed: i64,
    pub errors_occurred: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
