//! 分析事件实体
//!
//! `event_data` 以 JSON 文本存储，写入后由汇总任务按天聚合。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "analytics_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub event_type: String,
    pub content_type: Option<String>,
    pub object_id: Option<i64>,
    pub user_identifier: String,
    pub ip_address: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub user_agent: String,
    pub referer: String,
    #[sea_orm(column_type = "Text")]
    pub event_data: String,
    pub created_at: DateTimeUtc,
    pub processed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
