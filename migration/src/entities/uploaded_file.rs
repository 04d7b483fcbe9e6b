//! 上传文件实体
//!
//! 状态流转：pending -> processing -> completed / failed

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "uploaded_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub file_path: String,
    pub original_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub mime_type: String,
    pub checksum: String,
    pub uploaded_by_ip: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub user_agent: String,
    pub status: String,
    #[sea_orm(column_type = "Text")]
    pub processing_error: String,
    pub created_at: DateTimeUtc,
    pub processed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
