use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "text_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub uploaded_file_id: i64,
    pub encoding: String,
    pub line_count: i64,
    pub word_count: i64,
    pub character_count: i64,
    #[sea_orm(column_type = "Text")]
    pub preview: String,
    pub is_valid_utf8: bool,
    pub has_binary_content: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
