use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::errors::Result;

pub mod backend;

pub use backend::{
    ActivityTotals, CommentFilter, CommentOrdering, CommentSortField, CommentStatsRow,
    EventCountRow, EventFilter, FileAggregates, FileFilter, FileOrdering, FileSortField,
    SearchTrendRow, SeaOrmStorage, TopCommenterRow, TopQueryRow, UserCommentCountRow,
};

pub struct StorageFactory;

impl StorageFactory {
    /// 按全局配置创建存储
    pub async fn create() -> Result<Arc<SeaOrmStorage>> {
        let config = crate::config::get_config();
        Self::create_with(&config.database).await
    }

    pub async fn create_with(database: &DatabaseConfig) -> Result<Arc<SeaOrmStorage>> {
        let database_url = &database.database_url;

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;

        let storage = SeaOrmStorage::new(database_url, &backend_type, database).await?;
        Ok(Arc::new(storage))
    }
}
