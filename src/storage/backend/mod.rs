//! SeaORM storage backend
//!
//! One `SeaOrmStorage` serves every domain. Queries and mutations live in
//! per-domain submodules as `impl SeaOrmStorage` blocks.

mod analytics;
mod comments;
mod connection;
mod files;
pub mod retry;
mod users;

use std::time::Duration;

use moka::sync::Cache;
use sea_orm::sea_query::{Expr, ExprTrait, Func, IntoColumnRef, LikeExpr};
use sea_orm::{DatabaseConnection, DbBackend};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::errors::{CommentaryError, Result};

pub use analytics::{ActivityTotals, EventCountRow, EventFilter, SearchTrendRow, TopQueryRow};
pub use comments::{
    CommentFilter, CommentOrdering, CommentSortField, CommentStatsRow, UserCommentCountRow,
};
pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use files::{
    FileAggregates, FileFilter, FileOrdering, FileSortField, STATUS_COMPLETED, STATUS_FAILED,
    STATUS_PROCESSING,
};
pub use users::TopCommenterRow;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(CommentaryError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 大小写不敏感的子串匹配（LOWER(col) LIKE '%needle%' ESCAPE '\\'）
///
/// needle 中的 `%` 与 `_` 按字面匹配。
pub(crate) fn icontains<C: IntoColumnRef>(col: C, needle: &str) -> Expr {
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Func::lower(Expr::col(col)).like(LikeExpr::new(pattern).escape('\\'))
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 大小写不敏感的等值匹配
pub(crate) fn iexact<C: IntoColumnRef>(col: C, value: &str) -> Expr {
    Func::lower(Expr::col(col)).eq(value.to_lowercase())
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// 分页 COUNT 缓存（TTL 30秒）
    count_cache: Cache<String, u64>,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str, config: &DatabaseConfig) -> Result<Self> {
        if database_url.is_empty() {
            return Err(CommentaryError::database_config("database_url 未设置"));
        }

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url, config).await?
        } else {
            connect_generic(database_url, backend_name, config).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            count_cache: Cache::builder()
                .time_to_live(Duration::from_secs(30))
                .max_capacity(256)
                .build(),
            retry_config: retry::RetryConfig::from(config),
        };

        run_migrations(&storage.db).await?;

        info!("{} storage initialized", storage.backend_name.to_uppercase());
        Ok(storage)
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub(crate) fn db_backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    /// 清除分页 COUNT 缓存（数据变更时调用）
    pub fn invalidate_count_cache(&self) {
        self.count_cache.invalidate_all();
    }

    /// 读取或计算 COUNT（命中缓存时不访问数据库）
    pub(crate) async fn cached_count<F, Fut>(&self, key: String, count: F) -> Result<u64>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<u64>>,
    {
        if let Some(cached) = self.count_cache.get(&key) {
            return Ok(cached);
        }
        let value = count().await?;
        self.count_cache.insert(key, value);
        Ok(value)
    }

    /// 带重试执行一次数据库操作，错误统一映射为 CommentaryError
    pub(crate) async fn retrying<T, F, Fut>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, sea_orm::DbErr>>,
    {
        retry::with_retry(operation_name, self.retry_config, operation)
            .await
            .map_err(CommentaryError::from)
    }

    /// 存活探测（health / readiness）
    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await.map_err(|e| {
            warn!("Database ping failed: {}", e);
            CommentaryError::database_connection(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://x.db?mode=rwc").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("data/comments.sqlite").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("mariadb://u@h/db").unwrap(), "mysql");
        assert_eq!(infer_backend_from_url("postgresql://u@h/db").unwrap(), "postgres");
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("c:\\tmp"), "c:\\\\tmp");
        assert_eq!(escape_like("plain"), "plain");
    }
}
