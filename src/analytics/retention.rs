//! 数据清理任务
//!
//! 按配置的保留天数删除已处理事件、会话活动和搜索记录。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::AnalyticsConfig;
use crate::storage::SeaOrmStorage;

/// 清理报告
#[derive(Debug, Default, Clone, Serialize)]
pub struct CleanupReport {
    /// 删除的已处理事件数
    pub events_deleted: u64,
    /// 删除的会话活动数
    pub activities_deleted: u64,
    /// 删除的搜索记录数
    pub searches_deleted: u64,
}

pub struct DataRetentionTask {
    storage: Arc<SeaOrmStorage>,
    event_retention_days: i64,
    activity_retention_days: i64,
    search_retention_days: i64,
}

impl DataRetentionTask {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &AnalyticsConfig) -> Self {
        Self {
            storage,
            event_retention_days: config.event_retention_days.max(1),
            activity_retention_days: config.activity_retention_days.max(1),
            search_retention_days: config.search_retention_days.max(1),
        }
    }

    /// 运行完整的清理流程；单步失败只记录日志，不影响其余步骤
    pub async fn run_cleanup(&self) -> CleanupReport {
        let now = Utc::now();
        let mut report = CleanupReport::default();

        match self
            .storage
            .delete_processed_events_before(now - Duration::days(self.event_retention_days))
            .await
        {
            Ok(deleted) => report.events_deleted = deleted,
            Err(e) => error!("Failed to clean up analytics events: {}", e),
        }

        match self
            .storage
            .delete_activities_before(now - Duration::days(self.activity_retention_days))
            .await
        {
            Ok(deleted) => report.activities_deleted = deleted,
            Err(e) => error!("Failed to clean up user activities: {}", e),
        }

        match self
            .storage
            .delete_search_queries_before(now - Duration::days(self.search_retention_days))
            .await
        {
            Ok(deleted) => report.searches_deleted = deleted,
            Err(e) => error!("Failed to clean up search queries: {}", e),
        }

        info!(
            "Analytics cleanup completed: {} events, {} activities, {} searches",
            report.events_deleted, report.activities_deleted, report.searches_deleted
        );
        report
    }

    /// 启动周期清理任务，首次运行延迟 5 分钟
    pub fn spawn_background_task(self: Arc<Self>, interval_hours: u64) -> JoinHandle<()> {
        let interval_hours = interval_hours.max(1);
        let handle = tokio::spawn(async move {
            let interval = StdDuration::from_secs(interval_hours * 60 * 60);
            tokio::time::sleep(StdDuration::from_secs(300)).await;

            loop {
                self.run_cleanup().await;
                tokio::time::sleep(interval).await;
            }
        });

        info!(
            "Data cleanup background task started (interval: {} hours)",
            interval_hours
        );
        handle
    }
}
