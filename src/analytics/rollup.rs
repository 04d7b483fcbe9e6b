//! 事件汇总
//!
//! 把某一天（UTC）的原始事件聚合到 `daily_stats`，以及刷新当天的热门内容。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::Set;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::EventType;
use crate::errors::Result;
use crate::storage::{EventFilter, SeaOrmStorage};
use crate::utils::truncate_chars;
use migration::entities::{daily_stats, popular_content};

pub const CONTENT_COMMENT: &str = "comment";
pub const CONTENT_FILE: &str = "file";

const TITLE_MAX_CHARS: usize = 100;

/// 热门度：浏览 ×1、点赞 ×3、分享 ×5、回复 ×2；7 天内 ×1.2，30 天内 ×1.1
pub fn popularity_score(
    views: i64,
    likes: i64,
    shares: i64,
    comments: i64,
    days_old: i64,
) -> f64 {
    let score = views as f64 + likes as f64 * 3.0 + shares as f64 * 5.0 + comments as f64 * 2.0;
    if days_old < 7 {
        score * 1.2
    } else if days_old < 30 {
        score * 1.1
    } else {
        score
    }
}

/// 一次周期汇总的结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollupReport {
    pub yesterday_comments: i64,
    pub today_comments: i64,
    pub popular_entries: usize,
    pub events_marked_processed: u64,
}

pub struct RollupManager {
    storage: Arc<SeaOrmStorage>,
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// 从 `file_uploaded` 事件数据中统计图片与文本文件数
fn count_file_kinds(payloads: &[String]) -> (i64, i64) {
    let mut images = 0;
    let mut texts = 0;
    for raw in payloads {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
            continue;
        };
        match value.get("file_type").and_then(|v| v.as_str()) {
            Some("image") => images += 1,
            Some("text") => texts += 1,
            _ => {}
        }
    }
    (images, texts)
}

impl RollupManager {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 重新计算某天的统计（覆盖写入）
    pub async fn update_daily_stats(&self, date: NaiveDate) -> Result<daily_stats::Model> {
        let (start, end) = day_bounds(date);
        let filter = EventFilter {
            since: Some(start),
            until: Some(end),
            ..Default::default()
        };

        let counts: HashMap<String, i64> = self
            .storage
            .event_counts_by_type(&filter)
            .await?
            .into_iter()
            .map(|row| (row.event_type, row.count))
            .collect();
        let count = |t: EventType| counts.get(t.as_str()).copied().unwrap_or(0);

        let upload_payloads = self
            .storage
            .event_payloads(&EventFilter {
                event_type: Some(EventType::FileUploaded.as_str().to_string()),
                ..filter.clone()
            })
            .await?;
        let (images, texts) = count_file_kinds(&upload_payloads);
        let unique_visitors = self.storage.distinct_event_ips(&filter).await? as i64;

        let now = Utc::now();
        let mut model: daily_stats::ActiveModel = match self.storage.find_daily_stats(date).await? {
            Some(existing) => existing.into(),
            None => daily_stats::ActiveModel {
                date: Set(date),
                created_at: Set(now),
                ..Default::default()
            },
        };
        model.comments_created = Set(count(EventType::CommentCreated));
        model.comments_liked = Set(count(EventType::CommentLiked));
        model.replies_created = Set(count(EventType::CommentReplied));
        model.files_uploaded = Set(count(EventType::FileUploaded));
        model.images_uploaded = Set(images);
        model.text_files_uploaded = Set(texts);
        model.new_users = Set(count(EventType::UserRegistered));
        model.user_logins = Set(count(EventType::UserLogin));
        model.page_views = Set(count(EventType::PageView));
        model.unique_visitors = Set(unique_visitors);
        model.searches_performed = Set(count(EventType::SearchPerformed));
        model.errors_occurred = Set(count(EventType::ErrorOccurred));
        model.updated_at = Set(now);

        let stats = self.storage.save_daily_stats(model).await?;
        debug!(
            "Daily stats for {}: {} comments, {} visitors",
            date, stats.comments_created, stats.unique_visitors
        );
        Ok(stats)
    }

    /// 刷新今天的热门评论与文件，返回写入条数
    pub async fn update_popular_content(&self) -> Result<usize> {
        let today = Utc::now().date_naive();
        let mut written = 0;

        for comment in self.storage.active_comments().await? {
            let title = truncate_chars(&comment.text, TITLE_MAX_CHARS);
            self.upsert_popular(
                CONTENT_COMMENT,
                comment.id,
                title,
                today,
                Some((comment.likes_count, comment.replies_count)),
            )
            .await?;
            written += 1;
        }

        for file in self.storage.completed_files().await? {
            self.upsert_popular(CONTENT_FILE, file.id, file.original_name, today, None)
                .await?;
            written += 1;
        }

        info!("Popular content refreshed: {} entries", written);
        Ok(written)
    }

    async fn upsert_popular(
        &self,
        content_type: &str,
        content_id: i64,
        title: String,
        date: NaiveDate,
        counts: Option<(i64, i64)>,
    ) -> Result<popular_content::Model> {
        let existing = self
            .storage
            .find_popular(content_type, content_id, date)
            .await?;

        let (views, likes, shares, comments, mut model) = match existing {
            Some(row) => {
                let (likes, comments) = counts.unwrap_or((row.like_count, row.comment_count));
                let (views, shares) = (row.view_count, row.share_count);
                (views, likes, shares, comments, popular_content::ActiveModel::from(row))
            }
            None => {
                let (likes, comments) = counts.unwrap_or((0, 0));
                let model = popular_content::ActiveModel {
                    content_type: Set(content_type.to_string()),
                    content_id: Set(content_id),
                    content_title: Set(title),
                    date: Set(date),
                    view_count: Set(0),
                    share_count: Set(0),
                    ..Default::default()
                };
                (0, likes, 0, comments, model)
            }
        };

        let days_old = (Utc::now().date_naive() - date).num_days();
        model.like_count = Set(likes);
        model.comment_count = Set(comments);
        model.popularity_score = Set(popularity_score(views, likes, shares, comments, days_old));
        self.storage.save_popular(model).await
    }

    /// 周期任务：重算昨天与今天，并把今天之前的事件标为已处理
    pub async fn run_periodic(&self) -> Result<RollupReport> {
        let today = Utc::now().date_naive();
        let yesterday = today - Duration::days(1);

        let yesterday_stats = self.update_daily_stats(yesterday).await?;
        let today_stats = self.update_daily_stats(today).await?;

        let popular_entries = match self.update_popular_content().await {
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to refresh popular content: {}", e);
                0
            }
        };

        let (today_start, _) = day_bounds(today);
        let events_marked_processed = self
            .storage
            .mark_events_processed(&EventFilter {
                until: Some(today_start),
                ..Default::default()
            })
            .await?;

        let report = RollupReport {
            yesterday_comments: yesterday_stats.comments_created,
            today_comments: today_stats.comments_created,
            popular_entries,
            events_marked_processed,
        };
        info!(
            "Analytics rollup finished - yesterday: {} comments, today: {} comments",
            report.yesterday_comments, report.today_comments
        );
        Ok(report)
    }

    /// 按固定间隔运行 `run_periodic`，首轮在启动后立即执行
    pub fn spawn_background_task(self: Arc<Self>, interval_secs: u64) -> JoinHandle<()> {
        let interval_secs = interval_secs.max(60);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(StdDuration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_periodic().await {
                    error!("Analytics rollup task failed: {}", e);
                }
            }
        });

        info!(
            "Analytics rollup background task started (interval: {} s)",
            interval_secs
        );
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popularity_score_weights() {
        assert_eq!(popularity_score(10, 0, 0, 0, 100), 10.0);
        assert_eq!(popularity_score(0, 2, 1, 3, 100), 17.0);
    }

    #[test]
    fn test_popularity_score_recency_boost() {
        let base = popularity_score(0, 10, 0, 0, 100);
        assert!((popularity_score(0, 10, 0, 0, 0) - base * 1.2).abs() < 1e-9);
        assert!((popularity_score(0, 10, 0, 0, 6) - base * 1.2).abs() < 1e-9);
        assert!((popularity_score(0, 10, 0, 0, 7) - base * 1.1).abs() < 1e-9);
        assert!((popularity_score(0, 10, 0, 0, 29) - base * 1.1).abs() < 1e-9);
        assert_eq!(popularity_score(0, 10, 0, 0, 30), base);
    }

    #[test]
    fn test_count_file_kinds() {
        let payloads = vec![
            r#"{"file_type":"image","file_id":1}"#.to_string(),
            r#"{"file_type":"text"}"#.to_string(),
            r#"{"file_type":"image"}"#.to_string(),
            r#"not json"#.to_string(),
            r#"{}"#.to_string(),
        ];
        assert_eq!(count_file_kinds(&payloads), (2, 1));
    }

    #[test]
    fn test_day_bounds_cover_one_utc_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));
    }
}
