//! 分析报表
//!
//! 管理后台的看板、实时统计、系统健康度、搜索分析、单用户统计与 CSV 导出。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use moka::future::Cache;
use serde::Serialize;
use tracing::debug;

use super::EventType;
use super::rollup::{CONTENT_COMMENT, CONTENT_FILE};
use crate::config::get_config;
use crate::errors::{CommentaryError, Result};
use crate::storage::{EventFilter, SeaOrmStorage};
use migration::entities::{analytics_event, daily_stats, popular_content, user_activity};

const DASHBOARD_TTL: StdDuration = StdDuration::from_secs(30 * 60);
const DASHBOARD_DAYS: [i64; 3] = [7, 30, 90];
const DEFAULT_DAYS: i64 = 30;
const REALTIME_DEFAULT_MINUTES: i64 = 30;
const REALTIME_MAX_MINUTES: i64 = 60;
const ACTIVE_WINDOW_MINUTES: i64 = 15;
const SEARCH_MAX_DAYS: i64 = 365;
const EVENT_LIST_LIMIT: u64 = 100;
const ACTIVITY_LIST_LIMIT: u64 = 50;
const POPULAR_LIST_LIMIT: u64 = 20;
const EXPORT_SEARCH_LIMIT: u64 = 1000;

// ============ 参数归一化 ============

/// 看板只支持 7 / 30 / 90 天，其余按 30 天处理
pub fn dashboard_days(days: Option<i64>) -> i64 {
    match days {
        Some(d) if DASHBOARD_DAYS.contains(&d) => d,
        _ => DEFAULT_DAYS,
    }
}

pub fn realtime_minutes(minutes: Option<i64>) -> i64 {
    match minutes {
        Some(m) if m > 0 => m.min(REALTIME_MAX_MINUTES),
        _ => REALTIME_DEFAULT_MINUTES,
    }
}

pub fn search_days(days: Option<i64>) -> i64 {
    match days {
        Some(d) if d > 0 => d.min(SEARCH_MAX_DAYS),
        _ => DEFAULT_DAYS,
    }
}

/// 健康分：错误过多、搜索过慢、没有任何事件都会扣分
pub fn health_score(error_events: u64, total_events: u64, avg_search_ms: f64) -> i64 {
    let mut score: i64 = 100;
    if error_events > 10 {
        score -= error_events.min(20) as i64;
    }
    if avg_search_ms > 1000.0 {
        score -= 10;
    }
    if total_events == 0 {
        score -= 30;
    }
    score.max(0)
}

pub fn health_status(score: i64) -> &'static str {
    if score > 80 {
        "healthy"
    } else if score > 50 {
        "warning"
    } else {
        "critical"
    }
}

/// `45s` / `3m 20s` / `2h 5m`
pub fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

// ============ 视图类型 ============

#[derive(Debug, Clone, Serialize)]
pub struct DailyStatsView {
    pub date: NaiveDate,
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
    pub total_activity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<daily_stats::Model> for DailyStatsView {
    fn from(m: daily_stats::Model) -> Self {
        Self {
            total_activity: m.comments_created
                + m.comments_liked
                + m.files_uploaded
                + m.page_views
                + m.searches_performed,
            date: m.date,
            comments_created: m.comments_created,
            comments_liked: m.comments_liked,
            replies_created: m.replies_created,
            files_uploaded: m.files_uploaded,
            images_uploaded: m.images_uploaded,
            text_files_uploaded: m.text_files_uploaded,
            new_users: m.new_users,
            user_logins: m.user_logins,
            page_views: m.page_views,
            unique_visitors: m.unique_visitors,
            searches_performed: m.searches_performed,
            errors_occurred: m.errors_occurred,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: i64,
    pub event_type: String,
    pub content_type: Option<String>,
    pub object_id: Option<i64>,
    pub user_identifier: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub event_data: serde_json::Value,
    pub processed: bool,
}

impl From<analytics_event::Model> for EventView {
    fn from(m: analytics_event::Model) -> Self {
        let event_data = serde_json::from_str(&m.event_data)
            .unwrap_or(serde_json::Value::Object(Default::default()));
        Self {
            id: m.id,
            event_type: m.event_type,
            content_type: m.content_type,
            object_id: m.object_id,
            user_identifier: m.user_identifier,
            ip_address: m.ip_address,
            created_at: m.created_at,
            event_data,
            processed: m.processed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub id: i64,
    pub user_identifier: String,
    pub ip_address: String,
    pub session_id: String,
    pub pages_visited: i64,
    pub comments_posted: i64,
    pub files_uploaded: i64,
    pub likes_given: i64,
    pub searches_performed: i64,
    pub session_start: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub session_duration: i64,
    pub session_duration_display: String,
    pub total_activity: i64,
}

impl From<user_activity::Model> for ActivityView {
    fn from(m: user_activity::Model) -> Self {
        Self {
            total_activity: m.pages_visited
                + m.comments_posted * 3
                + m.files_uploaded * 2
                + m.likes_given
                + m.searches_performed,
            session_duration_display: format_duration(m.session_duration),
            id: m.id,
            user_identifier: m.user_identifier,
            ip_address: m.ip_address,
            session_id: m.session_id,
            pages_visited: m.pages_visited,
            comments_posted: m.comments_posted,
            files_uploaded: m.files_uploaded,
            likes_given: m.likes_given,
            searches_performed: m.searches_performed,
            session_start: m.session_start,
            last_activity: m.last_activity,
            session_duration: m.session_duration,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PopularView {
    pub id: i64,
    pub content_type: String,
    pub content_id: i64,
    pub content_title: String,
    pub view_count: i64,
    pub like_count: i64,
    pub share_count: i64,
    pub comment_count: i64,
    pub popularity_score: f64,
    pub date: NaiveDate,
    pub content_url: Option<String>,
    pub engagement_rate: f64,
}

impl From<popular_content::Model> for PopularView {
    fn from(m: popular_content::Model) -> Self {
        let prefix = get_config().server.api_prefix.trim_end_matches('/').to_string();
        let content_url = match m.content_type.as_str() {
            CONTENT_COMMENT => Some(format!("{}/comments/{}/", prefix, m.content_id)),
            CONTENT_FILE => Some(format!("{}/files/{}/", prefix, m.content_id)),
            _ => None,
        };
        let engagement_rate = if m.view_count > 0 {
            let engagement = (m.like_count + m.share_count + m.comment_count) as f64;
            (engagement / m.view_count as f64 * 10000.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            id: m.id,
            content_type: m.content_type,
            content_id: m.content_id,
            content_title: m.content_title,
            view_count: m.view_count,
            like_count: m.like_count,
            share_count: m.share_count,
            comment_count: m.comment_count,
            popularity_score: m.popularity_score,
            date: m.date,
            content_url,
            engagement_rate,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardTotals {
    pub total_comments: i64,
    pub total_likes: i64,
    pub total_files: i64,
    pub total_users: i64,
    pub total_page_views: i64,
    pub total_searches: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub comments: i64,
    pub likes: i64,
    pub files: i64,
    pub users: i64,
    pub page_views: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryCount {
    pub query: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub totals: DashboardTotals,
    pub trend_data: Vec<TrendPoint>,
    pub top_searches: Vec<QueryCount>,
    pub active_users: u64,
    pub avg_session_duration: f64,
    pub popular_comments: Vec<PopularView>,
    pub popular_files: Vec<PopularView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeReport {
    pub stats: BTreeMap<String, i64>,
    pub active_users: u64,
    pub period_minutes: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub health_score: i64,
    pub period_hours: i64,
    pub error_events: u64,
    pub total_events: u64,
    pub active_users: u64,
    pub avg_search_response_time: f64,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopQueryView {
    pub query: String,
    pub count: i64,
    pub avg_results: f64,
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchTrendView {
    pub day: String,
    pub searches: i64,
    pub avg_results: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub top_queries: Vec<TopQueryView>,
    pub search_trends: Vec<SearchTrendView>,
    pub no_results_queries: Vec<QueryCount>,
    pub total_searches: u64,
    pub avg_results_per_search: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStatsReport {
    pub user_identifier: String,
    pub period_days: i64,
    pub event_counts: BTreeMap<String, i64>,
    pub total_sessions: u64,
    pub total_session_time: i64,
    pub avg_session_time: f64,
    pub total_page_views: i64,
    pub recent_activity: Vec<ActivityView>,
}

/// CSV 导出类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    DailyStats,
    SearchQueries,
}

impl ExportKind {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.unwrap_or("daily_stats") {
            "daily_stats" => Ok(ExportKind::DailyStats),
            "search_queries" => Ok(ExportKind::SearchQueries),
            _ => Err(CommentaryError::validation("Invalid export type")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::DailyStats => "daily_stats",
            ExportKind::SearchQueries => "search_queries",
        }
    }
}

/// 导出结果：文件名与 CSV 内容
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: Vec<u8>,
}

fn average(total: Option<i64>, count: i64) -> f64 {
    if count > 0 {
        total.unwrap_or(0) as f64 / count as f64
    } else {
        0.0
    }
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

// ============ 报表服务 ============

pub struct AnalyticsReports {
    storage: Arc<SeaOrmStorage>,
    dashboard_cache: Cache<i64, Arc<DashboardReport>>,
}

impl AnalyticsReports {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        let dashboard_cache = Cache::builder()
            .max_capacity(DASHBOARD_DAYS.len() as u64 + 1)
            .time_to_live(DASHBOARD_TTL)
            .build();
        Self {
            storage,
            dashboard_cache,
        }
    }

    /// 汇总刷新后调用
    pub fn invalidate(&self) {
        self.dashboard_cache.invalidate_all();
    }

    pub async fn dashboard(&self, days: i64) -> Result<Arc<DashboardReport>> {
        if let Some(cached) = self.dashboard_cache.get(&days).await {
            return Ok(cached);
        }
        let report = Arc::new(self.build_dashboard(days).await?);
        self.dashboard_cache.insert(days, report.clone()).await;
        Ok(report)
    }

    async fn build_dashboard(&self, days: i64) -> Result<DashboardReport> {
        let today = Utc::now().date_naive();
        let start_date = today - Duration::days(days);
        let since = start_of(start_date);

        let stats = self.storage.daily_stats_since(start_date, false).await?;
        let mut totals = DashboardTotals::default();
        let mut trend_data = Vec::with_capacity(stats.len());
        for s in stats.iter().filter(|s| s.date <= today) {
            totals.total_comments += s.comments_created;
            totals.total_likes += s.comments_liked;
            totals.total_files += s.files_uploaded;
            totals.total_users += s.new_users;
            totals.total_page_views += s.page_views;
            totals.total_searches += s.searches_performed;
            trend_data.push(TrendPoint {
                date: s.date,
                comments: s.comments_created,
                likes: s.comments_liked,
                files: s.files_uploaded,
                users: s.new_users,
                page_views: s.page_views,
            });
        }

        let top_searches = self
            .storage
            .top_search_queries(since, false, 10)
            .await?
            .into_iter()
            .map(|row| QueryCount {
                query: row.query,
                count: row.count,
            })
            .collect();

        let (active_users, avg_session_duration) = self.storage.activity_overview(since).await?;

        let popular_comments = self.popular(CONTENT_COMMENT, days, 5).await?;
        let popular_files = self.popular(CONTENT_FILE, days, 5).await?;

        debug!("Dashboard built for the last {} days", days);
        Ok(DashboardReport {
            totals,
            trend_data,
            top_searches,
            active_users,
            avg_session_duration,
            popular_comments,
            popular_files,
        })
    }

    pub async fn realtime(&self, minutes: i64) -> Result<RealtimeReport> {
        let now = Utc::now();
        let window = EventFilter {
            since: Some(now - Duration::minutes(minutes)),
            ..Default::default()
        };
        let stats = self
            .storage
            .event_counts_by_type(&window)
            .await?
            .into_iter()
            .map(|row| (row.event_type, row.count))
            .collect();

        let active_users = self
            .storage
            .distinct_event_users(&EventFilter {
                since: Some(now - Duration::minutes(ACTIVE_WINDOW_MINUTES)),
                ..Default::default()
            })
            .await?;

        Ok(RealtimeReport {
            stats,
            active_users,
            period_minutes: minutes,
            timestamp: now,
        })
    }

    pub async fn system_health(&self, hours: i64) -> Result<HealthReport> {
        let now = Utc::now();
        let since = now - Duration::hours(hours);

        let error_events = self
            .storage
            .count_events(&EventFilter {
                event_type: Some(EventType::ErrorOccurred.as_str().to_string()),
                since: Some(since),
                ..Default::default()
            })
            .await?;
        let total_events = self
            .storage
            .count_events(&EventFilter {
                since: Some(since),
                ..Default::default()
            })
            .await?;
        let active_users = self
            .storage
            .count_recent_activities(now - Duration::minutes(ACTIVE_WINDOW_MINUTES))
            .await?;

        let (searches, _, total_response) = self.storage.search_totals(since).await?;
        let avg_search_response_time = average(Some(total_response), searches as i64);

        let score = health_score(error_events, total_events, avg_search_response_time);
        Ok(HealthReport {
            health_score: score,
            period_hours: hours,
            error_events,
            total_events,
            active_users,
            avg_search_response_time,
            status: health_status(score),
        })
    }

    /// 最近 N 天的每日统计，最新在前
    pub async fn daily_stats(&self, days: i64) -> Result<Vec<DailyStatsView>> {
        let start = Utc::now().date_naive() - Duration::days(days);
        let rows = self.storage.daily_stats_since(start, true).await?;
        Ok(rows.into_iter().map(DailyStatsView::from).collect())
    }

    pub async fn events(
        &self,
        event_type: Option<String>,
        user_identifier: Option<String>,
        hours: i64,
    ) -> Result<Vec<EventView>> {
        let filter = EventFilter {
            event_type,
            user_identifier,
            since: Some(Utc::now() - Duration::hours(hours)),
            until: None,
        };
        let rows = self.storage.list_events(&filter, EVENT_LIST_LIMIT).await?;
        Ok(rows.into_iter().map(EventView::from).collect())
    }

    pub async fn activity(
        &self,
        user_identifier: Option<&str>,
        days: i64,
    ) -> Result<Vec<ActivityView>> {
        let since = Utc::now() - Duration::days(days);
        let rows = self
            .storage
            .list_activities(user_identifier, since, ACTIVITY_LIST_LIMIT)
            .await?;
        Ok(rows.into_iter().map(ActivityView::from).collect())
    }

    pub async fn popular(
        &self,
        content_type: &str,
        days: i64,
        limit: u64,
    ) -> Result<Vec<PopularView>> {
        let since = Utc::now().date_naive() - Duration::days(days);
        let rows = self.storage.list_popular(content_type, since, limit).await?;
        Ok(rows.into_iter().map(PopularView::from).collect())
    }

    /// 公共热门列表（固定 20 条）
    pub async fn popular_list(&self, content_type: &str, days: i64) -> Result<Vec<PopularView>> {
        self.popular(content_type, days, POPULAR_LIST_LIMIT).await
    }

    pub async fn search_analytics(&self, days: i64) -> Result<SearchReport> {
        let since = Utc::now() - Duration::days(days);

        let top_queries = self
            .storage
            .top_search_queries(since, false, 20)
            .await?
            .into_iter()
            .map(|row| TopQueryView {
                avg_results: average(row.total_results, row.count),
                avg_response_time: average(row.total_response_time, row.count),
                query: row.query,
                count: row.count,
            })
            .collect();

        let search_trends = self
            .storage
            .search_trends(since)
            .await?
            .into_iter()
            .map(|row| SearchTrendView {
                avg_results: average(row.total_results, row.searches),
                day: row.day,
                searches: row.searches,
            })
            .collect();

        let no_results_queries = self
            .storage
            .top_search_queries(since, true, 10)
            .await?
            .into_iter()
            .map(|row| QueryCount {
                query: row.query,
                count: row.count,
            })
            .collect();

        let (total_searches, total_results, _) = self.storage.search_totals(since).await?;
        Ok(SearchReport {
            top_queries,
            search_trends,
            no_results_queries,
            total_searches,
            avg_results_per_search: average(Some(total_results), total_searches as i64),
        })
    }

    pub async fn user_statistics(&self, user_identifier: &str, days: i64) -> Result<UserStatsReport> {
        let since = Utc::now() - Duration::days(days);
        let event_counts = self
            .storage
            .event_counts_by_type(&EventFilter {
                user_identifier: Some(user_identifier.to_string()),
                since: Some(since),
                ..Default::default()
            })
            .await?
            .into_iter()
            .map(|row| (row.event_type, row.count))
            .collect();

        let totals = self.storage.activity_totals(user_identifier, since).await?;
        let recent_activity = self
            .storage
            .list_activities(Some(user_identifier), since, 5)
            .await?
            .into_iter()
            .map(ActivityView::from)
            .collect();

        Ok(UserStatsReport {
            user_identifier: user_identifier.to_string(),
            period_days: days,
            event_counts,
            total_sessions: totals.sessions,
            total_session_time: totals.total_duration,
            avg_session_time: average(Some(totals.total_duration), totals.sessions as i64),
            total_page_views: totals.total_page_views,
            recent_activity,
        })
    }

    pub async fn export_csv(&self, kind: ExportKind, days: i64) -> Result<CsvExport> {
        let today = Utc::now().date_naive();
        let start_date = today - Duration::days(days);
        let mut writer = csv::Writer::from_writer(Vec::new());

        match kind {
            ExportKind::DailyStats => {
                writer.write_record([
                    "Date",
                    "Comments Created",
                    "Comments Liked",
                    "Replies Created",
                    "Files Uploaded",
                    "New Users",
                    "Page Views",
                    "Unique Visitors",
                    "Searches Performed",
                    "Errors Occurred",
                ])?;
                for s in self.storage.daily_stats_since(start_date, false).await? {
                    writer.write_record([
                        s.date.to_string(),
                        s.comments_created.to_string(),
                        s.comments_liked.to_string(),
                        s.replies_created.to_string(),
                        s.files_uploaded.to_string(),
                        s.new_users.to_string(),
                        s.page_views.to_string(),
                        s.unique_visitors.to_string(),
                        s.searches_performed.to_string(),
                        s.errors_occurred.to_string(),
                    ])?;
                }
            }
            ExportKind::SearchQueries => {
                writer.write_record([
                    "Query",
                    "Results Count",
                    "Response Time",
                    "User",
                    "IP Address",
                    "Created At",
                ])?;
                let rows = self
                    .storage
                    .list_search_queries(start_of(start_date), EXPORT_SEARCH_LIMIT)
                    .await?;
                for q in rows {
                    writer.write_record([
                        q.query,
                        q.results_count.to_string(),
                        q.response_time.to_string(),
                        q.user_identifier,
                        q.ip_address.unwrap_or_default(),
                        q.created_at.to_rfc3339(),
                    ])?;
                }
            }
        }

        let body = writer
            .into_inner()
            .map_err(|e| CommentaryError::serialization(e.to_string()))?;
        Ok(CsvExport {
            filename: format!("{}_{}_to_{}.csv", kind.as_str(), start_date, today),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_normalisation() {
        assert_eq!(dashboard_days(Some(7)), 7);
        assert_eq!(dashboard_days(Some(14)), 30);
        assert_eq!(dashboard_days(None), 30);
        assert_eq!(realtime_minutes(Some(120)), 60);
        assert_eq!(realtime_minutes(Some(-5)), 30);
        assert_eq!(realtime_minutes(None), 30);
        assert_eq!(search_days(Some(1000)), 365);
        assert_eq!(search_days(Some(10)), 10);
    }

    #[test]
    fn test_health_score_rules() {
        assert_eq!(health_score(0, 100, 10.0), 100);
        assert_eq!(health_score(10, 100, 10.0), 100);
        assert_eq!(health_score(15, 100, 10.0), 85);
        assert_eq!(health_score(500, 600, 10.0), 80);
        assert_eq!(health_score(0, 100, 1500.0), 90);
        assert_eq!(health_score(0, 0, 0.0), 70);
        assert_eq!(health_score(50, 0, 5000.0), 40);
    }

    #[test]
    fn test_health_status_thresholds() {
        assert_eq!(health_status(100), "healthy");
        assert_eq!(health_status(81), "healthy");
        assert_eq!(health_status(80), "warning");
        assert_eq!(health_status(51), "warning");
        assert_eq!(health_status(50), "critical");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(200), "3m 20s");
        assert_eq!(format_duration(7500), "2h 5m");
    }

    #[test]
    fn test_export_kind_parse() {
        assert_eq!(ExportKind::parse(None).unwrap(), ExportKind::DailyStats);
        assert_eq!(
            ExportKind::parse(Some("search_queries")).unwrap(),
            ExportKind::SearchQueries
        );
        let err = ExportKind::parse(Some("users")).unwrap_err();
        assert_eq!(err.message(), "Invalid export type");
    }

    #[test]
    fn test_average_handles_empty() {
        assert_eq!(average(None, 0), 0.0);
        assert_eq!(average(Some(10), 4), 2.5);
    }
}
