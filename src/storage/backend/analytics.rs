//! Analytics 相关的数据库查询
//!
//! 事件、会话活动、每日统计、热门内容与搜索记录的读写，供
//! `analytics` 模块的 tracker / rollup / reports 调用。

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbBackend, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use super::SeaOrmStorage;
use crate::errors::Result;

use migration::entities::{
    analytics_event, daily_stats, popular_content, search_query, user_activity,
};

// ============ 查询结果类型 ============

/// 按事件类型计数
#[derive(Debug, Clone, FromQueryResult, serde::Serialize)]
pub struct EventCountRow {
    pub event_type: String,
    pub count: i64,
}

/// 按查询词聚合（平均值在调用方由总和 / 次数得出）
#[derive(Debug, Clone, FromQueryResult)]
pub struct TopQueryRow {
    pub query: String,
    pub count: i64,
    pub total_results: Option<i64>,
    pub total_response_time: Option<i64>,
}

/// 按天聚合的搜索量
#[derive(Debug, Clone, FromQueryResult)]
pub struct SearchTrendRow {
    pub day: String,
    pub searches: i64,
    pub total_results: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct SumCountRow {
    rows: i64,
    total: Option<i64>,
}

/// 会话活动汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityTotals {
    pub sessions: u64,
    pub total_duration: i64,
    pub total_page_views: i64,
}

/// 事件列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<String>,
    pub user_identifier: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl EventFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(ref t) = self.event_type {
            condition = condition.add(analytics_event::Column::EventType.eq(t.as_str()));
        }
        if let Some(ref user) = self.user_identifier {
            condition = condition.add(analytics_event::Column::UserIdentifier.eq(user.as_str()));
        }
        if let Some(since) = self.since {
            condition = condition.add(analytics_event::Column::CreatedAt.gte(since));
        }
        if let Some(until) = self.until {
            condition = condition.add(analytics_event::Column::CreatedAt.lt(until));
        }
        condition
    }
}

/// 按数据库类型生成 `YYYY-MM-DD` 日期表达式
fn day_label_expr(backend: DbBackend, column: &str) -> Expr {
    match backend {
        DbBackend::Sqlite => Expr::cust(format!("strftime('%Y-%m-%d', {})", column)),
        DbBackend::MySql => Expr::cust(format!("DATE_FORMAT({}, '%Y-%m-%d')", column)),
        DbBackend::Postgres | _ => Expr::cust(format!("TO_CHAR({}, 'YYYY-MM-DD')", column)),
    }
}

impl SeaOrmStorage {
    // ===== 事件 =====

    /// 批量写入事件
    pub async fn insert_events(&self, events: Vec<analytics_event::ActiveModel>) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }
        let db = &self.db;
        let count = events.len();
        self.retrying("insert_events", || {
            analytics_event::Entity::insert_many(events.clone()).exec(db)
        })
        .await?;
        Ok(count)
    }

    pub async fn list_events(
        &self,
        filter: &EventFilter,
        limit: u64,
    ) -> Result<Vec<analytics_event::Model>> {
        let db = &self.db;
        self.retrying("list_events", || {
            analytics_event::Entity::find()
                .filter(filter.condition())
                .order_by_desc(analytics_event::Column::CreatedAt)
                .order_by_desc(analytics_event::Column::Id)
                .limit(limit)
                .all(db)
        })
        .await
    }

    pub async fn count_events(&self, filter: &EventFilter) -> Result<u64> {
        let db = &self.db;
        self.retrying("count_events", || {
            analytics_event::Entity::find()
                .filter(filter.condition())
                .count(db)
        })
        .await
    }

    /// 按事件类型分组计数
    pub async fn event_counts_by_type(&self, filter: &EventFilter) -> Result<Vec<EventCountRow>> {
        let db = &self.db;
        self.retrying("event_counts_by_type", || {
            analytics_event::Entity::find()
                .select_only()
                .column(analytics_event::Column::EventType)
                .column_as(analytics_event::Column::Id.count(), "count")
                .filter(filter.condition())
                .group_by(analytics_event::Column::EventType)
                .order_by_asc(analytics_event::Column::EventType)
                .into_model::<EventCountRow>()
                .all(db)
        })
        .await
    }

    /// 不同 IP 数（NULL 计为一个访客）
    pub async fn distinct_event_ips(&self, filter: &EventFilter) -> Result<u64> {
        let db = &self.db;
        let ips: Vec<Option<String>> = self
            .retrying("distinct_event_ips", || {
                analytics_event::Entity::find()
                    .select_only()
                    .column(analytics_event::Column::IpAddress)
                    .filter(filter.condition())
                    .distinct()
                    .into_tuple::<Option<String>>()
                    .all(db)
            })
            .await?;
        Ok(ips.len() as u64)
    }

    /// 非空用户标识的去重数
    pub async fn distinct_event_users(&self, filter: &EventFilter) -> Result<u64> {
        let db = &self.db;
        let users: Vec<String> = self
            .retrying("distinct_event_users", || {
                analytics_event::Entity::find()
                    .select_only()
                    .column(analytics_event::Column::UserIdentifier)
                    .filter(filter.condition())
                    .filter(analytics_event::Column::UserIdentifier.ne(""))
                    .distinct()
                    .into_tuple::<String>()
                    .all(db)
            })
            .await?;
        Ok(users.len() as u64)
    }

    /// 某时间段内某类事件的 event_data 原文
    pub async fn event_payloads(&self, filter: &EventFilter) -> Result<Vec<String>> {
        let db = &self.db;
        self.retrying("event_payloads", || {
            analytics_event::Entity::find()
                .select_only()
                .column(analytics_event::Column::EventData)
                .filter(filter.condition())
                .into_tuple::<String>()
                .all(db)
        })
        .await
    }

    pub async fn mark_events_processed(&self, filter: &EventFilter) -> Result<u64> {
        let db = &self.db;
        let result = self
            .retrying("mark_events_processed", || {
                analytics_event::Entity::update_many()
                    .col_expr(analytics_event::Column::Processed, Expr::value(true))
                    .filter(filter.condition())
                    .filter(analytics_event::Column::Processed.eq(false))
                    .exec(db)
            })
            .await?;
        Ok(result.rows_affected)
    }

    // ===== 会话活动 =====

    pub async fn find_activity(
        &self,
        user_identifier: &str,
        ip: &str,
        session_id: &str,
    ) -> Result<Option<user_activity::Model>> {
        let db = &self.db;
        self.retrying("find_activity", || {
            user_activity::Entity::find()
                .filter(user_activity::Column::UserIdentifier.eq(user_identifier))
                .filter(user_activity::Column::IpAddress.eq(ip))
                .filter(user_activity::Column::SessionId.eq(session_id))
                .order_by_asc(user_activity::Column::Id)
                .one(db)
        })
        .await
    }

    pub async fn save_activity(
        &self,
        model: user_activity::ActiveModel,
    ) -> Result<user_activity::Model> {
        let db = &self.db;
        self.retrying("save_activity", || {
            let model = model.clone();
            async move {
                if !model.id.is_not_set() {
                    model.update(db).await
                } else {
                    model.insert(db).await
                }
            }
        })
        .await
    }

    pub async fn list_activities(
        &self,
        user_identifier: Option<&str>,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<user_activity::Model>> {
        let db = &self.db;
        self.retrying("list_activities", || {
            let mut query = user_activity::Entity::find()
                .filter(user_activity::Column::SessionStart.gte(since));
            if let Some(user) = user_identifier {
                query = query.filter(user_activity::Column::UserIdentifier.eq(user));
            }
            query
                .order_by_desc(user_activity::Column::SessionStart)
                .limit(limit)
                .all(db)
        })
        .await
    }

    /// 会话开始于 since 之后的去重用户数与平均会话时长
    pub async fn activity_overview(&self, since: DateTime<Utc>) -> Result<(u64, f64)> {
        let db = &self.db;
        let users: Vec<String> = self
            .retrying("activity_overview.users", || {
                user_activity::Entity::find()
                    .select_only()
                    .column(user_activity::Column::UserIdentifier)
                    .filter(user_activity::Column::SessionStart.gte(since))
                    .distinct()
                    .into_tuple::<String>()
                    .all(db)
            })
            .await?;

        let durations = self
            .retrying("activity_overview.duration", || {
                user_activity::Entity::find()
                    .select_only()
                    .column_as(user_activity::Column::Id.count(), "rows")
                    .column_as(user_activity::Column::SessionDuration.sum(), "total")
                    .filter(user_activity::Column::SessionStart.gte(since))
                    .into_model::<SumCountRow>()
                    .one(db)
            })
            .await?;
        let avg = match durations {
            Some(row) if row.rows > 0 => row.total.unwrap_or(0) as f64 / row.rows as f64,
            _ => 0.0,
        };
        Ok((users.len() as u64, avg))
    }

    /// last_activity 在 since 之后的会话数
    pub async fn count_recent_activities(&self, since: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;
        self.retrying("count_recent_activities", || {
            user_activity::Entity::find()
                .filter(user_activity::Column::LastActivity.gte(since))
                .count(db)
        })
        .await
    }

    pub async fn activity_totals(
        &self,
        user_identifier: &str,
        since: DateTime<Utc>,
    ) -> Result<ActivityTotals> {
        let db = &self.db;
        let scoped = user_activity::Entity::find()
            .filter(user_activity::Column::UserIdentifier.eq(user_identifier))
            .filter(user_activity::Column::SessionStart.gte(since));

        let duration = self
            .retrying("activity_totals.duration", || {
                scoped
                    .clone()
                    .select_only()
                    .column_as(user_activity::Column::Id.count(), "rows")
                    .column_as(user_activity::Column::SessionDuration.sum(), "total")
                    .into_model::<SumCountRow>()
                    .one(db)
            })
            .await?;
        let pages = self
            .retrying("activity_totals.pages", || {
                scoped
                    .clone()
                    .select_only()
                    .column_as(user_activity::Column::Id.count(), "rows")
                    .column_as(user_activity::Column::PagesVisited.sum(), "total")
                    .into_model::<SumCountRow>()
                    .one(db)
            })
            .await?;

        let (sessions, total_duration) = duration
            .map(|r| (r.rows.max(0) as u64, r.total.unwrap_or(0)))
            .unwrap_or((0, 0));
        Ok(ActivityTotals {
            sessions,
            total_duration,
            total_page_views: pages.and_then(|r| r.total).unwrap_or(0),
        })
    }

    // ===== 每日统计 =====

    pub async fn find_daily_stats(&self, date: NaiveDate) -> Result<Option<daily_stats::Model>> {
        let db = &self.db;
        self.retrying("find_daily_stats", || {
            daily_stats::Entity::find()
                .filter(daily_stats::Column::Date.eq(date))
                .one(db)
        })
        .await
    }

    pub async fn save_daily_stats(
        &self,
        model: daily_stats::ActiveModel,
    ) -> Result<daily_stats::Model> {
        let db = &self.db;
        self.retrying("save_daily_stats", || {
            let model = model.clone();
            async move {
                if !model.id.is_not_set() {
                    model.update(db).await
                } else {
                    model.insert(db).await
                }
            }
        })
        .await
    }

    pub async fn daily_stats_since(
        &self,
        start: NaiveDate,
        newest_first: bool,
    ) -> Result<Vec<daily_stats::Model>> {
        let db = &self.db;
        self.retrying("daily_stats_since", || {
            let query =
                daily_stats::Entity::find().filter(daily_stats::Column::Date.gte(start));
            if newest_first {
                query.order_by_desc(daily_stats::Column::Date).all(db)
            } else {
                query.order_by_asc(daily_stats::Column::Date).all(db)
            }
        })
        .await
    }

    // ===== 热门内容 =====

    pub async fn find_popular(
        &self,
        content_type: &str,
        content_id: i64,
        date: NaiveDate,
    ) -> Result<Option<popular_content::Model>> {
        let db = &self.db;
        self.retrying("find_popular", || {
            popular_content::Entity::find()
                .filter(popular_content::Column::ContentType.eq(content_type))
                .filter(popular_content::Column::ContentId.eq(content_id))
                .filter(popular_content::Column::Date.eq(date))
                .one(db)
        })
        .await
    }

    pub async fn save_popular(
        &self,
        model: popular_content::ActiveModel,
    ) -> Result<popular_content::Model> {
        let db = &self.db;
        self.retrying("save_popular", || {
            let model = model.clone();
            async move {
                if !model.id.is_not_set() {
                    model.update(db).await
                } else {
                    model.insert(db).await
                }
            }
        })
        .await
    }

    pub async fn list_popular(
        &self,
        content_type: &str,
        since: NaiveDate,
        limit: u64,
    ) -> Result<Vec<popular_content::Model>> {
        let db = &self.db;
        self.retrying("list_popular", || {
            popular_content::Entity::find()
                .filter(popular_content::Column::ContentType.eq(content_type))
                .filter(popular_content::Column::Date.gte(since))
                .order_by_desc(popular_content::Column::PopularityScore)
                .order_by_asc(popular_content::Column::Id)
                .limit(limit)
                .all(db)
        })
        .await
    }

    // ===== 搜索记录 =====

    pub async fn insert_search_query(
        &self,
        model: search_query::ActiveModel,
    ) -> Result<search_query::Model> {
        let db = &self.db;
        self.retrying("insert_search_query", || model.clone().insert(db))
            .await
    }

    pub async fn list_search_queries(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<search_query::Model>> {
        let db = &self.db;
        self.retrying("list_search_queries", || {
            search_query::Entity::find()
                .filter(search_query::Column::CreatedAt.gte(since))
                .order_by_desc(search_query::Column::CreatedAt)
                .limit(limit)
                .all(db)
        })
        .await
    }

    /// 按查询词聚合，次数多的在前；`only_empty` 只统计无结果的查询
    pub async fn top_search_queries(
        &self,
        since: DateTime<Utc>,
        only_empty: bool,
        limit: u64,
    ) -> Result<Vec<TopQueryRow>> {
        let db = &self.db;
        self.retrying("top_search_queries", || {
            let mut query = search_query::Entity::find()
                .select_only()
                .column(search_query::Column::Query)
                .column_as(search_query::Column::Id.count(), "count")
                .column_as(search_query::Column::ResultsCount.sum(), "total_results")
                .column_as(search_query::Column::ResponseTime.sum(), "total_response_time")
                .filter(search_query::Column::CreatedAt.gte(since));
            if only_empty {
                query = query.filter(search_query::Column::ResultsCount.eq(0));
            }
            query
                .group_by(search_query::Column::Query)
                .order_by_desc(search_query::Column::Id.count())
                .order_by_asc(search_query::Column::Query)
                .limit(limit)
                .into_model::<TopQueryRow>()
                .all(db)
        })
        .await
    }

    /// 按天聚合搜索量（日期升序）
    pub async fn search_trends(&self, since: DateTime<Utc>) -> Result<Vec<SearchTrendRow>> {
        let db = &self.db;
        let day = day_label_expr(self.db_backend(), "created_at");
        self.retrying("search_trends", || {
            search_query::Entity::find()
                .select_only()
                .column_as(day.clone(), "day")
                .column_as(search_query::Column::Id.count(), "searches")
                .column_as(search_query::Column::ResultsCount.sum(), "total_results")
                .filter(search_query::Column::CreatedAt.gte(since))
                .group_by(day.clone())
                .order_by_asc(day.clone())
                .into_model::<SearchTrendRow>()
                .all(db)
        })
        .await
    }

    /// (查询次数, 结果数总和, 响应时间总和)
    pub async fn search_totals(&self, since: DateTime<Utc>) -> Result<(u64, i64, i64)> {
        let db = &self.db;
        let scoped =
            search_query::Entity::find().filter(search_query::Column::CreatedAt.gte(since));
        let results = self
            .retrying("search_totals.results", || {
                scoped
                    .clone()
                    .select_only()
                    .column_as(search_query::Column::Id.count(), "rows")
                    .column_as(search_query::Column::ResultsCount.sum(), "total")
                    .into_model::<SumCountRow>()
                    .one(db)
            })
            .await?;
        let times = self
            .retrying("search_totals.response", || {
                scoped
                    .clone()
                    .select_only()
                    .column_as(search_query::Column::Id.count(), "rows")
                    .column_as(search_query::Column::ResponseTime.sum(), "total")
                    .into_model::<SumCountRow>()
                    .one(db)
            })
            .await?;

        let (rows, total_results) = results
            .map(|r| (r.rows.max(0) as u64, r.total.unwrap_or(0)))
            .unwrap_or((0, 0));
        Ok((rows, total_results, times.and_then(|r| r.total).unwrap_or(0)))
    }

    // ===== 保留期清理 =====

    pub async fn delete_processed_events_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;
        let result = self
            .retrying("delete_processed_events_before", || {
                analytics_event::Entity::delete_many()
                    .filter(analytics_event::Column::CreatedAt.lt(cutoff))
                    .filter(analytics_event::Column::Processed.eq(true))
                    .exec(db)
            })
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_activities_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;
        let result = self
            .retrying("delete_activities_before", || {
                user_activity::Entity::delete_many()
                    .filter(user_activity::Column::SessionStart.lt(cutoff))
                    .exec(db)
            })
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_search_queries_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;
        let result = self
            .retrying("delete_search_queries_before", || {
                search_query::Entity::delete_many()
                    .filter(search_query::Column::CreatedAt.lt(cutoff))
                    .exec(db)
            })
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_label_expr_per_backend() {
        let render = |backend| {
            let expr = day_label_expr(backend, "created_at");
            format!("{:?}", expr)
        };
        assert!(render(DbBackend::Sqlite).contains("strftime"));
        assert!(render(DbBackend::MySql).contains("DATE_FORMAT"));
        assert!(render(DbBackend::Postgres).contains("TO_CHAR"));
    }
}
