//! Analytics API 端点
//!
//! 除 `popular` 外均需 staff 权限（由路由上的 `JwtAuth::staff()` 保证）。

use std::sync::Arc;

use actix_web::{Responder, Result as ActixResult, web};
use chrono::Utc;
use tracing::info;

use crate::analytics::reports::{
    DailyStatsView, ExportKind, dashboard_days, realtime_minutes, search_days,
};
use crate::analytics::rollup::CONTENT_COMMENT;
use crate::analytics::{AnalyticsReports, RollupManager};
use crate::api::middleware::AuthUser;
use crate::errors::Result;

use super::helpers::{api_result, binary_response, error_from_commentary};
use super::types::{
    ActivityQuery, DaysQuery, EventsQuery, ExportQuery, HoursQuery, MinutesQuery, PopularQuery,
    window, windows,
};

pub async fn dashboard(
    query: web::Query<DaysQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(reports.dashboard(dashboard_days(query.days)).await))
}

pub async fn realtime(
    query: web::Query<MinutesQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        reports.realtime(realtime_minutes(query.minutes)).await,
    ))
}

pub async fn system_health(
    query: web::Query<HoursQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    let hours = window(query.hours, windows::DEFAULT_HOURS, windows::MAX_HOURS);
    Ok(api_result(reports.system_health(hours).await))
}

pub async fn daily_stats(
    query: web::Query<DaysQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    let days = window(query.days, windows::DEFAULT_DAILY_DAYS, windows::MAX_DAYS);
    Ok(api_result(reports.daily_stats(days).await))
}

pub async fn events(
    query: web::Query<EventsQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    let query = query.into_inner();
    let hours = window(query.hours, windows::DEFAULT_HOURS, windows::MAX_HOURS);
    let event_type = query.event_type.filter(|s| !s.trim().is_empty());
    let user = query.user.filter(|s| !s.trim().is_empty());
    Ok(api_result(reports.events(event_type, user, hours).await))
}

pub async fn activity(
    query: web::Query<ActivityQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    let days = window(query.days, windows::DEFAULT_ACTIVITY_DAYS, windows::MAX_DAYS);
    let user = query.user.as_deref().filter(|s| !s.trim().is_empty());
    Ok(api_result(reports.activity(user, days).await))
}

/// 热门内容（公开）
pub async fn popular(
    query: web::Query<PopularQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    let content_type = query
        .content_type
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(CONTENT_COMMENT);
    let days = window(query.days, windows::DEFAULT_POPULAR_DAYS, windows::MAX_DAYS);
    Ok(api_result(reports.popular_list(content_type, days).await))
}

pub async fn search(
    query: web::Query<DaysQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        reports.search_analytics(search_days(query.days)).await,
    ))
}

pub async fn user_statistics(
    path: web::Path<String>,
    query: web::Query<DaysQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    let days = window(query.days, windows::DEFAULT_USER_DAYS, windows::MAX_DAYS);
    Ok(api_result(
        reports.user_statistics(&path.into_inner(), days).await,
    ))
}

/// CSV 导出
pub async fn export(
    query: web::Query<ExportQuery>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    let kind = match ExportKind::parse(query.export_type.as_deref()) {
        Ok(kind) => kind,
        Err(e) => return Ok(error_from_commentary(&e)),
    };
    let days = window(query.days, windows::DEFAULT_EXPORT_DAYS, windows::MAX_DAYS);
    Ok(match reports.export_csv(kind, days).await {
        Ok(export) => {
            info!("API: exported {}", export.filename);
            binary_response(
                "text/csv; charset=utf-8",
                export.body,
                Some(&export.filename),
            )
        }
        Err(e) => error_from_commentary(&e),
    })
}

async fn run_rollup(rollup: &RollupManager) -> Result<DailyStatsView> {
    let row = rollup.update_daily_stats(Utc::now().date_naive()).await?;
    rollup.update_popular_content().await?;
    Ok(DailyStatsView::from(row))
}

/// 手动触发当天汇总
pub async fn trigger_rollup(
    staff: AuthUser,
    rollup: web::Data<Arc<RollupManager>>,
    reports: web::Data<Arc<AnalyticsReports>>,
) -> ActixResult<impl Responder> {
    info!("API: {} triggered analytics rollup", staff.username);
    let result = run_rollup(&rollup).await;
    if result.is_ok() {
        reports.invalidate();
    }
    Ok(api_result(result))
}
