//! `/health` 探针端点

use std::sync::Arc;
use std::time::Instant;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use tracing::{info, trace, warn};

use crate::services::HealthService;

use super::error_code::ErrorCode;
use super::helpers::json_response;

pub async fn health_check(health: web::Data<Arc<HealthService>>) -> impl Responder {
    let started = Instant::now();
    trace!("Received health check request");

    let status = health.check().await;
    let healthy = status.is_healthy();

    info!(
        "Health check completed in {:?}, status: {}, uptime: {}",
        started.elapsed(),
        status.status,
        status.uptime_display
    );

    if healthy {
        json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(status))
    } else {
        json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ServiceUnavailable,
            "Service Unavailable",
            Some(status),
        )
    }
}

/// 就绪：存储可用时 200
pub async fn readiness_check(health: web::Data<Arc<HealthService>>) -> impl Responder {
    trace!("Received readiness check request");
    if health.is_ready().await {
        HttpResponse::Ok()
            .append_header(("Content-Type", "text/plain"))
            .body("OK")
    } else {
        warn!("Readiness check failed: storage unavailable");
        HttpResponse::ServiceUnavailable()
            .append_header(("Content-Type", "text/plain"))
            .body("Service Unavailable")
    }
}

/// 存活：进程能响应即可
pub async fn liveness_check() -> impl Responder {
    trace!("Received liveness check request");
    HttpResponse::NoContent().finish()
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(health_check))
        .route("", web::head().to(health_check))
        .route("/ready", web::get().to(readiness_check))
        .route("/ready", web::head().to(readiness_check))
        .route("/live", web::get().to(liveness_check))
        .route("/live", web::head().to(liveness_check))
}
