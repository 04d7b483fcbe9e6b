//! Server mode
//!
//! Builds the service graph, mounts `/health` and the API scope, and runs the
//! HTTP server until it is stopped by a signal.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    http::{Method, header},
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use tracing::{error, warn};

use crate::api::middleware::{RequestIdMiddleware, TimingMiddleware};
use crate::api::services::{ApiRateLimits, api_routes, health_routes};
use crate::config::{ServerConfig, get_config};
use crate::runtime::lifetime::shutdown::{ShutdownHandles, perform_shutdown};
use crate::runtime::lifetime::startup::{AppServices, prepare_server_startup};

/// actix 优雅停机等待时间
const GRACEFUL_SHUTDOWN_SECS: u64 = 30;

/// 启动时检查 CORS 配置（只运行一次）
fn validate_cors_config(server: &ServerConfig) {
    if server.cors_allowed_origins.is_empty() {
        warn!(
            "CORS allowed origins is empty. \
            No cross-origin requests will be allowed."
        );
    } else if server.cors_allowed_origins.iter().any(|o| o == "*") {
        warn!("CORS allows any origin");
    }
}

/// Build CORS middleware from configuration
pub fn build_cors_middleware(server: &ServerConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allowed_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allowed_header("X-Session-Id")
        .expose_headers(["X-Request-Id"])
        .max_age(3600);

    if server.cors_allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &server.cors_allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }
    cors
}

/// 注册服务实例与全部路由
///
/// 测试中用同一份配置搭建 `App`。
pub fn configure_app(
    cfg: &mut web::ServiceConfig,
    services: &AppServices,
    limits: &ApiRateLimits,
    api_prefix: &str,
) {
    cfg.app_data(web::Data::new(services.storage.clone()))
        .app_data(web::Data::new(services.comments.clone()))
        .app_data(web::Data::new(services.users.clone()))
        .app_data(web::Data::new(services.files.clone()))
        .app_data(web::Data::new(services.captcha.clone()))
        .app_data(web::Data::new(services.reports.clone()))
        .app_data(web::Data::new(services.rollup.clone()))
        .app_data(web::Data::new(services.health.clone()))
        .service(health_routes())
        .service(api_routes(api_prefix, limits));
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let startup = prepare_server_startup().await.map_err(|e| {
        error!("Server startup failed: {}", e);
        e
    })?;

    let config = get_config();
    let server_config = config.server.clone();
    validate_cors_config(&server_config);

    if server_config.trusted_proxies.is_empty() {
        warn!(
            "No trusted proxies configured. \
             X-Forwarded-For is only honoured for connections from private IPs."
        );
    } else {
        warn!(
            "Explicit trusted proxies configured: {:?}",
            server_config.trusted_proxies
        );
    }

    // 限流状态必须在 worker 之间共享，只构建一次
    let limits = ApiRateLimits::from_config(&config.rate_limits);
    let services = startup.services.clone();
    let api_prefix = server_config.api_prefix.clone();
    let cors_config = server_config.clone();
    let cpu_count = server_config.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TimingMiddleware::new(&api_prefix)) // 最外层，记录请求延迟
            .wrap(RequestIdMiddleware) // 为每个请求生成 request_id
            .wrap(build_cors_middleware(&cors_config))
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .configure(|cfg| configure_app(cfg, &services, &limits, &api_prefix))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .shutdown_timeout(GRACEFUL_SHUTDOWN_SECS)
    .workers(cpu_count);

    let bind_address = format!("{}:{}", server_config.host, server_config.port);
    warn!("Starting server at http://{}", bind_address);

    // actix 自带 SIGINT/SIGTERM 处理：停止接收新连接并等待在途请求完成
    let result = server.bind(bind_address)?.run().await;

    perform_shutdown(ShutdownHandles {
        tracker: startup.tracker,
        tracker_handle: startup.tracker_handle,
        background_tasks: startup.background_tasks,
    })
    .await;

    result?;
    Ok(())
}
