use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::analytics::{
    AnalyticsReports, DataRetentionTask, EventSink, EventTracker, RollupManager,
};
use crate::api::jwt::get_jwt_service;
use crate::config::{StaticConfig, get_config};
use crate::services::{CaptchaService, CommentService, FileService, HealthService, UserService};
use crate::storage::{SeaOrmStorage, StorageFactory};

/// 验证码清理间隔
const CAPTCHA_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// 数据保留清理间隔（小时）
const RETENTION_INTERVAL_HOURS: u64 = 24;

/// 所有 HTTP handler 共享的服务实例
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub comments: Arc<CommentService>,
    pub users: Arc<UserService>,
    pub files: Arc<FileService>,
    pub captcha: Arc<CaptchaService>,
    pub reports: Arc<AnalyticsReports>,
    pub rollup: Arc<RollupManager>,
    pub health: Arc<HealthService>,
}

impl AppServices {
    pub fn build(
        storage: Arc<SeaOrmStorage>,
        tracker: EventTracker,
        config: &StaticConfig,
        started_at: DateTime<Utc>,
    ) -> Self {
        let captcha = Arc::new(CaptchaService::new(storage.clone()));
        let files = Arc::new(FileService::new(
            storage.clone(),
            tracker.clone(),
            config.uploads.clone(),
        ));
        let users = Arc::new(UserService::new(
            storage.clone(),
            tracker.clone(),
            get_jwt_service(),
        ));
        let comments = Arc::new(CommentService::new(
            storage.clone(),
            tracker,
            captcha.clone(),
            files.clone(),
            users.clone(),
            config.comments.clone(),
        ));

        Self {
            comments,
            users,
            files,
            captcha,
            reports: Arc::new(AnalyticsReports::new(storage.clone())),
            rollup: Arc::new(RollupManager::new(storage.clone())),
            health: Arc::new(HealthService::new(storage.clone(), started_at)),
            storage,
        }
    }
}

pub struct StartupContext {
    pub services: AppServices,
    pub tracker: EventTracker,
    /// 事件写入任务，关闭时等待其写完缓冲区
    pub tracker_handle: Option<JoinHandle<()>>,
    pub background_tasks: Vec<JoinHandle<()>>,
}

/// 按配置启动事件采集器
pub fn start_event_tracker(
    storage: Arc<SeaOrmStorage>,
    config: &StaticConfig,
) -> (EventTracker, Option<JoinHandle<()>>) {
    let sink: Arc<dyn EventSink> = storage;
    if config.analytics.enabled {
        let (tracker, handle) = EventTracker::spawn(sink, config.analytics.channel_capacity);
        debug!(
            "Event tracker started with channel capacity {}",
            config.analytics.channel_capacity
        );
        (tracker, Some(handle))
    } else {
        warn!("Analytics tracking is disabled in configuration");
        (EventTracker::disabled(sink), None)
    }
}

fn spawn_captcha_cleanup(captcha: Arc<CaptchaService>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CAPTCHA_CLEANUP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = captcha.cleanup_expired().await {
                error!("CAPTCHA cleanup failed: {}", e);
            }
        }
    })
}

fn spawn_background_tasks(services: &AppServices, config: &StaticConfig) -> Vec<JoinHandle<()>> {
    let mut tasks = vec![spawn_captcha_cleanup(services.captcha.clone())];

    if config.analytics.enabled {
        tasks.push(
            services
                .rollup
                .clone()
                .spawn_background_task(config.analytics.rollup_interval_secs),
        );
        let retention = Arc::new(DataRetentionTask::new(
            services.storage.clone(),
            &config.analytics,
        ));
        tasks.push(retention.spawn_background_task(RETENTION_INTERVAL_HOURS));
    } else {
        debug!("Analytics rollup and data retention are disabled");
    }

    tasks
}

fn check_security_settings(config: &StaticConfig) {
    if config.auth.jwt_secret.is_empty() {
        warn!(
            "WARNING: auth.jwt_secret is not set. \
            Tokens will be invalidated on every restart."
        );
    } else if config.auth.jwt_secret.len() < 32 {
        warn!(
            "WARNING: JWT Secret is too short ({} bytes). \
            Recommended minimum is 32 bytes for security.",
            config.auth.jwt_secret.len()
        );
    }

    if !config.rate_limits.enabled {
        warn!("Rate limiting is disabled");
    }
}

/// 准备服务器启动的上下文
/// 包括存储（含迁移）、事件采集、服务实例和后台任务
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let config = get_config();
    check_security_settings(&config);

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    if let Err(e) = tokio::fs::create_dir_all(&config.uploads.media_root).await {
        warn!(
            "Failed to create media root '{}': {}",
            config.uploads.media_root, e
        );
    }

    let (tracker, tracker_handle) = start_event_tracker(storage.clone(), &config);
    let services = AppServices::build(storage, tracker.clone(), &config, Utc::now());
    let background_tasks = spawn_background_tasks(&services, &config);

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        services,
        tracker,
        tracker_handle,
        background_tasks,
    })
}
