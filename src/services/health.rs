//! Liveness / readiness checks
//!
//! Talks to storage directly: health checks must stay cheap and must not depend
//! on the comment or file services.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, trace};

use crate::analytics::reports::format_duration;
use crate::storage::SeaOrmStorage;

const STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_UNHEALTHY: &str = "unhealthy";

#[derive(Debug, Clone, Serialize)]
pub struct StorageCheck {
    pub status: &'static str,
    pub backend: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub storage: StorageCheck,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// 运行秒数
    pub uptime: u64,
    pub uptime_display: String,
    pub checks: HealthChecks,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == STATUS_HEALTHY
    }
}

pub struct HealthService {
    storage: Arc<SeaOrmStorage>,
    started_at: DateTime<Utc>,
}

impl HealthService {
    pub fn new(storage: Arc<SeaOrmStorage>, started_at: DateTime<Utc>) -> Self {
        Self {
            storage,
            started_at,
        }
    }

    async fn check_storage(&self) -> StorageCheck {
        let started = Instant::now();
        let outcome = tokio::time::timeout(STORAGE_TIMEOUT, self.storage.ping()).await;
        let response_time_ms = started.elapsed().as_millis() as u64;
        let backend = self.storage.backend_name().to_string();

        match outcome {
            Ok(Ok(())) => {
                trace!("Storage ping ok in {} ms", response_time_ms);
                StorageCheck {
                    status: STATUS_HEALTHY,
                    backend,
                    response_time_ms,
                    error: None,
                }
            }
            Ok(Err(e)) => {
                error!("Storage health check failed: {}", e);
                StorageCheck {
                    status: STATUS_UNHEALTHY,
                    backend,
                    response_time_ms,
                    error: Some(format!("database error: {}", e)),
                }
            }
            Err(_) => {
                error!("Storage health check timeout");
                StorageCheck {
                    status: STATUS_UNHEALTHY,
                    backend,
                    response_time_ms,
                    error: Some("timeout".to_string()),
                }
            }
        }
    }

    pub async fn check(&self) -> HealthStatus {
        let storage = self.check_storage().await;
        let now = Utc::now();
        let uptime = (now - self.started_at).num_seconds().max(0);

        HealthStatus {
            status: storage.status,
            timestamp: now,
            uptime: uptime as u64,
            uptime_display: format_duration(uptime),
            checks: HealthChecks { storage },
        }
    }

    /// 就绪：存储可用
    pub async fn is_ready(&self) -> bool {
        self.check_storage().await.status == STATUS_HEALTHY
    }
}
