use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info};

use crate::analytics::EventTracker;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 单个任务超时时间（秒）
const TASK_TIMEOUT_SECS: u64 = 10;

/// HTTP 服务停止后需要收尾的后台资源
pub struct ShutdownHandles {
    pub tracker: EventTracker,
    pub tracker_handle: Option<JoinHandle<()>>,
    pub background_tasks: Vec<JoinHandle<()>>,
}

/// 停止周期任务并写完事件缓冲区
pub async fn perform_shutdown(handles: ShutdownHandles) {
    info!("Server stopped, flushing data...");

    let result = timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        perform_shutdown_tasks(handles),
    )
    .await;

    match result {
        Ok(()) => info!("All shutdown tasks completed successfully"),
        Err(_) => error!(
            "Shutdown tasks timed out after {} seconds",
            SHUTDOWN_TIMEOUT_SECS
        ),
    }
}

async fn perform_shutdown_tasks(handles: ShutdownHandles) {
    for task in &handles.background_tasks {
        task.abort();
    }

    let Some(writer) = handles.tracker_handle else {
        info!("Event tracker is disabled, skipping flush");
        return;
    };

    let dropped = handles.tracker.dropped_events();
    match timeout(
        Duration::from_secs(TASK_TIMEOUT_SECS),
        handles.tracker.shutdown(writer),
    )
    .await
    {
        Ok(()) => info!(
            "Analytics events flushed successfully ({} dropped while running)",
            dropped
        ),
        Err(_) => error!(
            "Analytics flush timed out after {} seconds",
            TASK_TIMEOUT_SECS
        ),
    }
}
