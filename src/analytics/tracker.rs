//! 事件采集器
//!
//! 请求处理路径只做 `try_send`，真正的写库由后台任务批量完成。
//! 通道满时直接丢弃事件并计数，不阻塞请求。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::sink::{EventSink, SearchRecord};
use super::{EventType, NewEvent};
use crate::errors::Result;
use crate::services::ClientInfo;

/// 每次写库的最大事件数
const WRITE_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct EventTracker {
    /// 关闭采集时为 None
    tx: Option<mpsc::Sender<NewEvent>>,
    sink: Arc<dyn EventSink>,
    shutdown: Arc<Notify>,
    dropped: Arc<AtomicU64>,
}

impl EventTracker {
    /// 创建采集器并启动后台写入任务
    pub fn spawn(sink: Arc<dyn EventSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(run_writer(rx, sink.clone(), shutdown.clone()));
        let tracker = Self {
            tx: Some(tx),
            sink,
            shutdown,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (tracker, handle)
    }

    /// 不采集事件的实例（`analytics.enabled = false`）
    pub fn disabled(sink: Arc<dyn EventSink>) -> Self {
        Self {
            tx: None,
            sink,
            shutdown: Arc::new(Notify::new()),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// 非阻塞投递
    pub fn track(&self, event: NewEvent) {
        let Some(ref tx) = self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "Analytics channel full, dropping {} event (total dropped: {})",
                    event.event_type.as_str(),
                    dropped
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(
                    "Analytics writer stopped, discarding {} event",
                    event.event_type.as_str()
                );
            }
        }
    }

    /// 便捷方法：带请求信息与关联对象的事件
    pub fn track_object(
        &self,
        event_type: EventType,
        client: &ClientInfo,
        content_type: &str,
        object_id: i64,
        data: serde_json::Value,
    ) {
        self.track(
            NewEvent::new(event_type)
                .with_client(client)
                .with_object(content_type, object_id)
                .with_data(data),
        );
    }

    /// 同步写入（CLI 与测试使用）
    pub async fn track_blocking(&self, event: NewEvent) -> Result<()> {
        self.sink.write_events(vec![event]).await?;
        Ok(())
    }

    /// 记录一次搜索，同时投递 `search_performed` 事件
    pub async fn track_search_query(
        &self,
        query: &str,
        results_count: i64,
        response_time_ms: i64,
        client: &ClientInfo,
    ) {
        if !self.is_enabled() {
            return;
        }
        let record = SearchRecord {
            query: query.to_string(),
            results_count,
            response_time_ms,
            user_identifier: client.user_identifier.clone(),
            ip_address: client.ip.clone(),
        };
        if let Err(e) = self.sink.record_search(record).await {
            warn!("Failed to record search query '{}': {}", query, e);
        }
        self.track(
            NewEvent::new(EventType::SearchPerformed)
                .with_client(client)
                .with_data(serde_json::json!({
                    "query": query,
                    "results_count": results_count,
                })),
        );
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// 通知后台任务写完缓冲区后退出
    pub async fn shutdown(&self, handle: JoinHandle<()>) {
        self.shutdown.notify_one();
        if let Err(e) = handle.await {
            error!("Analytics writer task panicked: {}", e);
        }
    }
}

async fn run_writer(
    mut rx: mpsc::Receiver<NewEvent>,
    sink: Arc<dyn EventSink>,
    shutdown: Arc<Notify>,
) {
    debug!("Analytics writer started");
    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(first) = received else { break };
                let mut batch = Vec::with_capacity(WRITE_BATCH_SIZE);
                batch.push(first);
                while batch.len() < WRITE_BATCH_SIZE {
                    match rx.try_recv() {
                        Ok(event) => batch.push(event),
                        Err(_) => break,
                    }
                }
                write_batch(sink.as_ref(), batch).await;
            }
            _ = shutdown.notified() => {
                rx.close();
                let mut remaining = Vec::new();
                while let Some(event) = rx.recv().await {
                    remaining.push(event);
                }
                let count = remaining.len();
                for chunk in remaining.chunks(WRITE_BATCH_SIZE) {
                    write_batch(sink.as_ref(), chunk.to_vec()).await;
                }
                info!("Analytics writer drained {} pending events", count);
                break;
            }
        }
    }
    debug!("Analytics writer stopped");
}

async fn write_batch(sink: &dyn EventSink, batch: Vec<NewEvent>) {
    let size = batch.len();
    let start = Instant::now();
    match sink.write_events(batch).await {
        Ok(written) => trace!(
            "Wrote {} analytics events in {:?}",
            written,
            start.elapsed()
        ),
        Err(e) => error!("Failed to write {} analytics events: {}", size, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<NewEvent>>,
        searches: Mutex<Vec<SearchRecord>>,
    }

    #[async_trait::async_trait]
    impl EventSink for RecordingSink {
        async fn write_events(&self, events: Vec<NewEvent>) -> Result<usize> {
            let n = events.len();
            self.events.lock().unwrap().extend(events);
            Ok(n)
        }

        async fn record_search(&self, search: SearchRecord) -> Result<()> {
            self.searches.lock().unwrap().push(search);
            Ok(())
        }
    }

    fn client() -> ClientInfo {
        ClientInfo {
            ip: Some("127.0.0.1".into()),
            user_agent: "test".into(),
            referer: String::new(),
            user_identifier: "alice".into(),
            session_id: "s".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_events_are_written_on_shutdown() {
        let sink = Arc::new(RecordingSink::default());
        let (tracker, handle) = EventTracker::spawn(sink.clone(), 16);

        for _ in 0..5 {
            tracker.track(NewEvent::new(EventType::PageView).with_client(&client()));
        }
        tracker.shutdown(handle).await;

        assert_eq!(sink.events.lock().unwrap().len(), 5);
        assert_eq!(tracker.dropped_events(), 0);
    }

    #[tokio::test]
    async fn test_full_channel_drops_events() {
        let sink = Arc::new(RecordingSink::default());
        // 不启动写入任务，通道容量 1
        let (tx, _rx) = mpsc::channel(1);
        let tracker = EventTracker {
            tx: Some(tx),
            sink: sink.clone(),
            shutdown: Arc::new(Notify::new()),
            dropped: Arc::new(AtomicU64::new(0)),
        };

        tracker.track(NewEvent::new(EventType::PageView));
        tracker.track(NewEvent::new(EventType::PageView));
        tracker.track(NewEvent::new(EventType::PageView));
        assert_eq!(tracker.dropped_events(), 2);
    }

    #[tokio::test]
    async fn test_disabled_tracker_ignores_events() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = EventTracker::disabled(sink.clone());
        tracker.track(NewEvent::new(EventType::UserLogin));
        tracker.track_search_query("rust", 3, 12, &client()).await;
        assert!(sink.events.lock().unwrap().is_empty());
        assert!(sink.searches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_track_search_query_records_and_enqueues() {
        let sink = Arc::new(RecordingSink::default());
        let (tracker, handle) = EventTracker::spawn(sink.clone(), 16);
        tracker.track_search_query("rust", 3, 12, &client()).await;
        tracker.shutdown(handle).await;

        let searches = sink.searches.lock().unwrap();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].results_count, 3);
        let events = sink.events.lock().unwrap();
        assert_eq!(events[0].event_type, EventType::SearchPerformed);
    }

    #[tokio::test]
    async fn test_track_blocking_bypasses_channel() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = EventTracker::disabled(sink.clone());
        tracker
            .track_blocking(NewEvent::new(EventType::ErrorOccurred))
            .await
            .unwrap();
        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }
}
