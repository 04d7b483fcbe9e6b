use chrono::Utc;
use sea_orm::{ActiveValue, Set};
use tracing::{debug, warn};

use super::{ActivityKind, NewEvent};
use crate::errors::Result;
use crate::storage::SeaOrmStorage;
use migration::entities::{search_query, user_activity};

/// 一次搜索的记录
#[derive(Debug, Clone, Default)]
pub struct SearchRecord {
    pub query: String,
    pub results_count: i64,
    pub response_time_ms: i64,
    pub user_identifier: String,
    pub ip_address: Option<String>,
}

/// 事件落地的目标
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    /// 批量写入事件并更新会话活动，返回写入条数
    async fn write_events(&self, events: Vec<NewEvent>) -> Result<usize>;

    async fn record_search(&self, search: SearchRecord) -> Result<()>;
}

#[async_trait::async_trait]
impl EventSink for SeaOrmStorage {
    async fn write_events(&self, events: Vec<NewEvent>) -> Result<usize> {
        let models = events.iter().map(NewEvent::to_active_model).collect();
        let written = self.insert_events(models).await?;

        // 会话活动只对带 IP 的事件记录
        for event in &events {
            let (Some(kind), Some(ip)) = (event.event_type.activity(), event.ip_address.as_deref())
            else {
                continue;
            };
            if let Err(e) = track_user_activity(
                self,
                &event.user_identifier,
                ip,
                &event.user_agent,
                &event.session_id,
                kind,
            )
            .await
            {
                warn!(
                    "Failed to update activity for {}: {}",
                    event.user_identifier, e
                );
            }
        }
        Ok(written)
    }

    async fn record_search(&self, search: SearchRecord) -> Result<()> {
        let model = search_query::ActiveModel {
            query: Set(search.query),
            user_identifier: Set(search.user_identifier),
            ip_address: Set(search.ip_address),
            results_count: Set(search.results_count),
            response_time: Set(search.response_time_ms),
            clicked_result_id: Set(None),
            clicked_position: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        self.insert_search_query(model).await?;
        Ok(())
    }
}

/// 按 (用户, IP, 会话) 找到或创建会话，并累加对应计数器
pub async fn track_user_activity(
    storage: &SeaOrmStorage,
    user_identifier: &str,
    ip: &str,
    user_agent: &str,
    session_id: &str,
    kind: ActivityKind,
) -> Result<user_activity::Model> {
    let now = Utc::now();
    let existing = storage
        .find_activity(user_identifier, ip, session_id)
        .await?;

    let mut model: user_activity::ActiveModel = match existing {
        Some(activity) => {
            let duration = (now - activity.session_start).num_seconds().max(0);
            let mut model: user_activity::ActiveModel = activity.into();
            model.last_activity = Set(now);
            model.session_duration = Set(duration);
            model
        }
        None => {
            debug!("New activity session for {} from {}", user_identifier, ip);
            user_activity::ActiveModel {
                user_identifier: Set(user_identifier.to_string()),
                ip_address: Set(ip.to_string()),
                session_id: Set(session_id.to_string()),
                user_agent: Set(user_agent.to_string()),
                session_start: Set(now),
                last_activity: Set(now),
                session_duration: Set(0),
                pages_visited: Set(0),
                comments_posted: Set(0),
                files_uploaded: Set(0),
                likes_given: Set(0),
                searches_performed: Set(0),
                ..Default::default()
            }
        }
    };

    let counter = match kind {
        ActivityKind::PageView => &mut model.pages_visited,
        ActivityKind::Comment => &mut model.comments_posted,
        ActivityKind::FileUpload => &mut model.files_uploaded,
        ActivityKind::Like => &mut model.likes_given,
        ActivityKind::Search => &mut model.searches_performed,
    };
    let current = match counter {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => *v,
        ActiveValue::NotSet => 0,
    };
    *counter = Set(current + 1);

    storage.save_activity(model).await
}
