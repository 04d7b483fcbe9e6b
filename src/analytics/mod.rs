//! 事件分析
//!
//! - `tracker`：请求路径上的非阻塞事件采集（mpsc + 后台写入）
//! - `rollup`：事件汇总到每日统计与热门内容
//! - `retention`：过期数据清理
//! - `reports`：管理后台的各类报表

pub mod reports;
pub mod retention;
pub mod rollup;
pub mod sink;
pub mod tracker;

pub use reports::AnalyticsReports;
pub use retention::{CleanupReport, DataRetentionTask};
pub use rollup::{RollupManager, popularity_score};
pub use sink::EventSink;
pub use tracker::EventTracker;

use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

use crate::services::ClientInfo;
use crate::utils::truncate_chars;
use migration::entities::analytics_event;

const USER_AGENT_MAX_CHARS: usize = 500;
const REFERER_MAX_CHARS: usize = 200;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    CommentCreated,
    CommentLiked,
    CommentReplied,
    FileUploaded,
    UserRegistered,
    UserLogin,
    PageView,
    SearchPerformed,
    ErrorOccurred,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CommentCreated => "comment_created",
            EventType::CommentLiked => "comment_liked",
            EventType::CommentReplied => "comment_replied",
            EventType::FileUploaded => "file_uploaded",
            EventType::UserRegistered => "user_registered",
            EventType::UserLogin => "user_login",
            EventType::PageView => "page_view",
            EventType::SearchPerformed => "search_performed",
            EventType::ErrorOccurred => "error_occurred",
        }
    }

    /// 该事件对应的会话计数器（没有对应计数器的事件返回 None）
    pub fn activity(&self) -> Option<ActivityKind> {
        match self {
            EventType::CommentCreated | EventType::CommentReplied => Some(ActivityKind::Comment),
            EventType::CommentLiked => Some(ActivityKind::Like),
            EventType::FileUploaded => Some(ActivityKind::FileUpload),
            EventType::PageView => Some(ActivityKind::PageView),
            EventType::SearchPerformed => Some(ActivityKind::Search),
            EventType::UserRegistered | EventType::UserLogin | EventType::ErrorOccurred => None,
        }
    }
}

/// `user_activities` 中递增的计数器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    PageView,
    Comment,
    FileUpload,
    Like,
    Search,
}

/// 待写入的分析事件
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub content_type: Option<String>,
    pub object_id: Option<i64>,
    pub user_identifier: String,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub referer: String,
    pub session_id: String,
    pub event_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            content_type: None,
            object_id: None,
            user_identifier: String::new(),
            ip_address: None,
            user_agent: String::new(),
            referer: String::new(),
            session_id: String::new(),
            event_data: serde_json::Value::Object(Default::default()),
            created_at: Utc::now(),
        }
    }

    /// 关联的对象（如 `comment` / `file`）
    pub fn with_object(mut self, content_type: &str, object_id: i64) -> Self {
        self.content_type = Some(content_type.to_string());
        self.object_id = Some(object_id);
        self
    }

    pub fn with_client(mut self, client: &ClientInfo) -> Self {
        self.user_identifier = client.user_identifier.clone();
        self.ip_address = client.ip.clone();
        self.user_agent = truncate_chars(&client.user_agent, USER_AGENT_MAX_CHARS);
        self.referer = truncate_chars(&client.referer, REFERER_MAX_CHARS);
        self.session_id = client.session_id.clone();
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.event_data = data;
        self
    }

    pub(crate) fn to_active_model(&self) -> analytics_event::ActiveModel {
        analytics_event::ActiveModel {
            event_type: Set(self.event_type.as_str().to_string()),
            content_type: Set(self.content_type.clone()),
            object_id: Set(self.object_id),
            user_identifier: Set(self.user_identifier.clone()),
            ip_address: Set(self.ip_address.clone()),
            user_agent: Set(self.user_agent.clone()),
            referer: Set(self.referer.clone()),
            event_data: Set(self.event_data.to_string()),
            created_at: Set(self.created_at),
            processed: Set(false),
            ..Default::default()
        }
    }
}
