//! Service layer for business logic
//!
//! HTTP handlers, the CLI and background tasks all go through these
//! services; none of them talk to storage directly.

pub mod captcha;
mod comment_service;
pub mod file_service;
pub mod health;
pub mod sanitizer;
pub mod spam;
mod user_service;

pub use captcha::{CaptchaChallenge, CaptchaService};
pub use comment_service::*;
pub use file_service::{FileService, UploadResult};
pub use health::{HealthService, HealthStatus};
pub use user_service::*;

use chrono::Utc;
use serde::Serialize;

/// 请求方信息，用于审计字段与事件采集
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: String,
    pub referer: String,
    /// 已登录用户的用户名
    pub username: Option<String>,
    /// 登录用户名，匿名时为 IP
    pub user_identifier: String,
    pub session_id: String,
}

impl ClientInfo {
    /// 客户端未提供会话 ID 时，按 IP + UA + UTC 日期派生一个
    pub fn derive_session_id(ip: Option<&str>, user_agent: &str) -> String {
        let seed = format!(
            "{}|{}|{}",
            ip.unwrap_or("unknown"),
            user_agent,
            Utc::now().date_naive()
        );
        format!("{:x}", md5::compute(seed.as_bytes()))
    }

    pub fn ip_or_unknown(&self) -> &str {
        self.ip.as_deref().unwrap_or("unknown")
    }

    /// 事件归属：登录用户名优先，其次 IP，都没有时为 anonymous
    pub fn actor(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.ip.clone())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.count.div_ceil(self.page_size)
        }
    }
}

/// 上传的原始文件
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub data: bytes::Bytes,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, data: impl Into<bytes::Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_session_id_is_stable_per_client() {
        let a = ClientInfo::derive_session_id(Some("1.2.3.4"), "ua");
        let b = ClientInfo::derive_session_id(Some("1.2.3.4"), "ua");
        let c = ClientInfo::derive_session_id(Some("1.2.3.5"), "ua");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_actor_prefers_username() {
        let mut client = ClientInfo {
            ip: Some("203.0.113.9".to_string()),
            user_agent: String::new(),
            referer: String::new(),
            username: Some("alice".to_string()),
            user_identifier: "alice".to_string(),
            session_id: String::new(),
        };
        assert_eq!(client.actor(), "alice");
        client.username = None;
        assert_eq!(client.actor(), "203.0.113.9");
        client.ip = None;
        assert_eq!(client.actor(), "anonymous");
    }

    #[test]
    fn test_page_total_pages() {
        let page: Page<i32> = Page {
            count: 51,
            page: 1,
            page_size: 25,
            results: vec![],
        };
        assert_eq!(page.total_pages(), 3);
    }
}
