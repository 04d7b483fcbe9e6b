//! API 请求与响应类型
//!
//! 请求体 / 查询参数在这里反序列化，再转换为 service 层的纯数据结构。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::{TS_EXPORT_PATH, get_config};
use crate::errors::{CommentaryError, Result};
use crate::services::{
    NewComment, PasswordChange, PreferencesUpdate, ProfileUpdate, RegisterRequest,
};
use crate::services::file_service::MAX_BULK_FILES;
use crate::storage::{CommentFilter, CommentOrdering, FileFilter, FileOrdering};

use super::helpers::MultipartLimits;

/// 文件列表默认每页条数
pub const FILE_PAGE_SIZE: u64 = 20;
pub const FILE_MAX_PAGE_SIZE: u64 = 100;

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 解析日期时间参数：RFC3339 或 `YYYY-MM-DD`（当天 00:00 UTC）
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|_| CommentaryError::validation(format!("Enter a valid date/time: {}", raw)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ============ 评论 ============

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CommentListQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub min_likes: Option<i64>,
    pub has_replies: Option<bool>,
    pub has_files: Option<bool>,
    pub text_contains: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl CommentListQuery {
    pub fn filter(&self) -> Result<CommentFilter> {
        Ok(CommentFilter {
            user_name: non_blank(self.user_name.clone()),
            email: non_blank(self.email.clone()),
            created_after: self
                .created_after
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
            created_before: self
                .created_before
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
            min_likes: self.min_likes,
            has_replies: self.has_replies,
            has_files: self.has_files,
            text_contains: non_blank(self.text_contains.clone()),
            search: non_blank(self.search.clone()),
        })
    }

    pub fn ordering(&self) -> CommentOrdering {
        CommentOrdering::parse(self.ordering.as_deref())
    }
}

/// 创建评论 / 回复（JSON 或 multipart 文本字段）
#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    pub home_page: Option<String>,
    #[serde(default)]
    pub text: String,
    pub parent: Option<i64>,
    #[serde(default)]
    pub captcha_token: String,
    #[serde(default)]
    pub captcha_solution: String,
}

impl CreateCommentRequest {
    /// 从 multipart 文本字段组装
    pub fn from_fields(fields: &std::collections::HashMap<String, String>) -> Result<Self> {
        let text = |name: &str| fields.get(name).cloned().unwrap_or_default();
        let parent = match fields.get("parent").map(|s| s.trim()) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                CommentaryError::validation("Parent must be a valid comment id")
            })?),
        };
        Ok(Self {
            user_name: text("user_name"),
            email: text("email"),
            home_page: fields.get("home_page").cloned(),
            text: text("text"),
            parent,
            captcha_token: text("captcha_token"),
            captcha_solution: text("captcha_solution"),
        })
    }
}

impl From<CreateCommentRequest> for NewComment {
    fn from(req: CreateCommentRequest) -> Self {
        NewComment {
            user_name: req.user_name,
            email: req.email,
            home_page: req.home_page,
            text: req.text,
            parent: req.parent,
            captcha_token: req.captcha_token,
            captcha_solution: req.captcha_solution,
            files: Vec::new(),
        }
    }
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PreviewRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

// ============ 用户 ============

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct RegisterBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    pub website: Option<String>,
}

impl From<RegisterBody> for RegisterRequest {
    fn from(body: RegisterBody) -> Self {
        RegisterRequest {
            username: body.username,
            email: body.email,
            password: body.password,
            password_confirm: body.password_confirm,
            first_name: body.first_name,
            last_name: body.last_name,
            bio: body.bio,
            website: body.website,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LoginBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct RefreshBody {
    #[serde(default)]
    pub refresh: String,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct VerifyBody {
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub avatar: Option<String>,
    pub show_email: Option<bool>,
}

impl From<ProfilePatch> for ProfileUpdate {
    fn from(patch: ProfilePatch) -> Self {
        ProfileUpdate {
            email: patch.email,
            first_name: patch.first_name,
            last_name: patch.last_name,
            bio: patch.bio,
            website: patch.website,
            avatar: patch.avatar,
            show_email: patch.show_email,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PreferencesPatch {
    pub theme: Option<String>,
    pub language: Option<String>,
    pub comments_per_page: Option<i32>,
    pub email_on_reply: Option<bool>,
    pub email_on_like: Option<bool>,
    pub email_digest: Option<String>,
}

impl From<PreferencesPatch> for PreferencesUpdate {
    fn from(patch: PreferencesPatch) -> Self {
        PreferencesUpdate {
            theme: patch.theme,
            language: patch.language,
            comments_per_page: patch.comments_per_page,
            email_on_reply: patch.email_on_reply,
            email_on_like: patch.email_on_like,
            email_digest: patch.email_digest,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ChangePasswordBody {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub new_password_confirm: String,
}

impl From<ChangePasswordBody> for PasswordChange {
    fn from(body: ChangePasswordBody) -> Self {
        PasswordChange {
            old_password: body.old_password,
            new_password: body.new_password,
            new_password_confirm: body.new_password_confirm,
        }
    }
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct TopUsersQuery {
    pub period: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub q: String,
}

// ============ 文件 ============

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct FileListQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub file_type: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl FileListQuery {
    pub fn filter(&self) -> FileFilter {
        FileFilter {
            file_type: non_blank(self.file_type.clone()),
            status: non_blank(self.status.clone()),
            search: non_blank(self.search.clone()),
        }
    }

    pub fn ordering(&self) -> FileOrdering {
        FileOrdering::parse(self.ordering.as_deref())
    }

    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
            .unwrap_or(FILE_PAGE_SIZE)
            .clamp(1, FILE_MAX_PAGE_SIZE)
    }
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CleanupBody {
    pub days: Option<i64>,
}

impl CleanupBody {
    /// 空请求体按默认值处理；无法解析时报错，不回退到默认清理
    pub fn from_bytes(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|_| CommentaryError::validation("Days must be a positive integer"))
    }
}

// ============ 分析统计 ============

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct MinutesQuery {
    pub minutes: Option<i64>,
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct HoursQuery {
    pub hours: Option<i64>,
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct EventsQuery {
    pub event_type: Option<String>,
    pub user: Option<String>,
    pub hours: Option<i64>,
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ActivityQuery {
    pub user: Option<String>,
    pub days: Option<i64>,
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PopularQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub days: Option<i64>,
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ExportQuery {
    #[serde(rename = "type")]
    pub export_type: Option<String>,
    pub days: Option<i64>,
}

/// 分析接口的时间窗口默认值
pub mod windows {
    pub const DEFAULT_HOURS: i64 = 24;
    pub const DEFAULT_DAILY_DAYS: i64 = 30;
    pub const DEFAULT_ACTIVITY_DAYS: i64 = 7;
    pub const DEFAULT_POPULAR_DAYS: i64 = 7;
    pub const DEFAULT_USER_DAYS: i64 = 30;
    pub const DEFAULT_EXPORT_DAYS: i64 = 30;
    /// 任意窗口的上限
    pub const MAX_DAYS: i64 = 365;
    pub const MAX_HOURS: i64 = 24 * 30;
}

/// 按默认值和上限规整窗口参数
pub fn window(value: Option<i64>, default: i64, max: i64) -> i64 {
    match value {
        Some(v) if v > 0 => v.min(max),
        _ => default,
    }
}

/// 上传请求体上限
pub fn max_upload_bytes() -> usize {
    get_config().server.max_upload_bytes
}

/// 批量上传 / 带附件评论：单字段按请求上限，总量允许 MAX_BULK_FILES 个满额文件
pub fn batch_upload_limits() -> MultipartLimits {
    let config = get_config();
    MultipartLimits::batch(
        config.server.max_upload_bytes,
        usize::try_from(config.uploads.max_file_size).unwrap_or(usize::MAX),
        MAX_BULK_FILES,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::collections::HashMap;

    #[test]
    fn test_parse_datetime_rfc3339_and_date() {
        let dt = parse_datetime("2024-03-05T10:20:30Z").unwrap();
        assert_eq!(dt.hour(), 10);

        let day = parse_datetime("2024-03-05").unwrap();
        assert_eq!(day.day(), 5);
        assert_eq!(day.hour(), 0);

        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn test_comment_list_query_filter() {
        let query = CommentListQuery {
            user_name: Some("  ".into()),
            search: Some("rust".into()),
            created_after: Some("2024-01-01".into()),
            min_likes: Some(2),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert!(filter.user_name.is_none());
        assert_eq!(filter.search.as_deref(), Some("rust"));
        assert!(filter.created_after.is_some());
        assert_eq!(filter.min_likes, Some(2));

        let bad = CommentListQuery {
            created_before: Some("not-a-date".into()),
            ..Default::default()
        };
        assert!(bad.filter().is_err());
    }

    #[test]
    fn test_create_comment_from_multipart_fields() {
        let mut fields = HashMap::new();
        fields.insert("user_name".to_string(), "alice".to_string());
        fields.insert("text".to_string(), "hello".to_string());
        fields.insert("parent".to_string(), "7".to_string());
        let req = CreateCommentRequest::from_fields(&fields).unwrap();
        assert_eq!(req.user_name, "alice");
        assert_eq!(req.parent, Some(7));
        assert!(req.email.is_empty());

        fields.insert("parent".to_string(), "seven".to_string());
        assert!(CreateCommentRequest::from_fields(&fields).is_err());
    }

    #[test]
    fn test_file_list_query_paging() {
        let query = FileListQuery {
            page: Some(0),
            page_size: Some(500),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), FILE_MAX_PAGE_SIZE);
        assert_eq!(FileListQuery::default().page_size(), FILE_PAGE_SIZE);
    }

    #[test]
    fn test_window_defaults_and_caps() {
        assert_eq!(window(None, 24, 100), 24);
        assert_eq!(window(Some(0), 24, 100), 24);
        assert_eq!(window(Some(-3), 24, 100), 24);
        assert_eq!(window(Some(500), 24, 100), 100);
        assert_eq!(window(Some(12), 24, 100), 12);
    }

    #[test]
    fn test_cleanup_body_parsing() {
        assert_eq!(CleanupBody::from_bytes(b"").unwrap().days, None);
        assert_eq!(CleanupBody::from_bytes(b"  \n").unwrap().days, None);
        assert_eq!(CleanupBody::from_bytes(br#"{"days": 7}"#).unwrap().days, Some(7));
        assert_eq!(CleanupBody::from_bytes(b"{}").unwrap().days, None);

        let err = CleanupBody::from_bytes(br#"{"days": "abc"}"#).unwrap_err();
        assert_eq!(err.message(), "Days must be a positive integer");
        assert!(CleanupBody::from_bytes(b"not json").is_err());
    }
}
