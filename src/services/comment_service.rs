//! Comment service
//!
//! Threaded comments with CAPTCHA-protected creation, likes, spam
//! heuristics, file attachments, statistics and moderation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use sea_orm::Set;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::captcha::CaptchaService;
use super::file_service::{FileService, file_url};
use super::user_service::UserService;
use super::{ClientInfo, IncomingFile, Page, sanitizer, spam};
use crate::analytics::rollup::CONTENT_COMMENT;
use crate::analytics::{EventTracker, EventType};
use crate::config::CommentsConfig;
use crate::errors::{CommentaryError, Result};
use crate::storage::backend::UserCommentCountRow;
use crate::storage::{CommentFilter, CommentOrdering, SeaOrmStorage};
use crate::utils::truncate_chars;
use crate::utils::validators::{normalize_optional_url, validate_email, validate_user_name};
use migration::entities::{comment, comment_file};

const STATS_TTL: StdDuration = StdDuration::from_secs(10 * 60);
const TRENDING_TTL: StdDuration = StdDuration::from_secs(60 * 60);
const STATS_KEY: &str = "comment_stats";
const USER_AGENT_MAX_CHARS: usize = 500;
const SPAM_WINDOW_MINUTES: i64 = 10;
const TRENDING_DAYS: i64 = 7;
pub const DEFAULT_TRENDING_LIMIT: u64 = 10;
const MAX_TRENDING_LIMIT: u64 = 50;
const HISTORY_LIMIT: u64 = 50;
const MOST_ACTIVE_USERS: u64 = 5;
/// 线程视图在根评论之下展开的层数
const THREAD_LEVELS: u32 = 3;
const DATE_FORMAT: &str = "%d.%m.%y в %H:%M";

pub fn format_comment_date(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

// ============ 请求 ============

/// 新评论（或回复）
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub user_name: String,
    pub email: String,
    pub home_page: Option<String>,
    pub text: String,
    pub parent: Option<i64>,
    pub captcha_token: String,
    pub captcha_solution: String,
    pub files: Vec<IncomingFile>,
}

/// 校验后的评论字段
#[derive(Debug, Clone, PartialEq)]
struct ValidComment {
    user_name: String,
    email: String,
    home_page: Option<String>,
    text: String,
}

fn validate_comment(input: &NewComment) -> Result<ValidComment> {
    let user_name = validate_user_name(&input.user_name)?;
    let email = validate_email(&input.email)?;
    let home_page = normalize_optional_url(input.home_page.as_deref())?;
    if input.text.trim().is_empty() {
        return Err(CommentaryError::validation("Text is required"));
    }
    Ok(ValidComment {
        user_name,
        email,
        home_page,
        text: input.text.clone(),
    })
}

// ============ 视图 ============

/// 评论列表项（不含邮箱）
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub user_name: String,
    pub home_page: Option<String>,
    pub sanitized_text: String,
    pub parent: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub likes_count: i64,
    pub replies_count: i64,
    pub files_count: i64,
    pub has_replies: bool,
    pub formatted_date: String,
}

impl CommentView {
    fn new(m: &comment::Model, files_count: i64, has_replies: bool) -> Self {
        Self {
            id: m.id,
            user_name: m.user_name.clone(),
            home_page: m.home_page.clone(),
            sanitized_text: m.sanitized_text.clone(),
            parent: m.parent_id,
            created_at: m.created_at,
            likes_count: m.likes_count,
            replies_count: m.replies_count,
            files_count,
            has_replies,
            formatted_date: format_comment_date(m.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentFileView {
    pub id: i64,
    pub file_type: String,
    pub original_name: String,
    pub file_size: i64,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&comment_file::Model> for CommentFileView {
    fn from(f: &comment_file::Model) -> Self {
        Self {
            id: f.id,
            file_type: f.file_type.clone(),
            original_name: f.original_name.clone(),
            file_size: f.file_size,
            file_url: f.uploaded_file_id.map(file_url),
            created_at: f.created_at,
        }
    }
}

/// 评论详情，带嵌套回复
#[derive(Debug, Clone, Serialize)]
pub struct CommentDetail {
    #[serde(flatten)]
    pub comment: CommentView,
    pub depth: u32,
    pub can_reply: bool,
    pub files: Vec<CommentFileView>,
    pub replies: Vec<CommentDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewResult {
    pub original_text: String,
    pub sanitized_text: String,
    pub is_valid_xhtml: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeResult {
    pub comment_id: i64,
    pub likes_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentStats {
    pub total_comments: u64,
    pub total_replies: u64,
    pub comments_this_week: u64,
    pub average_replies_per_comment: f64,
    pub most_liked_comment_id: Option<i64>,
    pub most_active_users: Vec<UserCommentCountRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpamReport {
    pub comment_id: i64,
    pub is_spam: bool,
    pub spam_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModerationResult {
    pub comment_id: i64,
    pub is_active: bool,
    pub is_moderated: bool,
    pub moderated_at: Option<DateTime<Utc>>,
}

/// 已加载的一棵评论子树
struct LoadedTree {
    children: HashMap<i64, Vec<comment::Model>>,
    files: HashMap<i64, Vec<comment_file::Model>>,
}

impl LoadedTree {
    fn assemble(&self, node: &comment::Model, depth: u32, max_depth: u32) -> CommentDetail {
        let files: Vec<CommentFileView> = self
            .files
            .get(&node.id)
            .map(|fs| fs.iter().map(CommentFileView::from).collect())
            .unwrap_or_default();
        let replies: Vec<CommentDetail> = self
            .children
            .get(&node.id)
            .map(|cs| {
                cs.iter()
                    .map(|c| self.assemble(c, depth + 1, max_depth))
                    .collect()
            })
            .unwrap_or_default();

        CommentDetail {
            comment: CommentView::new(node, files.len() as i64, !replies.is_empty()),
            depth,
            can_reply: depth < max_depth,
            files,
            replies,
        }
    }
}

/// Comment service
pub struct CommentService {
    storage: Arc<SeaOrmStorage>,
    tracker: EventTracker,
    captcha: Arc<CaptchaService>,
    files: Arc<FileService>,
    users: Arc<UserService>,
    config: CommentsConfig,
    stats_cache: Cache<&'static str, Arc<CommentStats>>,
    trending_cache: Cache<u64, Arc<Vec<CommentView>>>,
}

impl CommentService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        tracker: EventTracker,
        captcha: Arc<CaptchaService>,
        files: Arc<FileService>,
        users: Arc<UserService>,
        config: CommentsConfig,
    ) -> Self {
        Self {
            storage,
            tracker,
            captcha,
            files,
            users,
            config,
            stats_cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(STATS_TTL)
                .build(),
            trending_cache: Cache::builder()
                .max_capacity(64)
                .time_to_live(TRENDING_TTL)
                .build(),
        }
    }

    /// 顶层评论分页；带 `search` 时记录一次搜索
    pub async fn list(
        &self,
        filter: CommentFilter,
        ordering: CommentOrdering,
        page: Option<u64>,
        page_size: Option<u64>,
        client: &ClientInfo,
    ) -> Result<Page<CommentView>> {
        let started = Instant::now();
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size
            .unwrap_or(self.config.page_size)
            .clamp(1, self.config.max_page_size.max(1));

        let (items, count) = self
            .storage
            .list_comments(&filter, ordering, page, page_size)
            .await?;
        let ids: Vec<i64> = items.iter().map(|c| c.id).collect();
        let file_counts = self.storage.file_counts_for(&ids).await?;
        let with_replies = self.storage.ids_with_active_replies(&ids).await?;

        let results = items
            .iter()
            .map(|c| {
                CommentView::new(
                    c,
                    file_counts.get(&c.id).copied().unwrap_or(0),
                    with_replies.contains(&c.id),
                )
            })
            .collect();

        if let Some(query) = filter.search.as_deref().filter(|q| !q.trim().is_empty()) {
            let elapsed_ms = started.elapsed().as_millis() as i64;
            self.tracker
                .track_search_query(query, count as i64, elapsed_ms, client)
                .await;
        }

        Ok(Page {
            count,
            page,
            page_size,
            results,
        })
    }

    /// 创建评论或回复
    pub async fn create(&self, input: NewComment, client: &ClientInfo) -> Result<CommentDetail> {
        let valid = validate_comment(&input)?;

        if let Some(parent_id) = input.parent {
            self.reply_target(parent_id).await?;
        }

        self.captcha
            .verify_and_consume(&input.captcha_token, &input.captcha_solution)
            .await?;

        let sanitized = sanitizer::sanitize(&valid.text);
        let recent_from_ip = match client.ip.as_deref() {
            Some(ip) => {
                self.storage
                    .count_recent_comments_by_ip(ip, Utc::now() - Duration::minutes(SPAM_WINDOW_MINUTES))
                    .await?
            }
            None => 0,
        };
        let flagged = spam::is_spam(&valid.text, recent_from_ip);
        let hidden = flagged && self.config.spam_auto_hide;
        if flagged {
            warn!(
                "Comment from '{}' ({}) flagged as spam{}",
                valid.user_name,
                client.ip_or_unknown(),
                if hidden { ", hiding" } else { "" }
            );
        }

        let now = Utc::now();
        let model = comment::ActiveModel {
            user_name: Set(valid.user_name.clone()),
            email: Set(valid.email),
            home_page: Set(valid.home_page),
            text: Set(valid.text.clone()),
            sanitized_text: Set(sanitized),
            parent_id: Set(input.parent),
            created_at: Set(now),
            updated_at: Set(now),
            ip_address: Set(client.ip.clone()),
            user_agent: Set(truncate_chars(&client.user_agent, USER_AGENT_MAX_CHARS)),
            is_active: Set(!hidden),
            is_moderated: Set(hidden),
            moderated_by: Set(None),
            moderated_at: Set(None),
            likes_count: Set(0),
            replies_count: Set(0),
            ..Default::default()
        };
        let created = self.storage.insert_comment(model).await?;

        if let Some(parent_id) = created.parent_id {
            self.storage.refresh_replies_count(parent_id).await?;
        }

        let attached = self.attach_files(&created, input.files, client).await;
        if let Err(e) = self.users.update_user_stats(&created.user_name).await {
            warn!("Failed to refresh counters for {}: {}", created.user_name, e);
        }
        self.invalidate_caches();

        let event_type = if created.parent_id.is_some() {
            EventType::CommentReplied
        } else {
            EventType::CommentCreated
        };
        let mut data = serde_json::json!({
            "comment_id": created.id,
            "user_name": created.user_name,
            "text_length": valid.text.chars().count(),
            "files": attached.len(),
        });
        if let Some(parent_id) = created.parent_id {
            data["parent_id"] = serde_json::json!(parent_id);
        }
        self.tracker.track_object(
            event_type,
            &self.commenter_client(client, &created.user_name),
            CONTENT_COMMENT,
            created.id,
            data,
        );

        let depth = self.storage.comment_depth(&created).await?;
        let files: Vec<CommentFileView> = attached.iter().map(CommentFileView::from).collect();
        Ok(CommentDetail {
            comment: CommentView::new(&created, files.len() as i64, false),
            depth,
            can_reply: depth < self.config.max_depth,
            files,
            replies: Vec::new(),
        })
    }

    /// 回复指定评论
    pub async fn reply(
        &self,
        parent_id: i64,
        mut input: NewComment,
        client: &ClientInfo,
    ) -> Result<CommentDetail> {
        input.parent = Some(parent_id);
        self.create(input, client).await
    }

    /// 检查父评论存在、活跃且未达到最大层级
    async fn reply_target(&self, parent_id: i64) -> Result<comment::Model> {
        let parent = self
            .storage
            .find_active_comment(parent_id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("Parent comment not found"))?;
        if self.storage.comment_depth(&parent).await? >= self.config.max_depth {
            return Err(CommentaryError::validation(
                "Cannot reply to this comment (max nesting level reached)",
            ));
        }
        Ok(parent)
    }

    /// 评论事件的用户标识：登录用户名，否则为评论署名
    fn commenter_client(&self, client: &ClientInfo, user_name: &str) -> ClientInfo {
        if client.username.is_some() {
            return client.clone();
        }
        ClientInfo {
            user_identifier: user_name.to_string(),
            ..client.clone()
        }
    }

    async fn attach_files(
        &self,
        created: &comment::Model,
        files: Vec<IncomingFile>,
        client: &ClientInfo,
    ) -> Vec<comment_file::Model> {
        if files.is_empty() {
            return Vec::new();
        }
        let mut attached = Vec::new();
        for upload in self.files.attach_uploads(files, client).await {
            let link = comment_file::ActiveModel {
                comment_id: Set(created.id),
                uploaded_file_id: Set(Some(upload.id)),
                file_path: Set(upload.file_path.clone()),
                file_type: Set(upload.file_type.clone()),
                original_name: Set(upload.original_name.clone()),
                file_size: Set(upload.file_size),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            match self.storage.insert_comment_file(link).await {
                Ok(row) => attached.push(row),
                Err(e) => warn!(
                    "Failed to attach file {} to comment {}: {}",
                    upload.id, created.id, e
                ),
            }
        }
        debug!("Attached {} files to comment {}", attached.len(), created.id);
        attached
    }

    /// 从 `root` 开始向下加载活跃回复；`levels` 为 None 时加载全部
    async fn load_tree(&self, root: &comment::Model, levels: Option<u32>) -> Result<LoadedTree> {
        let mut children: HashMap<i64, Vec<comment::Model>> = HashMap::new();
        let mut all_ids = vec![root.id];
        let mut frontier = vec![root.id];
        let mut level = 0;

        // 层级受 max_depth 约束，额外上限防止脏数据成环
        let cap = levels.unwrap_or(self.config.max_depth + 1);
        while !frontier.is_empty() && level < cap {
            let batch = self.storage.active_children(&frontier).await?;
            frontier = batch.iter().map(|c| c.id).collect();
            all_ids.extend(frontier.iter().copied());
            for c in batch {
                if let Some(parent_id) = c.parent_id {
                    children.entry(parent_id).or_default().push(c);
                }
            }
            level += 1;
        }

        let mut files: HashMap<i64, Vec<comment_file::Model>> = HashMap::new();
        for f in self.storage.files_for_comments(&all_ids).await? {
            files.entry(f.comment_id).or_default().push(f);
        }
        Ok(LoadedTree { children, files })
    }

    /// 活跃评论详情，含全部嵌套回复
    pub async fn detail(&self, id: i64) -> Result<CommentDetail> {
        let found = self
            .storage
            .find_active_comment(id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("Comment not found"))?;
        let depth = self.storage.comment_depth(&found).await?;
        let tree = self.load_tree(&found, None).await?;
        Ok(tree.assemble(&found, depth, self.config.max_depth))
    }

    /// 评论所在线程：根评论加最多三层活跃回复
    pub async fn thread(&self, id: i64) -> Result<CommentDetail> {
        let found = self
            .storage
            .find_comment(id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("Comment not found"))?;
        let root = self.storage.comment_root(&found).await?;
        let tree = self.load_tree(&root, Some(THREAD_LEVELS)).await?;
        Ok(tree.assemble(&root, 0, self.config.max_depth))
    }

    pub async fn like(&self, id: i64, client: &ClientInfo) -> Result<LikeResult> {
        let found = self
            .storage
            .find_active_comment(id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("Comment not found"))?;

        let ip = client.ip_or_unknown();
        self.storage
            .insert_like(found.id, ip, &truncate_chars(&client.user_agent, USER_AGENT_MAX_CHARS))
            .await?;
        let likes_count = self.storage.refresh_likes_count(found.id).await?;

        if let Err(e) = self.users.update_user_stats(&found.user_name).await {
            warn!("Failed to refresh counters for {}: {}", found.user_name, e);
        }
        self.trending_cache.invalidate_all();

        self.tracker.track_object(
            EventType::CommentLiked,
            client,
            CONTENT_COMMENT,
            found.id,
            serde_json::json!({
                "comment_id": found.id,
                "likes_count": likes_count,
            }),
        );

        Ok(LikeResult {
            comment_id: found.id,
            likes_count,
        })
    }

    pub fn preview(&self, text: &str) -> Result<PreviewResult> {
        if text.is_empty() {
            return Err(CommentaryError::validation("Text is required"));
        }
        let sanitized_text = sanitizer::sanitize(text);
        Ok(PreviewResult {
            original_text: text.to_string(),
            is_valid_xhtml: sanitizer::is_valid_xhtml(&sanitized_text),
            sanitized_text,
        })
    }

    pub async fn stats(&self) -> Result<Arc<CommentStats>> {
        if let Some(cached) = self.stats_cache.get(STATS_KEY).await {
            return Ok(cached);
        }
        let row = self
            .storage
            .comment_stats(Utc::now() - Duration::days(7))
            .await?;
        let most_active_users = self
            .storage
            .most_active_commenters(MOST_ACTIVE_USERS)
            .await?;
        let stats = Arc::new(CommentStats {
            total_comments: row.total_comments,
            total_replies: row.total_replies,
            comments_this_week: row.comments_this_week,
            average_replies_per_comment: (row.average_replies_per_comment * 100.0).round() / 100.0,
            most_liked_comment_id: row.most_liked_comment_id,
            most_active_users,
        });
        self.stats_cache.insert(STATS_KEY, stats.clone()).await;
        Ok(stats)
    }

    pub async fn trending(&self, limit: Option<u64>) -> Result<Arc<Vec<CommentView>>> {
        let limit = limit
            .unwrap_or(DEFAULT_TRENDING_LIMIT)
            .clamp(1, MAX_TRENDING_LIMIT);
        if let Some(cached) = self.trending_cache.get(&limit).await {
            return Ok(cached);
        }
        let items = self
            .storage
            .trending_comments(Utc::now() - Duration::days(TRENDING_DAYS), limit)
            .await?;
        let views = Arc::new(self.views_for(&items).await?);
        self.trending_cache.insert(limit, views.clone()).await;
        Ok(views)
    }

    /// 某署名的评论历史（不区分大小写）
    pub async fn history(&self, user_name: &str) -> Result<Vec<CommentView>> {
        let items = self.storage.comment_history(user_name, HISTORY_LIMIT).await?;
        self.views_for(&items).await
    }

    async fn views_for(&self, items: &[comment::Model]) -> Result<Vec<CommentView>> {
        let ids: Vec<i64> = items.iter().map(|c| c.id).collect();
        let file_counts = self.storage.file_counts_for(&ids).await?;
        let with_replies = self.storage.ids_with_active_replies(&ids).await?;
        Ok(items
            .iter()
            .map(|c| {
                CommentView::new(
                    c,
                    file_counts.get(&c.id).copied().unwrap_or(0),
                    with_replies.contains(&c.id),
                )
            })
            .collect())
    }

    /// 管理员标记垃圾评论
    pub async fn mark_spam(&self, id: i64, moderator_id: Option<i64>) -> Result<ModerationResult> {
        let updated = self.storage.mark_comment_spam(id, moderator_id).await?;
        if let Some(parent_id) = updated.parent_id {
            self.storage.refresh_replies_count(parent_id).await?;
        }
        if let Err(e) = self.users.update_user_stats(&updated.user_name).await {
            warn!("Failed to refresh counters for {}: {}", updated.user_name, e);
        }
        self.invalidate_caches();
        info!(
            "Comment {} hidden as spam by moderator {:?}",
            updated.id, moderator_id
        );
        Ok(ModerationResult {
            comment_id: updated.id,
            is_active: updated.is_active,
            is_moderated: updated.is_moderated,
            moderated_at: updated.moderated_at,
        })
    }

    pub async fn spam_report(&self, id: i64) -> Result<SpamReport> {
        let found = self
            .storage
            .find_comment(id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("Comment not found"))?;
        let recent_from_ip = match found.ip_address.as_deref() {
            Some(ip) => {
                self.storage
                    .count_recent_comments_by_ip(ip, Utc::now() - Duration::minutes(SPAM_WINDOW_MINUTES))
                    .await?
            }
            None => 0,
        };
        Ok(SpamReport {
            comment_id: found.id,
            is_spam: spam::is_spam(&found.text, recent_from_ip),
            spam_score: spam::spam_score(&found.text),
        })
    }

    fn invalidate_caches(&self) {
        self.stats_cache.invalidate_all();
        self.trending_cache.invalidate_all();
        self.users.invalidate_rankings();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn model(id: i64, parent_id: Option<i64>) -> comment::Model {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).unwrap();
        comment::Model {
            id,
            user_name: "alice".into(),
            email: "alice@example.com".into(),
            home_page: None,
            text: "hi".into(),
            sanitized_text: "hi".into(),
            parent_id,
            created_at: at,
            updated_at: at,
            ip_address: Some("10.0.0.1".into()),
            user_agent: String::new(),
            is_active: true,
            is_moderated: false,
            moderated_by: None,
            moderated_at: None,
            likes_count: 0,
            replies_count: 0,
        }
    }

    #[test]
    fn test_formatted_date() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).unwrap();
        assert_eq!(format_comment_date(at), "01.03.26 в 09:05");
    }

    #[test]
    fn test_validate_comment() {
        let mut input = NewComment {
            user_name: "Alice42".into(),
            email: "alice@example.com".into(),
            home_page: Some("".into()),
            text: "Hello".into(),
            ..Default::default()
        };
        let valid = validate_comment(&input).unwrap();
        assert_eq!(valid.home_page, None);

        input.text = "   ".into();
        assert_eq!(
            validate_comment(&input).unwrap_err().message(),
            "Text is required"
        );

        input.text = "Hello".into();
        input.home_page = Some("ftp://x.org".into());
        assert!(validate_comment(&input).is_err());

        input.home_page = None;
        input.user_name = "Alice Smith".into();
        assert!(validate_comment(&input).is_err());
    }

    #[test]
    fn test_tree_assembly_depth_and_can_reply() {
        let root = model(1, None);
        let mut children = HashMap::new();
        children.insert(1, vec![model(2, Some(1))]);
        children.insert(2, vec![model(3, Some(2))]);
        children.insert(3, vec![model(4, Some(3))]);
        let mut files = HashMap::new();
        files.insert(
            2,
            vec![comment_file::Model {
                id: 10,
                comment_id: 2,
                uploaded_file_id: Some(5),
                file_path: "uploads/x.txt".into(),
                file_type: "text".into(),
                original_name: "x.txt".into(),
                file_size: 3,
                created_at: Utc::now(),
            }],
        );
        let tree = LoadedTree { children, files };

        let detail = tree.assemble(&root, 0, 3);
        assert!(detail.comment.has_replies);
        assert!(detail.can_reply);
        let level1 = &detail.replies[0];
        assert_eq!(level1.comment.files_count, 1);
        assert_eq!(level1.depth, 1);
        let level3 = &level1.replies[0].replies[0];
        assert_eq!(level3.depth, 3);
        assert!(!level3.can_reply);
        assert!(!level3.comment.has_replies);
    }

    #[test]
    fn test_comment_view_never_exposes_email() {
        let view = CommentView::new(&model(1, None), 0, false);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["formatted_date"], "01.03.26 в 09:05");
    }
}
