//! User accounts service
//!
//! Registration, JWT login / refresh, profile and preference management,
//! per-user comment statistics and user discovery.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use sea_orm::{IntoActiveModel, Set};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::ClientInfo;
use crate::analytics::{EventTracker, EventType, NewEvent};
use crate::api::jwt::{JwtService, TokenPair};
use crate::errors::{CommentaryError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::TopCommenterRow;
use crate::utils::password::{hash_password, verify_dummy, verify_password};
use crate::utils::truncate_chars;
use crate::utils::validators::{
    normalize_optional_url, validate_bio, validate_email, validate_password, validate_username,
};
use migration::entities::{user, user_preference};

const STATS_TTL: StdDuration = StdDuration::from_secs(60 * 60);
const TOP_USERS_TTL: StdDuration = StdDuration::from_secs(60 * 60);
const SNIPPET_CHARS: usize = 100;
const NAME_MAX_CHARS: usize = 150;
pub const ACTIVITY_LIMIT: usize = 20;
const STATS_ACTIVITY_LIMIT: usize = 10;
pub const SEARCH_LIMIT: u64 = 20;
pub const DEFAULT_TOP_LIMIT: u64 = 10;
const MAX_TOP_LIMIT: u64 = 100;

pub const THEMES: &[&str] = &["light", "dark", "auto"];
pub const LANGUAGES: &[&str] = &["en", "uk", "ru"];
pub const PAGE_SIZES: &[i32] = &[10, 25, 50, 100];
pub const DIGESTS: &[&str] = &["never", "daily", "weekly"];

// ============ 请求 ============

#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub website: Option<String>,
}

/// 个人资料的部分更新；`website` / `avatar` 传空字符串表示清除
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub avatar: Option<String>,
    pub show_email: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub theme: Option<String>,
    pub language: Option<String>,
    pub comments_per_page: Option<i32>,
    pub email_on_reply: Option<bool>,
    pub email_on_like: Option<bool>,
    pub email_digest: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// 排行榜统计区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TopPeriod {
    Week,
    Month,
    #[default]
    AllTime,
}

impl TopPeriod {
    /// 未知取值按全部时间处理
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            _ => Self::AllTime,
        }
    }

    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => Some(now - Duration::days(30)),
            Self::AllTime => None,
        }
    }
}

// ============ 视图 ============

/// 当前用户的完整资料
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub website: Option<String>,
    pub avatar: Option<String>,
    pub comments_count: i64,
    pub likes_received: i64,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub show_email: bool,
    pub is_staff: bool,
}

impl From<&user::Model> for ProfileView {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            bio: u.bio.clone(),
            website: u.website.clone(),
            avatar: u.avatar.clone(),
            comments_count: u.comments_count,
            likes_received: u.likes_received,
            date_joined: u.date_joined,
            last_login: u.last_login,
            show_email: u.show_email,
            is_staff: u.is_staff,
        }
    }
}

/// 他人可见的公开资料
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub date_joined: DateTime<Utc>,
    pub comments_count: i64,
    pub likes_received: i64,
}

impl From<&user::Model> for PublicProfile {
    fn from(u: &user::Model) -> Self {
        Self {
            username: u.username.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            bio: u.bio.clone(),
            website: u.website.clone(),
            avatar: u.avatar.clone(),
            email: u.show_email.then(|| u.email.clone()),
            date_joined: u.date_joined,
            comments_count: u.comments_count,
            likes_received: u.likes_received,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: ProfileView,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencesView {
    pub theme: String,
    pub language: String,
    pub comments_per_page: i32,
    pub email_on_reply: bool,
    pub email_on_like: bool,
    pub email_digest: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&user_preference::Model> for PreferencesView {
    fn from(p: &user_preference::Model) -> Self {
        Self {
            theme: p.theme.clone(),
            language: p.language.clone(),
            comments_per_page: p.comments_per_page,
            email_on_reply: p.email_on_reply,
            email_on_like: p.email_on_like,
            email_digest: p.email_digest.clone(),
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MostLikedComment {
    pub id: i64,
    pub text: String,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
}

/// 用户动态条目（发表评论 / 收到点赞）
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action: &'static str,
    pub target_id: i64,
    pub target_text: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total_comments: u64,
    pub total_likes_received: u64,
    pub total_replies_received: u64,
    pub most_liked_comment: Option<MostLikedComment>,
    pub recent_activity: Vec<ActivityEntry>,
    pub join_date: DateTime<Utc>,
    pub last_comment_date: Option<DateTime<Utc>>,
    pub engagement_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenVerification {
    pub valid: bool,
}

/// 参与度：评论 ×1 + 点赞 ×2 + 回复 ×1.5，老账号有加成
pub fn engagement_score(comments: u64, likes: u64, replies: u64, account_age_days: i64) -> f64 {
    let mut score = comments as f64 + likes as f64 * 2.0 + replies as f64 * 1.5;
    if account_age_days > 365 {
        score *= 1.1;
    } else if account_age_days > 30 {
        score *= 1.05;
    }
    (score * 100.0).round() / 100.0
}

/// 合并两路动态，按时间倒序截断
fn merge_activity(mut entries: Vec<ActivityEntry>, limit: usize) -> Vec<ActivityEntry> {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries.truncate(limit);
    entries
}

fn check_choice(field: &str, value: &str, choices: &[&str]) -> Result<()> {
    if choices.contains(&value) {
        Ok(())
    } else {
        Err(CommentaryError::validation(format!(
            "\"{}\" is not a valid choice for {}.",
            value, field
        )))
    }
}

fn check_name(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.chars().count() > NAME_MAX_CHARS {
        return Err(CommentaryError::validation(format!(
            "{} cannot exceed {} characters",
            field, NAME_MAX_CHARS
        )));
    }
    Ok(value.to_string())
}

/// 以用户名作为事件的用户标识
fn identified(client: &ClientInfo, username: &str) -> ClientInfo {
    ClientInfo {
        username: Some(username.to_string()),
        user_identifier: username.to_string(),
        ..client.clone()
    }
}

/// User accounts service
pub struct UserService {
    storage: Arc<SeaOrmStorage>,
    tracker: EventTracker,
    jwt: Arc<JwtService>,
    stats_cache: Cache<i64, Arc<UserStats>>,
    top_cache: Cache<(TopPeriod, u64), Arc<Vec<TopCommenterRow>>>,
}

impl UserService {
    pub fn new(storage: Arc<SeaOrmStorage>, tracker: EventTracker, jwt: Arc<JwtService>) -> Self {
        Self {
            storage,
            tracker,
            jwt,
            stats_cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(STATS_TTL)
                .build(),
            top_cache: Cache::builder()
                .max_capacity(64)
                .time_to_live(TOP_USERS_TTL)
                .build(),
        }
    }

    // ===== 认证 =====

    pub async fn register(&self, req: RegisterRequest, client: &ClientInfo) -> Result<AuthResponse> {
        let username = validate_username(&req.username)?;
        let email = validate_email(&req.email)?;
        validate_password(&req.password)?;
        if req.password != req.password_confirm {
            return Err(CommentaryError::validation("Passwords don't match"));
        }
        validate_bio(&req.bio)?;
        let website = normalize_optional_url(req.website.as_deref())?;
        let first_name = check_name("First name", &req.first_name)?;
        let last_name = check_name("Last name", &req.last_name)?;

        if self.storage.username_taken(&username).await? {
            return Err(CommentaryError::conflict(
                "A user with that username already exists.",
            ));
        }
        if self.storage.email_taken(&email, None).await? {
            return Err(CommentaryError::conflict(
                "A user with that email already exists.",
            ));
        }

        let password_hash = hash_password(&req.password)?;
        let model = user::ActiveModel {
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            first_name: Set(first_name),
            last_name: Set(last_name),
            bio: Set(req.bio.trim().to_string()),
            website: Set(website),
            avatar: Set(None),
            comments_count: Set(0),
            likes_received: Set(0),
            show_email: Set(false),
            allow_notifications: Set(true),
            last_comment_at: Set(None),
            date_joined: Set(Utc::now()),
            last_login: Set(None),
            is_active: Set(true),
            is_staff: Set(false),
            ..Default::default()
        };
        let created = self.storage.insert_user(model).await?;
        self.storage.get_or_create_preferences(created.id).await?;

        // 注册前可能已经以同名发表过评论
        self.refresh_counters(&created).await?;
        let created = self.require_user(created.id).await?;

        info!("User registered: {} (id {})", created.username, created.id);
        self.tracker.track(
            NewEvent::new(EventType::UserRegistered)
                .with_client(&identified(client, &created.username))
                .with_data(serde_json::json!({
                    "user_id": created.id,
                    "username": created.username,
                })),
        );

        let tokens = self.jwt.token_pair(created.id, &created.username, created.is_staff)?;
        Ok(AuthResponse {
            user: ProfileView::from(&created),
            tokens,
        })
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<AuthResponse> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(CommentaryError::validation(
                "Must include username and password",
            ));
        }

        let Some(found) = self.storage.find_user_by_username(username).await? else {
            // 与已知用户的失败路径耗时一致
            verify_dummy(password);
            debug!("Login failed: unknown user '{}'", username);
            return Err(CommentaryError::validation("Invalid credentials"));
        };
        if !verify_password(password, &found.password_hash)? {
            warn!("Login failed: wrong password for '{}'", username);
            return Err(CommentaryError::validation("Invalid credentials"));
        }
        if !found.is_active {
            return Err(CommentaryError::validation("User account is disabled"));
        }

        let now = Utc::now();
        self.storage.touch_last_login(found.id, now).await?;

        info!("User logged in: {}", found.username);
        self.tracker.track(
            NewEvent::new(EventType::UserLogin)
                .with_client(&identified(client, &found.username))
                .with_data(serde_json::json!({ "user_id": found.id })),
        );

        let tokens = self.jwt.token_pair(found.id, &found.username, found.is_staff)?;
        let mut view = ProfileView::from(&found);
        view.last_login = Some(now);
        Ok(AuthResponse { user: view, tokens })
    }

    /// 用 refresh token 换取新的令牌对
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.jwt.validate_refresh_token(refresh_token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| CommentaryError::unauthorized("Token is invalid"))?;
        let found = self
            .storage
            .find_user(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| CommentaryError::unauthorized("User not found or inactive"))?;
        self.jwt.token_pair(found.id, &found.username, found.is_staff)
    }

    pub fn verify(&self, token: &str) -> Result<TokenVerification> {
        self.jwt.validate_access_token(token)?;
        Ok(TokenVerification { valid: true })
    }

    // ===== 个人资料 =====

    async fn require_user(&self, user_id: i64) -> Result<user::Model> {
        self.storage
            .find_user(user_id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("User not found"))
    }

    /// 创建 staff 账户；用户名已存在时提升为 staff 并重置密码与邮箱
    pub async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<ProfileView> {
        let username = validate_username(username)?;
        let email = validate_email(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        if let Some(existing) = self.storage.find_user_by_username(&username).await? {
            if self.storage.email_taken(&email, Some(existing.id)).await? {
                return Err(CommentaryError::conflict(
                    "A user with that email already exists.",
                ));
            }
            let mut model = existing.into_active_model();
            model.email = Set(email);
            model.is_staff = Set(true);
            model.is_active = Set(true);
            model.password_hash = Set(password_hash);
            let promoted = self.storage.update_user(model).await?;
            warn!("Existing user {} promoted to staff", promoted.username);
            return Ok(ProfileView::from(&promoted));
        }

        if self.storage.email_taken(&email, None).await? {
            return Err(CommentaryError::conflict(
                "A user with that email already exists.",
            ));
        }

        let model = user::ActiveModel {
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            bio: Set(String::new()),
            website: Set(None),
            avatar: Set(None),
            comments_count: Set(0),
            likes_received: Set(0),
            show_email: Set(false),
            allow_notifications: Set(true),
            last_comment_at: Set(None),
            date_joined: Set(Utc::now()),
            last_login: Set(None),
            is_active: Set(true),
            is_staff: Set(true),
            ..Default::default()
        };
        let created = self.storage.insert_user(model).await?;
        self.storage.get_or_create_preferences(created.id).await?;
        info!("Staff user created: {} (id {})", created.username, created.id);
        Ok(ProfileView::from(&created))
    }

    pub async fn profile(&self, user_id: i64) -> Result<ProfileView> {
        Ok(ProfileView::from(&self.require_user(user_id).await?))
    }

    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<ProfileView> {
        let current = self.require_user(user_id).await?;
        let mut model = current.into_active_model();

        if let Some(email) = update.email {
            let email = validate_email(&email)?;
            if self.storage.email_taken(&email, Some(user_id)).await? {
                return Err(CommentaryError::conflict(
                    "A user with that email already exists.",
                ));
            }
            model.email = Set(email);
        }
        if let Some(first_name) = update.first_name {
            model.first_name = Set(check_name("First name", &first_name)?);
        }
        if let Some(last_name) = update.last_name {
            model.last_name = Set(check_name("Last name", &last_name)?);
        }
        if let Some(bio) = update.bio {
            validate_bio(&bio)?;
            model.bio = Set(bio.trim().to_string());
        }
        if let Some(website) = update.website {
            model.website = Set(normalize_optional_url(Some(&website))?);
        }
        if let Some(avatar) = update.avatar {
            model.avatar = Set(normalize_optional_url(Some(&avatar))?);
        }
        if let Some(show_email) = update.show_email {
            model.show_email = Set(show_email);
        }

        let updated = self.storage.update_user(model).await?;
        info!("Profile updated: {}", updated.username);
        Ok(ProfileView::from(&updated))
    }

    pub async fn preferences(&self, user_id: i64) -> Result<PreferencesView> {
        let prefs = self.storage.get_or_create_preferences(user_id).await?;
        Ok(PreferencesView::from(&prefs))
    }

    pub async fn update_preferences(
        &self,
        user_id: i64,
        update: PreferencesUpdate,
    ) -> Result<PreferencesView> {
        let current = self.storage.get_or_create_preferences(user_id).await?;
        let mut model = current.into_active_model();

        if let Some(theme) = update.theme {
            check_choice("theme", &theme, THEMES)?;
            model.theme = Set(theme);
        }
        if let Some(language) = update.language {
            check_choice("language", &language, LANGUAGES)?;
            model.language = Set(language);
        }
        if let Some(per_page) = update.comments_per_page {
            if !PAGE_SIZES.contains(&per_page) {
                return Err(CommentaryError::validation(format!(
                    "\"{}\" is not a valid choice for comments_per_page.",
                    per_page
                )));
            }
            model.comments_per_page = Set(per_page);
        }
        if let Some(on_reply) = update.email_on_reply {
            model.email_on_reply = Set(on_reply);
        }
        if let Some(on_like) = update.email_on_like {
            model.email_on_like = Set(on_like);
        }
        if let Some(digest) = update.email_digest {
            check_choice("email_digest", &digest, DIGESTS)?;
            model.email_digest = Set(digest);
        }
        model.updated_at = Set(Utc::now());

        let updated = self.storage.update_preferences(model).await?;
        Ok(PreferencesView::from(&updated))
    }

    pub async fn change_password(&self, user_id: i64, change: PasswordChange) -> Result<()> {
        let current = self.require_user(user_id).await?;
        if !verify_password(&change.old_password, &current.password_hash)? {
            return Err(CommentaryError::validation("Current password is incorrect"));
        }
        validate_password(&change.new_password)?;
        if change.new_password != change.new_password_confirm {
            return Err(CommentaryError::validation("New passwords don't match"));
        }

        let username = current.username.clone();
        let mut model = current.into_active_model();
        model.password_hash = Set(hash_password(&change.new_password)?);
        self.storage.update_user(model).await?;
        info!("Password changed for {}", username);
        Ok(())
    }

    // ===== 统计 =====

    pub async fn stats(&self, user_id: i64) -> Result<Arc<UserStats>> {
        if let Some(cached) = self.stats_cache.get(&user_id).await {
            return Ok(cached);
        }

        let found = self.require_user(user_id).await?;
        let username = found.username.as_str();
        let total_comments = self.storage.count_user_comments(username).await?;
        let total_likes_received = self.storage.count_likes_received(username).await?;
        let total_replies_received = self.storage.count_replies_received(username).await?;
        let most_liked_comment =
            self.storage
                .most_liked_comment_of(username)
                .await?
                .map(|c| MostLikedComment {
                    id: c.id,
                    text: truncate_chars(&c.sanitized_text, SNIPPET_CHARS),
                    likes_count: c.likes_count,
                    created_at: c.created_at,
                });
        let recent_activity = self.activity_of(username, STATS_ACTIVITY_LIMIT).await?;
        let account_age_days = (Utc::now() - found.date_joined).num_days();

        let stats = Arc::new(UserStats {
            total_comments,
            total_likes_received,
            total_replies_received,
            most_liked_comment,
            recent_activity,
            join_date: found.date_joined,
            last_comment_date: found.last_comment_at,
            engagement_score: engagement_score(
                total_comments,
                total_likes_received,
                total_replies_received,
                account_age_days,
            ),
        });
        self.stats_cache.insert(user_id, stats.clone()).await;
        Ok(stats)
    }

    pub async fn activity(&self, user_id: i64, limit: usize) -> Result<Vec<ActivityEntry>> {
        let found = self.require_user(user_id).await?;
        self.activity_of(&found.username, limit).await
    }

    async fn activity_of(&self, username: &str, limit: usize) -> Result<Vec<ActivityEntry>> {
        let half = (limit / 2) as u64;
        let mut entries = Vec::with_capacity(limit);

        for c in self.storage.recent_comments_of(username, half).await? {
            entries.push(ActivityEntry {
                kind: "comment",
                action: "posted",
                target_id: c.id,
                target_text: truncate_chars(&c.sanitized_text, SNIPPET_CHARS),
                created_at: c.created_at,
                parent_id: c.parent_id,
            });
        }
        for (like, c) in self.storage.recent_likes_received(username, half).await? {
            entries.push(ActivityEntry {
                kind: "like",
                action: "received",
                target_id: c.id,
                target_text: truncate_chars(&c.sanitized_text, SNIPPET_CHARS),
                created_at: like.created_at,
                parent_id: None,
            });
        }

        Ok(merge_activity(entries, limit))
    }

    /// 重新计算用户行上缓存的评论计数，并使统计缓存失效
    pub async fn update_user_stats(&self, username: &str) -> Result<()> {
        let Some(found) = self.storage.find_user_by_username(username).await? else {
            return Ok(());
        };
        self.refresh_counters(&found).await
    }

    async fn refresh_counters(&self, found: &user::Model) -> Result<()> {
        let comments = self.storage.count_user_comments(&found.username).await?;
        let likes = self.storage.count_likes_received(&found.username).await?;
        let last_comment_at = self.storage.last_comment_at(&found.username).await?;
        self.storage
            .store_user_counters(found.id, comments as i64, likes as i64, last_comment_at)
            .await?;
        self.stats_cache.invalidate(&found.id).await;
        debug!(
            "User counters refreshed for {}: {} comments, {} likes",
            found.username, comments, likes
        );
        Ok(())
    }

    // ===== 公开查询 =====

    pub async fn public_profile(&self, username: &str) -> Result<PublicProfile> {
        self.storage
            .find_user_by_username(username)
            .await?
            .filter(|u| u.is_active)
            .map(|u| PublicProfile::from(&u))
            .ok_or_else(|| CommentaryError::not_found("User not found"))
    }

    pub async fn top_users(
        &self,
        period: TopPeriod,
        limit: Option<u64>,
    ) -> Result<Arc<Vec<TopCommenterRow>>> {
        let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT);
        let key = (period, limit);
        if let Some(cached) = self.top_cache.get(&key).await {
            return Ok(cached);
        }
        let rows = Arc::new(
            self.storage
                .top_commenters(period.since(Utc::now()), limit)
                .await?,
        );
        self.top_cache.insert(key, rows.clone()).await;
        Ok(rows)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<PublicProfile>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .storage
            .search_users(query, SEARCH_LIMIT)
            .await?
            .iter()
            .map(PublicProfile::from)
            .collect())
    }

    /// 清空排行榜缓存（新评论写入后调用）
    pub fn invalidate_rankings(&self) {
        self.top_cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_engagement_score_weights() {
        assert_eq!(engagement_score(10, 5, 2, 0), 23.0);
        assert_eq!(engagement_score(10, 5, 2, 31), 24.15);
        assert_eq!(engagement_score(10, 5, 2, 400), 25.3);
        assert_eq!(engagement_score(0, 0, 0, 1000), 0.0);
        assert_eq!(engagement_score(1, 0, 1, 0), 2.5);
    }

    #[test]
    fn test_top_period_parse() {
        assert_eq!(TopPeriod::parse(Some("week")), TopPeriod::Week);
        assert_eq!(TopPeriod::parse(Some("month")), TopPeriod::Month);
        assert_eq!(TopPeriod::parse(Some("year")), TopPeriod::AllTime);
        assert_eq!(TopPeriod::parse(None), TopPeriod::AllTime);

        let now = Utc::now();
        assert_eq!(TopPeriod::Week.since(now), Some(now - Duration::days(7)));
        assert_eq!(TopPeriod::AllTime.since(now), None);
    }

    #[test]
    fn test_merge_activity_sorts_and_truncates() {
        let at = |h| Utc.with_ymd_and_hms(2026, 3, 1, h, 0, 0).unwrap();
        let entry = |kind, h| ActivityEntry {
            kind,
            action: "x",
            target_id: h as i64,
            target_text: String::new(),
            created_at: at(h),
            parent_id: None,
        };
        let merged = merge_activity(
            vec![entry("comment", 1), entry("like", 5), entry("comment", 3)],
            2,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].target_id, 5);
        assert_eq!(merged[1].target_id, 3);
    }

    #[test]
    fn test_public_profile_hides_email() {
        let mut u = user::Model {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            first_name: "Alice".into(),
            last_name: String::new(),
            bio: String::new(),
            website: None,
            avatar: None,
            comments_count: 3,
            likes_received: 1,
            show_email: false,
            allow_notifications: true,
            last_comment_at: None,
            date_joined: Utc::now(),
            last_login: None,
            is_active: true,
            is_staff: false,
        };
        let hidden = serde_json::to_value(PublicProfile::from(&u)).unwrap();
        assert!(hidden.get("email").is_none());

        u.show_email = true;
        let shown = serde_json::to_value(PublicProfile::from(&u)).unwrap();
        assert_eq!(shown["email"], "alice@example.com");
    }

    #[test]
    fn test_choice_validation() {
        assert!(check_choice("theme", "dark", THEMES).is_ok());
        assert!(check_choice("theme", "neon", THEMES).is_err());
        assert!(check_choice("email_digest", "hourly", DIGESTS).is_err());
    }

    #[test]
    fn test_activity_entry_serializes_type_field() {
        let e = ActivityEntry {
            kind: "like",
            action: "received",
            target_id: 9,
            target_text: "hi".into(),
            created_at: Utc::now(),
            parent_id: None,
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "like");
        assert!(v.get("parent_id").is_none());
    }
}
