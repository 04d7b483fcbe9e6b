use serde::{Deserialize, Serialize};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// - server: 监听地址、端口、API 前缀、CORS、可信代理
/// - database: 数据库连接与重试
/// - logging: 日志输出
/// - auth: JWT 签名与有效期
/// - comments: 评论分页、嵌套深度、验证码
/// - uploads: 上传大小限制与图片处理参数
/// - analytics: 事件汇总与数据保留
/// - rate_limits: 各接口限流
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub rate_limits: RateLimitsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：CMT，分隔符：__
    /// 示例：CMT__SERVER__PORT=9000
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("CMT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_allowed_origins")
                    .with_list_parse_key("server.trusted_proxies"),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 所有业务接口的挂载前缀
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// 为空时允许任意来源（仅开发环境）
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    /// 可信反向代理（IP 或 CIDR），仅这些来源的 X-Forwarded-For 会被采信
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    /// 请求体上限（multipart 上传）
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" 或 "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// JWT 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 为空时启动阶段随机生成（重启后已签发的 token 全部失效）
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: u64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: u64,
}

/// 评论配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsConfig {
    #[serde(default = "default_comment_page_size")]
    pub page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// 最大回复层级（父链跳数）
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_captcha_ttl_minutes")]
    pub captcha_ttl_minutes: i64,
    /// 命中垃圾评论规则时直接隐藏
    #[serde(default = "default_true")]
    pub spam_auto_hide: bool,
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    #[serde(default = "default_media_root")]
    pub media_root: String,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_text_file_size")]
    pub max_text_file_size: u64,
    #[serde(default = "default_image_max_width")]
    pub image_max_width: u32,
    #[serde(default = "default_image_max_height")]
    pub image_max_height: u32,
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

/// 分析统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rollup_interval_secs")]
    pub rollup_interval_secs: u64,
    #[serde(default = "default_event_retention_days")]
    pub event_retention_days: i64,
    #[serde(default = "default_activity_retention_days")]
    pub activity_retention_days: i64,
    #[serde(default = "default_search_retention_days")]
    pub search_retention_days: i64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// 单个接口的限流规则
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitRule {
    /// 令牌补充间隔（毫秒）
    pub replenish_ms: u64,
    /// 突发容量
    pub burst: u32,
}

impl RateLimitRule {
    pub const fn per_minute(count: u32) -> Self {
        Self {
            replenish_ms: 60_000 / count as u64,
            burst: count,
        }
    }

    pub const fn per_hour(count: u32) -> Self {
        Self {
            replenish_ms: 3_600_000 / count as u64,
            burst: count,
        }
    }
}

/// 各接口限流配置（按客户端 IP）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_comment_create_limit")]
    pub comment_create: RateLimitRule,
    #[serde(default = "default_comment_reply_limit")]
    pub comment_reply: RateLimitRule,
    #[serde(default = "default_comment_like_limit")]
    pub comment_like: RateLimitRule,
    #[serde(default = "default_captcha_limit")]
    pub captcha: RateLimitRule,
    #[serde(default = "default_preview_limit")]
    pub preview: RateLimitRule,
    #[serde(default = "default_upload_limit")]
    pub upload: RateLimitRule,
    #[serde(default = "default_bulk_upload_limit")]
    pub bulk_upload: RateLimitRule,
    #[serde(default = "default_login_limit")]
    pub login: RateLimitRule,
    #[serde(default = "default_register_limit")]
    pub register: RateLimitRule,
    #[serde(default = "default_change_password_limit")]
    pub change_password: RateLimitRule,
}

// ============================================================
// Default value functions
// ============================================================

fn default_true() -> bool {
    true
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_database_url() -> String {
    "sqlite://commentary.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_access_token_minutes() -> u64 {
    60
}

fn default_refresh_token_days() -> u64 {
    7
}

fn default_comment_page_size() -> u64 {
    25
}

fn default_max_page_size() -> u64 {
    100
}

fn default_max_depth() -> u32 {
    3
}

fn default_captcha_ttl_minutes() -> i64 {
    10
}

fn default_media_root() -> String {
    "media".to_string()
}

fn default_max_file_size() -> u64 {
    2_621_440
}

fn default_max_text_file_size() -> u64 {
    102_400
}

fn default_image_max_width() -> u32 {
    320
}

fn default_image_max_height() -> u32 {
    240
}

fn default_thumbnail_size() -> u32 {
    120
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_rollup_interval_secs() -> u64 {
    3600
}

fn default_event_retention_days() -> i64 {
    90
}

fn default_activity_retention_days() -> i64 {
    60
}

fn default_search_retention_days() -> i64 {
    30
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_comment_create_limit() -> RateLimitRule {
    RateLimitRule::per_minute(10)
}

fn default_comment_reply_limit() -> RateLimitRule {
    RateLimitRule::per_minute(20)
}

fn default_comment_like_limit() -> RateLimitRule {
    RateLimitRule::per_minute(30)
}

fn default_captcha_limit() -> RateLimitRule {
    RateLimitRule::per_minute(20)
}

fn default_preview_limit() -> RateLimitRule {
    RateLimitRule::per_minute(30)
}

fn default_upload_limit() -> RateLimitRule {
    RateLimitRule::per_minute(20)
}

fn default_bulk_upload_limit() -> RateLimitRule {
    RateLimitRule::per_minute(5)
}

fn default_login_limit() -> RateLimitRule {
    RateLimitRule::per_minute(10)
}

fn default_register_limit() -> RateLimitRule {
    RateLimitRule::per_hour(5)
}

fn default_change_password_limit() -> RateLimitRule {
    RateLimitRule::per_hour(5)
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            api_prefix: default_api_prefix(),
            cors_allowed_origins: Vec::new(),
            trusted_proxies: Vec::new(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
        }
    }
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            page_size: default_comment_page_size(),
            max_page_size: default_max_page_size(),
            max_depth: default_max_depth(),
            captcha_ttl_minutes: default_captcha_ttl_minutes(),
            spam_auto_hide: true,
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            media_root: default_media_root(),
            max_file_size: default_max_file_size(),
            max_text_file_size: default_max_text_file_size(),
            image_max_width: default_image_max_width(),
            image_max_height: default_image_max_height(),
            thumbnail_size: default_thumbnail_size(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rollup_interval_secs: default_rollup_interval_secs(),
            event_retention_days: default_event_retention_days(),
            activity_retention_days: default_activity_retention_days(),
            search_retention_days: default_search_retention_days(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            comment_create: default_comment_create_limit(),
            comment_reply: default_comment_reply_limit(),
            comment_like: default_comment_like_limit(),
            captcha: default_captcha_limit(),
            preview: default_preview_limit(),
            upload: default_upload_limit(),
            bulk_upload: default_bulk_upload_limit(),
            login: default_login_limit(),
            register: default_register_limit(),
            change_password: default_change_password_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_upload_limits() {
        let config = StaticConfig::default();
        assert_eq!(config.uploads.max_file_size, 2_621_440);
        assert_eq!(config.uploads.max_text_file_size, 102_400);
        assert_eq!(config.uploads.image_max_width, 320);
        assert_eq!(config.uploads.image_max_height, 240);
        assert_eq!(config.comments.max_depth, 3);
        assert_eq!(config.comments.page_size, 25);
    }

    #[test]
    fn test_rate_limit_rule_helpers() {
        let rule = RateLimitRule::per_minute(10);
        assert_eq!(rule.replenish_ms, 6000);
        assert_eq!(rule.burst, 10);

        let rule = RateLimitRule::per_hour(5);
        assert_eq!(rule.replenish_ms, 720_000);
        assert_eq!(rule.burst, 5);
    }

    #[test]
    fn test_sample_config_roundtrips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).expect("sample config should parse");
        assert_eq!(parsed.server.api_prefix, "/api");
        assert_eq!(parsed.rate_limits.comment_like, RateLimitRule::per_minute(30));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [server]
            port = 9100

            [comments]
            max_depth = 5
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(parsed.server.port, 9100);
        assert_eq!(parsed.server.host, "127.0.0.1");
        assert_eq!(parsed.comments.max_depth, 5);
        assert_eq!(parsed.comments.captcha_ttl_minutes, 10);
    }
}
