//! API 模块常量定义
//!
//! 请求头名称与认证前缀。

/// 请求追踪 ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 客户端会话 ID（分析采集使用，缺省时由服务端派生）
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Authorization 头中的 Bearer 前缀
pub const BEARER_PREFIX: &str = "Bearer ";

/// 会话 ID 最大长度
pub const SESSION_ID_MAX_CHARS: usize = 64;
