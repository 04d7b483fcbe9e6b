//! HTTP API 端点
//!
//! - 评论、验证码
//! - 认证、个人资料、用户发现
//! - 上传与文件
//! - 分析统计
//! - 健康检查

pub mod analytics;
pub mod comments;
pub mod error_code;
pub mod files;
pub mod health;
mod helpers;
pub mod rate_limit;
pub mod routes;
pub mod types;
pub mod users;

pub use error_code::ErrorCode;
pub use health::health_routes;
pub use helpers::{
    MultipartLimits, api_created, api_result, client_info, created_response,
    error_from_commentary, error_response, success_response,
};
pub use rate_limit::ApiRateLimits;
pub use routes::api_routes;
pub use types::{ApiResponse, MessageResponse};
