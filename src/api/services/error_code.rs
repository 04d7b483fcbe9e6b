//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};
use ts_rs::TS;

use crate::config::TS_EXPORT_PATH;
use crate::errors::CommentaryError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，ts-rs 自动生成 TypeScript 类型。
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 评论与验证码
/// - 4000-4099: 用户
/// - 5000-5099: 文件
/// - 6000-6099: 分析统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[ts(rename = "ErrorCode")]
#[ts(repr(enum))]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    Conflict = 1009,
    Gone = 1010,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    InvalidCredentials = 2000,
    TokenExpired = 2001,
    TokenInvalid = 2002,
    AccountDisabled = 2003,

    // 评论错误 3000-3099
    CommentNotFound = 3000,
    MaxDepthReached = 3001,
    AlreadyLiked = 3002,
    CaptchaInvalid = 3003,
    CaptchaExpired = 3004,
    CaptchaUsed = 3005,

    // 用户错误 4000-4099
    UserNotFound = 4000,
    UserAlreadyExists = 4001,

    // 文件错误 5000-5099
    FileNotFound = 5000,
    FileTooLarge = 5001,
    UnsupportedFileType = 5002,
    FileProcessingFailed = 5003,
    InvalidMultipartData = 5004,

    // Analytics 错误 6000-6099
    AnalyticsQueryFailed = 6000,
    InvalidExportType = 6001,
}

impl From<&CommentaryError> for ErrorCode {
    fn from(err: &CommentaryError) -> Self {
        let message = err.message();
        match err {
            CommentaryError::Validation(_) => match message {
                "Invalid credentials" | "Must include username and password" => {
                    ErrorCode::InvalidCredentials
                }
                "User account is disabled" => ErrorCode::AccountDisabled,
                "Invalid export type" => ErrorCode::InvalidExportType,
                m if m.starts_with("Invalid multipart data") => ErrorCode::InvalidMultipartData,
                m if m.starts_with("Cannot reply") => ErrorCode::MaxDepthReached,
                m if m.contains("CAPTCHA has expired") => ErrorCode::CaptchaExpired,
                m if m.contains("CAPTCHA has already been used") => ErrorCode::CaptchaUsed,
                m if m.contains("CAPTCHA") => ErrorCode::CaptchaInvalid,
                _ => ErrorCode::BadRequest,
            },
            CommentaryError::NotFound(_) => match message {
                "User not found" => ErrorCode::UserNotFound,
                "Comment not found" | "Parent comment not found" => ErrorCode::CommentNotFound,
                "Invalid CAPTCHA token" => ErrorCode::CaptchaInvalid,
                m if m.starts_with("File") => ErrorCode::FileNotFound,
                _ => ErrorCode::NotFound,
            },
            CommentaryError::Conflict(_) => {
                if message.contains("already liked") {
                    ErrorCode::AlreadyLiked
                } else if message.starts_with("A user with") {
                    ErrorCode::UserAlreadyExists
                } else {
                    ErrorCode::Conflict
                }
            }
            CommentaryError::Unauthorized(_) => match message {
                "Token is expired" => ErrorCode::TokenExpired,
                "Token is invalid" => ErrorCode::TokenInvalid,
                _ => ErrorCode::Unauthorized,
            },
            CommentaryError::Forbidden(_) => ErrorCode::Forbidden,
            CommentaryError::Gone(_) => {
                if message.contains("CAPTCHA") {
                    ErrorCode::CaptchaExpired
                } else {
                    ErrorCode::Gone
                }
            }
            CommentaryError::PayloadTooLarge(_) => ErrorCode::FileTooLarge,
            CommentaryError::UnsupportedFile(_) => ErrorCode::UnsupportedFileType,
            CommentaryError::FileProcessing(_) => ErrorCode::FileProcessingFailed,
            CommentaryError::DatabaseConnection(_) => ErrorCode::ServiceUnavailable,
            CommentaryError::DatabaseConfig(_)
            | CommentaryError::DatabaseOperation(_)
            | CommentaryError::FileOperation(_)
            | CommentaryError::Serialization(_)
            | CommentaryError::Internal(_) => ErrorCode::InternalServerError,
        }
    }
}

impl From<CommentaryError> for ErrorCode {
    fn from(err: CommentaryError) -> Self {
        ErrorCode::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::Success).unwrap(), "0");
        assert_eq!(
            serde_json::to_string(&ErrorCode::AlreadyLiked).unwrap(),
            "3002"
        );
        let parsed: ErrorCode = serde_json::from_str("5001").unwrap();
        assert_eq!(parsed, ErrorCode::FileTooLarge);
    }

    #[test]
    fn test_validation_messages_refine_code() {
        let depth = CommentaryError::validation(
            "Cannot reply to this comment (max nesting level reached)",
        );
        assert_eq!(ErrorCode::from(&depth), ErrorCode::MaxDepthReached);

        let captcha = CommentaryError::validation("Incorrect CAPTCHA solution");
        assert_eq!(ErrorCode::from(&captcha), ErrorCode::CaptchaInvalid);

        let used = CommentaryError::validation("CAPTCHA has already been used");
        assert_eq!(ErrorCode::from(&used), ErrorCode::CaptchaUsed);

        let login = CommentaryError::validation("Invalid credentials");
        assert_eq!(ErrorCode::from(&login), ErrorCode::InvalidCredentials);

        let plain = CommentaryError::validation("Text is required");
        assert_eq!(ErrorCode::from(&plain), ErrorCode::BadRequest);
    }

    #[test]
    fn test_variant_mapping() {
        assert_eq!(
            ErrorCode::from(CommentaryError::conflict("You have already liked this comment")),
            ErrorCode::AlreadyLiked
        );
        assert_eq!(
            ErrorCode::from(CommentaryError::not_found("User not found")),
            ErrorCode::UserNotFound
        );
        assert_eq!(
            ErrorCode::from(CommentaryError::unauthorized("Token is expired")),
            ErrorCode::TokenExpired
        );
        assert_eq!(
            ErrorCode::from(CommentaryError::payload_too_large("too big")),
            ErrorCode::FileTooLarge
        );
        assert_eq!(
            ErrorCode::from(CommentaryError::database_connection("down")),
            ErrorCode::ServiceUnavailable
        );
        assert_eq!(
            ErrorCode::from(CommentaryError::gone("CAPTCHA has expired")),
            ErrorCode::CaptchaExpired
        );
    }
}
