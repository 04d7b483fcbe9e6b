use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum CommentaryError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    Gone(String),
    PayloadTooLarge(String),
    UnsupportedFile(String),
    FileProcessing(String),
    Serialization(String),
    Internal(String),
}

impl CommentaryError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            CommentaryError::DatabaseConfig(_) => "E001",
            CommentaryError::DatabaseConnection(_) => "E002",
            CommentaryError::DatabaseOperation(_) => "E003",
            CommentaryError::FileOperation(_) => "E004",
            CommentaryError::Validation(_) => "E005",
            CommentaryError::NotFound(_) => "E006",
            CommentaryError::Conflict(_) => "E007",
            CommentaryError::Unauthorized(_) => "E008",
            CommentaryError::Forbidden(_) => "E009",
            CommentaryError::Gone(_) => "E010",
            CommentaryError::PayloadTooLarge(_) => "E011",
            CommentaryError::UnsupportedFile(_) => "E012",
            CommentaryError::FileProcessing(_) => "E013",
            CommentaryError::Serialization(_) => "E014",
            CommentaryError::Internal(_) => "E015",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            CommentaryError::DatabaseConfig(_) => "Database Configuration Error",
            CommentaryError::DatabaseConnection(_) => "Database Connection Error",
            CommentaryError::DatabaseOperation(_) => "Database Operation Error",
            CommentaryError::FileOperation(_) => "File Operation Error",
            CommentaryError::Validation(_) => "Validation Error",
            CommentaryError::NotFound(_) => "Resource Not Found",
            CommentaryError::Conflict(_) => "Conflict",
            CommentaryError::Unauthorized(_) => "Unauthorized",
            CommentaryError::Forbidden(_) => "Forbidden",
            CommentaryError::Gone(_) => "Gone",
            CommentaryError::PayloadTooLarge(_) => "Payload Too Large",
            CommentaryError::UnsupportedFile(_) => "Unsupported File",
            CommentaryError::FileProcessing(_) => "File Processing Error",
            CommentaryError::Serialization(_) => "Serialization Error",
            CommentaryError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            CommentaryError::DatabaseConfig(msg)
            | CommentaryError::DatabaseConnection(msg)
            | CommentaryError::DatabaseOperation(msg)
            | CommentaryError::FileOperation(msg)
            | CommentaryError::Validation(msg)
            | CommentaryError::NotFound(msg)
            | CommentaryError::Conflict(msg)
            | CommentaryError::Unauthorized(msg)
            | CommentaryError::Forbidden(msg)
            | CommentaryError::Gone(msg)
            | CommentaryError::PayloadTooLarge(msg)
            | CommentaryError::UnsupportedFile(msg)
            | CommentaryError::FileProcessing(msg)
            | CommentaryError::Serialization(msg)
            | CommentaryError::Internal(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            CommentaryError::Validation(_) | CommentaryError::UnsupportedFile(_) => {
                StatusCode::BAD_REQUEST
            }
            CommentaryError::NotFound(_) => StatusCode::NOT_FOUND,
            CommentaryError::Conflict(_) => StatusCode::CONFLICT,
            CommentaryError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CommentaryError::Forbidden(_) => StatusCode::FORBIDDEN,
            CommentaryError::Gone(_) => StatusCode::GONE,
            CommentaryError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CommentaryError::FileProcessing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CommentaryError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            CommentaryError::DatabaseConfig(_)
            | CommentaryError::DatabaseOperation(_)
            | CommentaryError::FileOperation(_)
            | CommentaryError::Serialization(_)
            | CommentaryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 是否为服务端错误（需要记录 error 日志）
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// 格式化为彩色输出（用于 CLI 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for CommentaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CommentaryError {}

// 便捷的构造函数
impl CommentaryError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        CommentaryError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        CommentaryError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        CommentaryError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        CommentaryError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        CommentaryError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        CommentaryError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        CommentaryError::Conflict(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        CommentaryError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        CommentaryError::Forbidden(msg.into())
    }

    pub fn gone<T: Into<String>>(msg: T) -> Self {
        CommentaryError::Gone(msg.into())
    }

    pub fn payload_too_large<T: Into<String>>(msg: T) -> Self {
        CommentaryError::PayloadTooLarge(msg.into())
    }

    pub fn unsupported_file<T: Into<String>>(msg: T) -> Self {
        CommentaryError::UnsupportedFile(msg.into())
    }

    pub fn file_processing<T: Into<String>>(msg: T) -> Self {
        CommentaryError::FileProcessing(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        CommentaryError::Serialization(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        CommentaryError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for CommentaryError {
    fn from(err: sea_orm::DbErr) -> Self {
        // 唯一约束冲突（并发点赞、重复用户名等）
        if let Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return CommentaryError::Conflict(detail);
        }
        match err {
            sea_orm::DbErr::RecordNotFound(msg) => CommentaryError::NotFound(msg),
            sea_orm::DbErr::ConnectionAcquire(e) => {
                CommentaryError::DatabaseConnection(e.to_string())
            }
            other => CommentaryError::DatabaseOperation(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CommentaryError {
    fn from(err: std::io::Error) -> Self {
        CommentaryError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for CommentaryError {
    fn from(err: serde_json::Error) -> Self {
        CommentaryError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for CommentaryError {
    fn from(err: image::ImageError) -> Self {
        CommentaryError::FileProcessing(err.to_string())
    }
}

impl From<csv::Error> for CommentaryError {
    fn from(err: csv::Error) -> Self {
        CommentaryError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CommentaryError {
    fn from(err: tokio::task::JoinError) -> Self {
        CommentaryError::Internal(format!("Background task failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CommentaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            CommentaryError::validation("bad").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CommentaryError::not_found("x").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(CommentaryError::gone("x").http_status(), StatusCode::GONE);
        assert_eq!(
            CommentaryError::database_operation("x").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_db_record_not_found_maps_to_not_found() {
        let err: CommentaryError = sea_orm::DbErr::RecordNotFound("comment 1".into()).into();
        assert!(matches!(err, CommentaryError::NotFound(_)));
        assert_eq!(err.message(), "comment 1");
    }

    #[test]
    fn test_format_simple() {
        let err = CommentaryError::conflict("You have already liked this comment");
        assert_eq!(
            err.format_simple(),
            "Conflict: You have already liked this comment"
        );
        assert!(!err.is_server_error());
    }
}
