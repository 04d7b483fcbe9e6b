//! 输入校验：URL、邮箱、评论署名与注册用户名

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::errors::{CommentaryError, Result};

/// URL 验证错误
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    DangerousProtocol(String),
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::DangerousProtocol(proto) => write!(f, "Dangerous protocol blocked: {}", proto),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

const DANGEROUS_PROTOCOLS: &[&str] = &["javascript:", "data:", "file:", "vbscript:", "blob:"];

pub const USER_NAME_MAX_CHARS: usize = 50;
pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const BIO_MAX_CHARS: usize = 500;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+$")
        .expect("static regex")
});
static USER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("static regex"));
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+\-]+$").expect("static regex"));

/// 只接受绝对的 http(s) URL
pub fn validate_url(url: &str) -> std::result::Result<(), UrlValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let url_lower = url.to_lowercase();
    if let Some(proto) = DANGEROUS_PROTOCOLS.iter().find(|p| url_lower.starts_with(**p)) {
        return Err(UrlValidationError::DangerousProtocol(proto.to_string()));
    }
    if !url_lower.starts_with("http://") && !url_lower.starts_with("https://") {
        let proto = url_lower
            .split(':')
            .next()
            .map(|s| format!("{}:", s))
            .unwrap_or_default();
        return Err(UrlValidationError::InvalidProtocol(proto));
    }

    let parsed = Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::InvalidFormat("missing host".to_string()));
    }
    Ok(())
}

/// 可选的主页 / 个人网站；空字符串视为未填写
pub fn normalize_optional_url(value: Option<&str>) -> Result<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(url) => {
            validate_url(url).map_err(|_| CommentaryError::validation("Enter a valid URL."))?;
            Ok(Some(url.to_string()))
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CommentaryError::validation("Email is required"));
    }
    if !is_valid_email(email) {
        return Err(CommentaryError::validation("Enter a valid email address."));
    }
    Ok(email.to_string())
}

/// 评论署名：1..=50 个字母或数字
pub fn validate_user_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CommentaryError::validation("User name is required"));
    }
    if name.chars().count() > USER_NAME_MAX_CHARS {
        return Err(CommentaryError::validation(format!(
            "User name cannot exceed {} characters",
            USER_NAME_MAX_CHARS
        )));
    }
    if !USER_NAME_RE.is_match(name) {
        return Err(CommentaryError::validation(
            "User name can only contain letters and numbers",
        ));
    }
    Ok(name.to_string())
}

/// 注册用户名：1..=150 个字母、数字或 `. @ + - _`
pub fn validate_username(username: &str) -> Result<String> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > USERNAME_MAX_CHARS {
        return Err(CommentaryError::validation(format!(
            "Username must be between 1 and {} characters",
            USERNAME_MAX_CHARS
        )));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(CommentaryError::validation(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(username.to_string())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(CommentaryError::validation(format!(
            "Ensure this field has at least {} characters.",
            PASSWORD_MIN_CHARS
        )));
    }
    Ok(())
}

pub fn validate_bio(bio: &str) -> Result<()> {
    if bio.chars().count() > BIO_MAX_CHARS {
        return Err(CommentaryError::validation(format!(
            "Bio cannot exceed {} characters",
            BIO_MAX_CHARS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com/path?query=1").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
    }

    #[test]
    fn test_rejected_urls() {
        assert!(matches!(
            validate_url("javascript:alert(1)"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert_eq!(validate_url("  "), Err(UrlValidationError::EmptyUrl));
        assert!(validate_url("http://").is_err());
    }

    #[test]
    fn test_optional_url() {
        assert_eq!(normalize_optional_url(None).unwrap(), None);
        assert_eq!(normalize_optional_url(Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_optional_url(Some("https://a.dev")).unwrap(),
            Some("https://a.dev".to_string())
        );
        assert!(normalize_optional_url(Some("a.dev")).is_err());
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@@example.com"));
        assert_eq!(validate_email(" a@b.io ").unwrap(), "a@b.io");
    }

    #[test]
    fn test_user_name() {
        assert_eq!(validate_user_name("Alice42").unwrap(), "Alice42");
        assert_eq!(
            validate_user_name("alice_42").unwrap_err().message(),
            "User name can only contain letters and numbers"
        );
        assert!(validate_user_name("").is_err());
        assert!(validate_user_name(&"a".repeat(51)).is_err());
        assert!(validate_user_name(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_username() {
        assert!(validate_username("john.doe@home+1").is_ok());
        assert!(validate_username("with space").is_err());
        assert!(validate_username(&"u".repeat(151)).is_err());
    }

    #[test]
    fn test_password_and_bio() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_bio(&"x".repeat(500)).is_ok());
        assert!(validate_bio(&"x".repeat(501)).is_err());
    }
}
