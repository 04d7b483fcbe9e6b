//! API 帮助函数：响应信封、错误映射、请求方信息与请求体读取

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::http::header::{AsHeaderName, CONTENT_TYPE, REFERER, USER_AGENT};
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::api::constants::{SESSION_ID_HEADER, SESSION_ID_MAX_CHARS};
use crate::api::middleware::AuthUser;
use crate::errors::{CommentaryError, Result};
use crate::services::{ClientInfo, IncomingFile};
use crate::utils::ip::extract_client_ip;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header((CONTENT_TYPE, "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 201 Created
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 CommentaryError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_commentary(err: &CommentaryError) -> HttpResponse {
    if err.is_server_error() {
        error!("Request failed: {}", err);
    }
    error_response(err.http_status(), ErrorCode::from(err), err.message())
}

/// 统一 Result → HttpResponse 转换
///
/// 成功时返回 200 OK + JSON 数据，失败时自动映射 CommentaryError。
pub fn api_result<T, E>(result: std::result::Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<CommentaryError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_commentary(&e.into()),
    }
}

/// 同 [`api_result`]，成功时返回 201
pub fn api_created<T, E>(result: std::result::Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<CommentaryError>,
{
    match result {
        Ok(data) => created_response(data),
        Err(e) => error_from_commentary(&e.into()),
    }
}

/// 二进制响应（下载、缩略图、验证码图片、CSV）
pub fn binary_response(
    content_type: &str,
    body: Vec<u8>,
    attachment: Option<&str>,
) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    builder.content_type(content_type.to_string());
    if let Some(filename) = attachment {
        builder.insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename.replace('"', "")),
        ));
    }
    builder.body(body)
}

/// 提取器失败（AuthUser 等）同样返回统一信封
impl ResponseError for CommentaryError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        error_from_commentary(self)
    }
}

// ============ 请求方信息 ============

fn header_str(req: &HttpRequest, name: impl AsHeaderName) -> &str {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
}

fn valid_session_id(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= SESSION_ID_MAX_CHARS
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// 组装事件采集与审计所需的请求方信息
///
/// 会话 ID 优先取客户端的 `x-session-id`，否则按 IP + UA 派生。
pub fn client_info(req: &HttpRequest, user: Option<&AuthUser>) -> ClientInfo {
    let ip = extract_client_ip(req);
    let user_agent = header_str(req, USER_AGENT).to_string();
    let referer = header_str(req, REFERER).to_string();

    let session_id = match header_str(req, SESSION_ID_HEADER).trim() {
        raw if valid_session_id(raw) => raw.to_string(),
        _ => ClientInfo::derive_session_id(ip.as_deref(), &user_agent),
    };

    let username = user.map(|u| u.username.clone());
    let user_identifier = username
        .clone()
        .or_else(|| ip.clone())
        .unwrap_or_default();

    ClientInfo {
        ip,
        user_agent,
        referer,
        username,
        user_identifier,
        session_id,
    }
}

// ============ 请求体读取 ============

pub fn is_multipart(req: &HttpRequest) -> bool {
    header_str(req, CONTENT_TYPE)
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
}

/// 读取 JSON 请求体（超出上限返回 413）
pub async fn read_json<T: DeserializeOwned>(mut payload: web::Payload, limit: usize) -> Result<T> {
    let mut body = bytes::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk
            .map_err(|e| CommentaryError::validation(format!("Invalid request body: {}", e)))?;
        if body.len() + chunk.len() > limit {
            return Err(CommentaryError::payload_too_large("Request body is too large"));
        }
        body.extend_from_slice(&chunk);
    }
    let body: &[u8] = if body.is_empty() { b"{}" } else { &body };
    serde_json::from_slice(body)
        .map_err(|e| CommentaryError::validation(format!("Invalid JSON: {}", e)))
}

/// 解析后的 multipart 表单
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    /// (字段名, 文件)
    pub files: Vec<(String, IncomingFile)>,
}

impl MultipartForm {
    /// 取出指定字段名下的全部文件
    pub fn take_files(&mut self, field: &str) -> Vec<IncomingFile> {
        let (matched, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(name, _)| name == field);
        self.files = rest;
        matched.into_iter().map(|(_, file)| file).collect()
    }
}

/// multipart 读取上限：单个字段与整个请求分别计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipartLimits {
    pub part_bytes: usize,
    pub total_bytes: usize,
}

impl MultipartLimits {
    /// 单文件请求：整个请求共用一个上限
    pub fn single(max_bytes: usize) -> Self {
        Self {
            part_bytes: max_bytes,
            total_bytes: max_bytes,
        }
    }

    /// 多文件请求：每个字段不超过 `part_bytes`，总量按 `files` 个满额文件放宽
    pub fn batch(part_bytes: usize, max_file_bytes: usize, files: usize) -> Self {
        Self {
            part_bytes,
            total_bytes: max_file_bytes.saturating_mul(files).max(part_bytes),
        }
    }

    fn check(&self, part: usize, total: usize) -> Result<()> {
        if part > self.part_bytes {
            return Err(CommentaryError::payload_too_large(format!(
                "Request field exceeds {} bytes",
                self.part_bytes
            )));
        }
        if total > self.total_bytes {
            return Err(CommentaryError::payload_too_large(format!(
                "Request body exceeds {} bytes",
                self.total_bytes
            )));
        }
        Ok(())
    }
}

/// 读取 multipart 请求体；带文件名的字段视为文件，其余为文本字段
pub async fn read_multipart(mut payload: Multipart, limits: MultipartLimits) -> Result<MultipartForm> {
    let mut form = MultipartForm::default();
    let mut total = 0usize;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            warn!("Failed to parse multipart field: {}", e);
            CommentaryError::validation(format!("Invalid multipart data: {}", e))
        })?;

        let name = field.name().unwrap_or("").to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| {
                CommentaryError::validation(format!("Invalid multipart data: {}", e))
            })?;
            total += bytes.len();
            limits.check(data.len() + bytes.len(), total)?;
            data.extend_from_slice(&bytes);
        }

        match filename {
            Some(filename) => form.files.push((name, IncomingFile::new(filename, data))),
            None => {
                form.fields
                    .insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_json_response_structure() {
        let response = json_response(StatusCode::OK, ErrorCode::Success, "OK", Some("test_data"));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_created_response() {
        let response = created_response("created");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_api_result_maps_errors() {
        let ok: std::result::Result<i32, CommentaryError> = Ok(1);
        assert_eq!(api_result(ok).status(), StatusCode::OK);

        let missing: std::result::Result<i32, CommentaryError> =
            Err(CommentaryError::not_found("Comment not found"));
        assert_eq!(api_result(missing).status(), StatusCode::NOT_FOUND);

        let dup: std::result::Result<i32, CommentaryError> = Err(CommentaryError::conflict(
            "You have already liked this comment",
        ));
        assert_eq!(api_created(dup).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_binary_response_attachment() {
        let response = binary_response("text/csv", b"a,b".to_vec(), Some("daily.csv"));
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get("Content-Disposition")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(disposition, "attachment; filename=\"daily.csv\"");
    }

    #[test]
    fn test_client_info_uses_session_header() {
        let req = TestRequest::default()
            .insert_header(("user-agent", "tests"))
            .insert_header((SESSION_ID_HEADER, "abc-123"))
            .to_http_request();
        let info = client_info(&req, None);
        assert_eq!(info.session_id, "abc-123");
        assert_eq!(info.user_agent, "tests");
        assert!(info.username.is_none());
    }

    #[test]
    fn test_client_info_derives_session_and_identifier() {
        let req = TestRequest::default()
            .insert_header((SESSION_ID_HEADER, "bad id with spaces"))
            .to_http_request();
        let user = AuthUser {
            id: 1,
            username: "alice".to_string(),
            is_staff: false,
        };
        let info = client_info(&req, Some(&user));
        assert_eq!(info.session_id.len(), 32);
        assert_eq!(info.user_identifier, "alice");
        assert_eq!(info.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_multipart_take_files() {
        let mut form = MultipartForm::default();
        form.files
            .push(("files".into(), IncomingFile::new("a.txt", b"a".to_vec())));
        form.files
            .push(("other".into(), IncomingFile::new("b.txt", b"b".to_vec())));
        form.files
            .push(("files".into(), IncomingFile::new("c.txt", b"c".to_vec())));
        let taken = form.take_files("files");
        assert_eq!(taken.len(), 2);
        assert_eq!(form.files.len(), 1);
    }

    #[test]
    fn test_is_multipart() {
        let req = TestRequest::default()
            .insert_header(("content-type", "multipart/form-data; boundary=xyz"))
            .to_http_request();
        assert!(is_multipart(&req));
        let req = TestRequest::default()
            .insert_header(("content-type", "application/json"))
            .to_http_request();
        assert!(!is_multipart(&req));
    }

    #[test]
    fn test_multipart_limits_single() {
        let limits = MultipartLimits::single(100);
        assert!(limits.check(100, 100).is_ok());
        let err = limits.check(101, 101).unwrap_err();
        assert_eq!(err.http_status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_multipart_limits_batch_counts_parts_separately() {
        // 每个字段 ≤ 50，总量按 3 个 40 字节文件放宽到 120
        let limits = MultipartLimits::batch(50, 40, 3);
        assert_eq!(limits.total_bytes, 120);
        assert!(limits.check(40, 120).is_ok());
        assert!(limits.check(51, 51).is_err());
        assert!(limits.check(10, 121).is_err());

        // 总量不低于单字段上限
        assert_eq!(MultipartLimits::batch(500, 40, 3).total_bytes, 500);
    }
}
