//! 上传与文件端点

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::http::header::CACHE_CONTROL;
use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use tracing::{info, trace};

use crate::api::middleware::AuthUser;
use crate::errors::CommentaryError;
use crate::services::FileService;
use crate::services::file_service::DEFAULT_CLEANUP_DAYS;

use super::helpers::{
    MultipartLimits, api_created, api_result, binary_response, client_info, error_from_commentary,
    read_multipart,
};
use super::types::{CleanupBody, FileListQuery, batch_upload_limits, max_upload_bytes};

const SINGLE_FIELD: &str = "file";
const BULK_FIELD: &str = "files";
const THUMBNAIL_CACHE_CONTROL: &str = "public, max-age=86400";

/// 单文件上传
pub async fn upload_file(
    req: HttpRequest,
    payload: Multipart,
    user: Option<AuthUser>,
    files: web::Data<Arc<FileService>>,
) -> ActixResult<impl Responder> {
    let mut form = match read_multipart(payload, MultipartLimits::single(max_upload_bytes())).await {
        Ok(form) => form,
        Err(e) => return Ok(error_from_commentary(&e)),
    };
    let Some(file) = form.take_files(SINGLE_FIELD).into_iter().next() else {
        return Ok(error_from_commentary(&CommentaryError::validation(
            "No file was submitted",
        )));
    };

    trace!("API: upload '{}' ({} bytes)", file.name, file.size());
    let client = client_info(&req, user.as_ref());
    Ok(api_created(files.process_upload(file, &client).await))
}

/// 批量上传（1..=10 个文件）
pub async fn bulk_upload(
    req: HttpRequest,
    payload: Multipart,
    user: Option<AuthUser>,
    files: web::Data<Arc<FileService>>,
) -> ActixResult<impl Responder> {
    let mut form = match read_multipart(payload, batch_upload_limits()).await {
        Ok(form) => form,
        Err(e) => return Ok(error_from_commentary(&e)),
    };
    let incoming = form.take_files(BULK_FIELD);
    let client = client_info(&req, user.as_ref());
    let result = files.process_bulk(incoming, &client).await;
    if let Ok(ref report) = result {
        info!(
            "API: bulk upload finished, {} uploaded, {} failed",
            report.uploaded, report.failed
        );
    }
    Ok(api_result(result))
}

pub async fn list_files(
    query: web::Query<FileListQuery>,
    files: web::Data<Arc<FileService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        files
            .list(
                &query.filter(),
                query.ordering(),
                query.page(),
                query.page_size(),
            )
            .await,
    ))
}

pub async fn file_detail(
    path: web::Path<i64>,
    files: web::Data<Arc<FileService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(files.detail(path.into_inner()).await))
}

pub async fn download_file(
    path: web::Path<i64>,
    files: web::Data<Arc<FileService>>,
) -> ActixResult<impl Responder> {
    Ok(match files.download(path.into_inner()).await {
        Ok(content) => binary_response(
            &content.content_type,
            content.body,
            Some(&content.filename),
        ),
        Err(e) => error_from_commentary(&e),
    })
}

pub async fn file_thumbnail(
    path: web::Path<i64>,
    files: web::Data<Arc<FileService>>,
) -> ActixResult<impl Responder> {
    Ok(match files.thumbnail(path.into_inner()).await {
        Ok(content) => {
            let mut response = binary_response(&content.content_type, content.body, None);
            response.headers_mut().insert(
                CACHE_CONTROL,
                actix_web::http::header::HeaderValue::from_static(THUMBNAIL_CACHE_CONTROL),
            );
            response
        }
        Err(e) => error_from_commentary(&e),
    })
}

pub async fn file_preview(
    path: web::Path<i64>,
    files: web::Data<Arc<FileService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(files.preview(path.into_inner()).await))
}

pub async fn file_stats(files: web::Data<Arc<FileService>>) -> ActixResult<impl Responder> {
    Ok(api_result(files.stats().await))
}

/// 清理旧文件与失败上传（staff）
pub async fn cleanup_files(
    staff: AuthUser,
    body: web::Bytes,
    files: web::Data<Arc<FileService>>,
) -> ActixResult<impl Responder> {
    let days = match CleanupBody::from_bytes(&body) {
        Ok(parsed) => parsed.days.unwrap_or(DEFAULT_CLEANUP_DAYS),
        Err(e) => return Ok(error_from_commentary(&e)),
    };
    info!("API: {} requested file cleanup ({} days)", staff.username, days);
    Ok(api_result(files.cleanup(days).await))
}
