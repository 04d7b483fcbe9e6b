//! 评论与验证码端点

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use tracing::{info, trace};

use crate::api::middleware::AuthUser;
use crate::errors::Result;
use crate::services::{CaptchaService, CommentService, NewComment};

use super::helpers::{
    api_created, api_result, binary_response, client_info, error_from_commentary, is_multipart,
    read_json, read_multipart,
};
use super::types::{
    CommentListQuery, CreateCommentRequest, LimitQuery, PreviewRequest, batch_upload_limits,
    max_upload_bytes,
};

/// multipart 请求中附件的字段名
const ATTACHMENT_FIELD: &str = "uploaded_files";

/// JSON 或 multipart（带附件）两种请求体
async fn read_comment_body(req: &HttpRequest, payload: web::Payload) -> Result<NewComment> {
    if is_multipart(req) {
        let mut form =
            read_multipart(Multipart::new(req.headers(), payload), batch_upload_limits()).await?;
        let mut input: NewComment = CreateCommentRequest::from_fields(&form.fields)?.into();
        input.files = form.take_files(ATTACHMENT_FIELD);
        Ok(input)
    } else {
        let body: CreateCommentRequest = read_json(payload, max_upload_bytes()).await?;
        Ok(body.into())
    }
}

/// 顶层评论列表
pub async fn list_comments(
    req: HttpRequest,
    query: web::Query<CommentListQuery>,
    user: Option<AuthUser>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    trace!("API: list comments with {:?}", query);
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(e) => return Ok(error_from_commentary(&e)),
    };
    let client = client_info(&req, user.as_ref());
    Ok(api_result(
        comments
            .list(filter, query.ordering(), query.page, query.page_size, &client)
            .await,
    ))
}

/// 创建评论（可带 `parent`）
pub async fn create_comment(
    req: HttpRequest,
    payload: web::Payload,
    user: Option<AuthUser>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    let input = match read_comment_body(&req, payload).await {
        Ok(input) => input,
        Err(e) => return Ok(error_from_commentary(&e)),
    };
    let client = client_info(&req, user.as_ref());
    let result = comments.create(input, &client).await;
    if let Ok(ref created) = result {
        info!(
            "API: comment {} created by '{}'",
            created.comment.id, created.comment.user_name
        );
    }
    Ok(api_created(result))
}

pub async fn reply_comment(
    req: HttpRequest,
    path: web::Path<i64>,
    payload: web::Payload,
    user: Option<AuthUser>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    let parent_id = path.into_inner();
    let input = match read_comment_body(&req, payload).await {
        Ok(input) => input,
        Err(e) => return Ok(error_from_commentary(&e)),
    };
    let client = client_info(&req, user.as_ref());
    Ok(api_created(comments.reply(parent_id, input, &client).await))
}

pub async fn comment_detail(
    path: web::Path<i64>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(comments.detail(path.into_inner()).await))
}

pub async fn comment_thread(
    path: web::Path<i64>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(comments.thread(path.into_inner()).await))
}

pub async fn like_comment(
    req: HttpRequest,
    path: web::Path<i64>,
    user: Option<AuthUser>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    let client = client_info(&req, user.as_ref());
    Ok(api_result(comments.like(path.into_inner(), &client).await))
}

pub async fn preview_comment(
    body: web::Json<PreviewRequest>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(comments.preview(&body.text)))
}

pub async fn comment_stats(
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(comments.stats().await))
}

pub async fn trending_comments(
    query: web::Query<LimitQuery>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(comments.trending(query.limit).await))
}

pub async fn comment_history(
    path: web::Path<String>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(comments.history(&path.into_inner()).await))
}

/// 标记为垃圾评论（staff）
pub async fn mark_spam(
    path: web::Path<i64>,
    moderator: AuthUser,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    info!("API: {} marks comment {} as spam", moderator.username, id);
    Ok(api_result(comments.mark_spam(id, Some(moderator.id)).await))
}

pub async fn spam_score(
    path: web::Path<i64>,
    comments: web::Data<Arc<CommentService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(comments.spam_report(path.into_inner()).await))
}

// ============ 验证码 ============

pub async fn generate_captcha(
    req: HttpRequest,
    captcha: web::Data<Arc<CaptchaService>>,
) -> ActixResult<impl Responder> {
    let client = client_info(&req, None);
    Ok(api_created(captcha.generate(client.ip.as_deref()).await))
}

pub async fn captcha_image(
    path: web::Path<String>,
    captcha: web::Data<Arc<CaptchaService>>,
) -> ActixResult<impl Responder> {
    Ok(match captcha.render_image(&path.into_inner()).await {
        Ok(png) => binary_response("image/png", png, None),
        Err(e) => error_from_commentary(&e),
    })
}
