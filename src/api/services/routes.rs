//! API 路由配置
//!
//! 按模块拆分 `/api` 下的路由。整个 API scope 套一层可选 JWT 认证，
//! 需要登录或 staff 的路由再单独加一层。

use actix_web::dev::HttpServiceFactory;
use actix_web::{HttpRequest, HttpResponse, error, web};

use crate::api::middleware::JwtAuth;
use crate::errors::CommentaryError;

use super::helpers::error_from_commentary;
use super::rate_limit::ApiRateLimits;
use super::{analytics, comments, files, users};

/// JSON 请求体解析失败时返回统一信封
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        let wrapped = CommentaryError::validation(format!("Invalid JSON: {}", err));
        error::InternalError::from_response(err, error_from_commentary(&wrapped)).into()
    })
}

/// 查询参数解析失败时返回统一信封
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| {
        let wrapped = CommentaryError::validation(format!("Invalid query parameters: {}", err));
        error::InternalError::from_response(err, error_from_commentary(&wrapped)).into()
    })
}

/// 未匹配的路由
pub async fn not_found() -> HttpResponse {
    error_from_commentary(&CommentaryError::not_found("Not found"))
}

/// 评论路由 `/comments`
///
/// 静态路径必须在 `{id}` 之前注册。
pub fn comments_routes(limits: &ApiRateLimits) -> actix_web::Scope {
    web::scope("/comments")
        .route("/", web::get().to(comments::list_comments))
        .route(
            "/",
            web::post()
                .to(comments::create_comment)
                .wrap(limits.comment_create.middleware()),
        )
        .route(
            "/preview/",
            web::post()
                .to(comments::preview_comment)
                .wrap(limits.preview.middleware()),
        )
        .route("/stats/", web::get().to(comments::comment_stats))
        .route("/trending/", web::get().to(comments::trending_comments))
        .route(
            "/history/{user_name}/",
            web::get().to(comments::comment_history),
        )
        .route(r"/{id:\d+}/", web::get().to(comments::comment_detail))
        .route(
            r"/{id:\d+}/reply/",
            web::post()
                .to(comments::reply_comment)
                .wrap(limits.comment_reply.middleware()),
        )
        .route(
            r"/{id:\d+}/like/",
            web::post()
                .to(comments::like_comment)
                .wrap(limits.comment_like.middleware()),
        )
        .route(r"/{id:\d+}/thread/", web::get().to(comments::comment_thread))
        .route(
            r"/{id:\d+}/spam/",
            web::post().to(comments::mark_spam).wrap(JwtAuth::staff()),
        )
        .route(
            r"/{id:\d+}/spam-score/",
            web::get().to(comments::spam_score).wrap(JwtAuth::staff()),
        )
}

/// 验证码路由 `/captcha`
pub fn captcha_routes(limits: &ApiRateLimits) -> actix_web::Scope {
    web::scope("/captcha")
        .route(
            "/generate/",
            web::post()
                .to(comments::generate_captcha)
                .wrap(limits.captcha.middleware()),
        )
        .route("/image/{token}/", web::get().to(comments::captcha_image))
}

/// 认证路由 `/auth`
pub fn auth_routes(limits: &ApiRateLimits) -> actix_web::Scope {
    web::scope("/auth")
        .route(
            "/register/",
            web::post()
                .to(users::register)
                .wrap(limits.register.middleware()),
        )
        .route(
            "/login/",
            web::post().to(users::login).wrap(limits.login.middleware()),
        )
        .route("/token/refresh/", web::post().to(users::refresh_token))
        .route("/token/verify/", web::post().to(users::verify_token))
}

/// 个人资料路由 `/profile`（需登录）
pub fn profile_routes(limits: &ApiRateLimits) -> impl HttpServiceFactory + use<> {
    web::scope("/profile")
        .wrap(JwtAuth::required())
        .route("/", web::get().to(users::get_profile))
        .route("/", web::patch().to(users::update_profile))
        .route("/preferences/", web::get().to(users::get_preferences))
        .route("/preferences/", web::patch().to(users::update_preferences))
        .route(
            "/change-password/",
            web::post()
                .to(users::change_password)
                .wrap(limits.change_password.middleware()),
        )
        .route("/stats/", web::get().to(users::profile_stats))
        .route("/activity/", web::get().to(users::profile_activity))
}

/// 用户发现路由 `/users`
pub fn users_routes() -> actix_web::Scope {
    web::scope("/users")
        .route("/top/", web::get().to(users::top_users))
        .route("/search/", web::get().to(users::search_users))
        .route("/{username}/", web::get().to(users::public_profile))
}

/// 上传路由 `/upload`
pub fn upload_routes(limits: &ApiRateLimits) -> actix_web::Scope {
    web::scope("/upload")
        .route(
            "/",
            web::post()
                .to(files::upload_file)
                .wrap(limits.upload.middleware()),
        )
        .route(
            "/bulk/",
            web::post()
                .to(files::bulk_upload)
                .wrap(limits.bulk_upload.middleware()),
        )
}

/// 文件路由 `/files`
pub fn files_routes() -> actix_web::Scope {
    web::scope("/files")
        .route("/", web::get().to(files::list_files))
        .route("/stats/", web::get().to(files::file_stats))
        .route(
            "/cleanup/",
            web::post().to(files::cleanup_files).wrap(JwtAuth::staff()),
        )
        .route(r"/{id:\d+}/", web::get().to(files::file_detail))
        .route(r"/{id:\d+}/download/", web::get().to(files::download_file))
        .route(r"/{id:\d+}/thumbnail/", web::get().to(files::file_thumbnail))
        .route(r"/{id:\d+}/preview/", web::get().to(files::file_preview))
}

/// 分析路由 `/analytics`（除 popular 外均需 staff）
pub fn analytics_routes() -> actix_web::Scope {
    web::scope("/analytics")
        .route("/popular/", web::get().to(analytics::popular))
        .route(
            "/dashboard/",
            web::get().to(analytics::dashboard).wrap(JwtAuth::staff()),
        )
        .route(
            "/realtime/",
            web::get().to(analytics::realtime).wrap(JwtAuth::staff()),
        )
        .route(
            "/health/",
            web::get().to(analytics::system_health).wrap(JwtAuth::staff()),
        )
        .route(
            "/stats/daily/",
            web::get().to(analytics::daily_stats).wrap(JwtAuth::staff()),
        )
        .route("/events/", web::get().to(analytics::events).wrap(JwtAuth::staff()))
        .route(
            "/activity/",
            web::get().to(analytics::activity).wrap(JwtAuth::staff()),
        )
        .route("/search/", web::get().to(analytics::search).wrap(JwtAuth::staff()))
        .route(
            "/users/{user_identifier}/",
            web::get().to(analytics::user_statistics).wrap(JwtAuth::staff()),
        )
        .route("/export/", web::get().to(analytics::export).wrap(JwtAuth::staff()))
        .route(
            "/rollup/",
            web::post().to(analytics::trigger_rollup).wrap(JwtAuth::staff()),
        )
}

/// `/api` 下全部路由
pub fn api_routes(prefix: &str, limits: &ApiRateLimits) -> impl HttpServiceFactory + use<> {
    web::scope(prefix)
        .wrap(JwtAuth::optional())
        .app_data(json_config())
        .app_data(query_config())
        .service(comments_routes(limits))
        .service(captcha_routes(limits))
        .service(auth_routes(limits))
        .service(profile_routes(limits))
        .service(users_routes())
        .service(upload_routes(limits))
        .service(files_routes())
        .service(analytics_routes())
        .default_service(web::to(not_found))
}
