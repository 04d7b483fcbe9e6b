//! 账户、个人资料与用户发现端点

use std::sync::Arc;

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use tracing::info;

use crate::api::middleware::AuthUser;
use crate::services::{TopPeriod, UserService};

use super::helpers::{api_created, api_result, client_info};
use super::types::{
    ChangePasswordBody, LimitQuery, LoginBody, MessageResponse, PreferencesPatch, ProfilePatch,
    RefreshBody, RegisterBody, TopUsersQuery, UserSearchQuery, VerifyBody,
};

/// 个人动态默认条数
const DEFAULT_ACTIVITY_LIMIT: u64 = 20;
const MAX_ACTIVITY_LIMIT: u64 = 100;

// ============ 认证 ============

pub async fn register(
    req: HttpRequest,
    body: web::Json<RegisterBody>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let client = client_info(&req, None);
    Ok(api_created(users.register(body.into_inner().into(), &client).await))
}

pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginBody>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let client = client_info(&req, None);
    Ok(api_result(
        users.login(&body.username, &body.password, &client).await,
    ))
}

pub async fn refresh_token(
    body: web::Json<RefreshBody>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(users.refresh(&body.refresh).await))
}

pub async fn verify_token(
    body: web::Json<VerifyBody>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(users.verify(&body.token)))
}

// ============ 个人资料 ============

pub async fn get_profile(
    user: AuthUser,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(users.profile(user.id).await))
}

pub async fn update_profile(
    user: AuthUser,
    body: web::Json<ProfilePatch>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        users.update_profile(user.id, body.into_inner().into()).await,
    ))
}

pub async fn get_preferences(
    user: AuthUser,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(users.preferences(user.id).await))
}

pub async fn update_preferences(
    user: AuthUser,
    body: web::Json<PreferencesPatch>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        users
            .update_preferences(user.id, body.into_inner().into())
            .await,
    ))
}

pub async fn change_password(
    user: AuthUser,
    body: web::Json<ChangePasswordBody>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let result = users
        .change_password(user.id, body.into_inner().into())
        .await
        .map(|()| {
            info!("API: password changed for {}", user.username);
            MessageResponse::new("Password changed successfully")
        });
    Ok(api_result(result))
}

pub async fn profile_stats(
    user: AuthUser,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(users.stats(user.id).await))
}

pub async fn profile_activity(
    user: AuthUser,
    query: web::Query<LimitQuery>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT) as usize;
    Ok(api_result(users.activity(user.id, limit).await))
}

// ============ 用户发现 ============

pub async fn public_profile(
    path: web::Path<String>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(users.public_profile(&path.into_inner()).await))
}

pub async fn top_users(
    query: web::Query<TopUsersQuery>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let period = TopPeriod::parse(query.period.as_deref());
    Ok(api_result(users.top_users(period, query.limit).await))
}

pub async fn search_users(
    query: web::Query<UserSearchQuery>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(users.search(&query.q).await))
}
