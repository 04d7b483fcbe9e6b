//! JWT authentication middleware
//!
//! 校验 `Authorization: Bearer <access>`，成功后把 [`AuthUser`] 放入
//! request extensions，handler 通过提取器获取当前用户。

use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::{Method, StatusCode, header::CONTENT_TYPE},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::{debug, info, trace};

use crate::api::constants::BEARER_PREFIX;
use crate::api::jwt::{AccessClaims, get_jwt_service};
use crate::api::services::error_code::ErrorCode;
use crate::api::services::types::ApiResponse;
use crate::errors::CommentaryError;

/// 当前登录用户
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

impl AuthUser {
    fn from_claims(claims: &AccessClaims) -> Option<Self> {
        Some(Self {
            id: claims.user_id()?,
            username: claims.username.clone(),
            is_staff: claims.staff,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = CommentaryError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| CommentaryError::unauthorized("Authentication credentials were not provided.")),
        )
    }
}

/// 认证要求
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AuthMode {
    /// 有有效 token 时识别用户，否则匿名放行
    Optional,
    Required,
    Staff,
}

/// JWT authentication middleware
#[derive(Clone)]
pub struct JwtAuth {
    mode: AuthMode,
}

impl JwtAuth {
    pub fn optional() -> Self {
        Self {
            mode: AuthMode::Optional,
        }
    }

    pub fn required() -> Self {
        Self {
            mode: AuthMode::Required,
        }
    }

    /// 需要 staff 权限
    pub fn staff() -> Self {
        Self {
            mode: AuthMode::Staff,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
            mode: self.mode,
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
    mode: AuthMode,
}

impl<S, B> JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    /// Handle OPTIONS requests for CORS preflight
    fn handle_options_request(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        req.into_response(
            HttpResponse::NoContent()
                .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
                .finish()
                .map_into_right_body(),
        )
    }

    fn reject(
        req: ServiceRequest,
        status: StatusCode,
        code: ErrorCode,
        message: &str,
    ) -> ServiceResponse<EitherBody<B>> {
        req.into_response(
            HttpResponse::build(status)
                .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
                .json(ApiResponse::<()> {
                    code: code as i32,
                    message: message.to_string(),
                    data: None,
                })
                .map_into_right_body(),
        )
    }

    /// 从 Authorization header 提取 Bearer token
    fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix(BEARER_PREFIX))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let mode = self.mode;

        Box::pin(async move {
            if req.method() == Method::OPTIONS {
                return Ok(Self::handle_options_request(req));
            }

            let validated = Self::extract_bearer_token(&req)
                .map(|token| get_jwt_service().validate_access_token(&token));

            let user = match validated {
                Some(Ok(claims)) => AuthUser::from_claims(&claims),
                Some(Err(e)) => {
                    if mode == AuthMode::Optional {
                        debug!("Ignoring invalid bearer token on optional route: {}", e);
                        None
                    } else {
                        info!("Bearer token validation failed: {}", e);
                        let err = CommentaryError::from(e);
                        return Ok(Self::reject(
                            req,
                            StatusCode::UNAUTHORIZED,
                            ErrorCode::from(&err),
                            err.message(),
                        ));
                    }
                }
                None => None,
            };

            match (mode, user) {
                (AuthMode::Staff, Some(user)) if !user.is_staff => {
                    info!("User {} denied access to staff route {}", user.username, req.path());
                    Ok(Self::reject(
                        req,
                        StatusCode::FORBIDDEN,
                        ErrorCode::Forbidden,
                        "You do not have permission to perform this action.",
                    ))
                }
                (_, Some(user)) => {
                    trace!("Authenticated request from {}", user.username);
                    req.extensions_mut().insert(user);
                    Ok(srv.call(req).await?.map_into_left_body())
                }
                (AuthMode::Optional, None) => Ok(srv.call(req).await?.map_into_left_body()),
                (_, None) => Ok(Self::reject(
                    req,
                    StatusCode::UNAUTHORIZED,
                    ErrorCode::Unauthorized,
                    "Authentication credentials were not provided.",
                )),
            }
        })
    }
}
