//! 集成测试公共环境
//!
//! 每个测试使用独立的临时 SQLite 数据库和媒体目录。

#![allow(dead_code)]

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::test::{self, TestRequest};
use actix_web::{App, Error, web};
use chrono::Utc;
use serde_json::{Value, json};
use tempfile::TempDir;

use commentary::analytics::{EventSink, EventTracker};
use commentary::api::services::ApiRateLimits;
use commentary::config::{DatabaseConfig, RateLimitsConfig, StaticConfig};
use commentary::runtime::lifetime::startup::AppServices;
use commentary::runtime::modes::server::configure_app;
use commentary::storage::{SeaOrmStorage, StorageFactory};

pub const API: &str = "/api";
pub const PEER: &str = "198.51.100.7:40000";

pub struct TestEnv {
    pub services: AppServices,
    pub storage: Arc<SeaOrmStorage>,
    pub limits: ApiRateLimits,
    _dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_limits(RateLimitsConfig {
            enabled: false,
            ..RateLimitsConfig::default()
        })
        .await
    }

    pub async fn with_limits(rate_limits: RateLimitsConfig) -> Self {
        let dir = TempDir::new().expect("创建临时目录失败");
        let db_path = dir.path().join("test.db");
        let database = DatabaseConfig {
            database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
            ..DatabaseConfig::default()
        };
        let storage = StorageFactory::create_with(&database)
            .await
            .expect("创建存储失败");

        let mut config = StaticConfig::default();
        config.uploads.media_root = dir.path().join("media").display().to_string();

        // 测试中同步断言计数，事件采集关闭
        let sink: Arc<dyn EventSink> = storage.clone();
        let services = AppServices::build(
            storage.clone(),
            EventTracker::disabled(sink),
            &config,
            Utc::now(),
        );

        Self {
            services,
            storage,
            limits: ApiRateLimits::from_config(&rate_limits),
            _dir: dir,
        }
    }

    /// 上传文件落盘的根目录
    pub fn media_root(&self) -> std::path::PathBuf {
        self._dir.path().join("media")
    }
}

/// 按生产配置搭建测试 App
pub async fn init_app(
    env: &TestEnv,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = Error>
{
    let services = env.services.clone();
    let limits = env.limits.clone();
    test::init_service(
        App::new().configure(move |cfg: &mut web::ServiceConfig| {
            configure_app(cfg, &services, &limits, API)
        }),
    )
    .await
}

pub fn api(path: &str) -> String {
    format!("{}{}", API, path)
}

pub async fn read_json<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// 解出 "a + b = ?" / "a - b = ?" 形式的题目
pub fn solve_challenge(challenge: &str) -> String {
    let parts: Vec<&str> = challenge.split_whitespace().collect();
    let a: i64 = parts[0].parse().unwrap();
    let b: i64 = parts[2].parse().unwrap();
    match parts[1] {
        "+" => (a + b).to_string(),
        "-" => (a - b).to_string(),
        op => panic!("unexpected operator {}", op),
    }
}

/// 申请验证码并返回 (token, 答案)
pub async fn fresh_captcha<S, B>(app: &S) -> (String, String)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = TestRequest::post()
        .uri(&api("/captcha/generate/"))
        .peer_addr(PEER.parse().unwrap())
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201);
    let body = read_json(resp).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let answer = solve_challenge(body["data"]["challenge"].as_str().unwrap());
    (token, answer)
}

/// 发表评论（parent 为 None 时为顶层评论），返回响应 JSON
pub async fn post_comment<S, B>(app: &S, user_name: &str, text: &str, parent: Option<i64>) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let (token, answer) = fresh_captcha(app).await;
    let req = TestRequest::post()
        .uri(&api("/comments/"))
        .peer_addr(PEER.parse().unwrap())
        .set_json(json!({
            "user_name": user_name,
            "email": format!("{}@example.com", user_name.to_lowercase()),
            "text": text,
            "parent": parent,
            "captcha_token": token,
            "captcha_solution": answer,
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = read_json(resp).await;
    assert_eq!(status, 201, "unexpected response: {}", body);
    body
}

/// 注册用户并返回 access token
pub async fn register<S, B>(app: &S, username: &str, password: &str) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = TestRequest::post()
        .uri(&api("/auth/register/"))
        .peer_addr(PEER.parse().unwrap())
        .set_json(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password,
            "password_confirm": password,
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = read_json(resp).await;
    assert_eq!(status, 201, "unexpected response: {}", body);
    body
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// 创建 staff 账户并登录，返回 access token
pub async fn staff_token<S, B>(env: &TestEnv, app: &S) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    env.services
        .users
        .create_admin("moderator", "moderator@example.com", "moderator-pass")
        .await
        .expect("创建 staff 失败");

    let req = TestRequest::post()
        .uri(&api("/auth/login/"))
        .set_json(json!({"username": "moderator", "password": "moderator-pass"}))
        .to_request();
    let body = read_json(test::call_service(app, req).await).await;
    body["data"]["tokens"]["access"]
        .as_str()
        .expect("login should return an access token")
        .to_string()
}
