//! 健康检查与限流集成测试

mod common;

use actix_web::test::{self, TestRequest};

use commentary::config::{RateLimitRule, RateLimitsConfig};
use common::*;

#[actix_web::test]
async fn test_health_check_reports_storage() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;

    let req = TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["checks"]["storage"]["status"], "healthy");
    assert!(body["data"]["uptime"].is_u64());
}

#[actix_web::test]
async fn test_liveness_and_readiness() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;

    let req = TestRequest::get().uri("/health/live").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(&test::read_body(resp).await[..], b"OK");
}

#[actix_web::test]
async fn test_captcha_rate_limit_per_ip() {
    let env = TestEnv::with_limits(RateLimitsConfig {
        enabled: true,
        captcha: RateLimitRule {
            replenish_ms: 60_000,
            burst: 1,
        },
        ..RateLimitsConfig::default()
    })
    .await;
    let app = init_app(&env).await;

    let captcha_from = |peer: &str| {
        TestRequest::post()
            .uri(&api("/captcha/generate/"))
            .peer_addr(peer.parse().unwrap())
            .to_request()
    };

    let resp = test::call_service(&app, captcha_from(PEER)).await;
    assert_eq!(resp.status(), 201);
    let resp = test::call_service(&app, captcha_from(PEER)).await;
    assert_eq!(resp.status(), 429);

    // 其他 IP 不受影响
    let resp = test::call_service(&app, captcha_from("198.51.100.8:40000")).await;
    assert_eq!(resp.status(), 201);
}
