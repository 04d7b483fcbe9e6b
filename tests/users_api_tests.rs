//! 用户账户 API 集成测试：注册、登录、令牌、个人资料与发现

mod common;

use actix_web::test::{self, TestRequest};
use serde_json::json;

use common::*;

#[actix_web::test]
async fn test_register_then_login() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;

    let body = register(&app, "alice", "correct-horse").await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert_eq!(body["data"]["user"]["is_staff"], false);
    assert!(body["data"]["tokens"]["access"].is_string());
    assert!(body["data"]["tokens"]["refresh"].is_string());

    let req = TestRequest::post()
        .uri(&api("/auth/login/"))
        .set_json(json!({"username": "alice", "password": "correct-horse"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
    assert!(body["data"]["user"]["last_login"].is_string());
}

#[actix_web::test]
async fn test_login_with_wrong_password() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    register(&app, "alice", "correct-horse").await;

    let req = TestRequest::post()
        .uri(&api("/auth/login/"))
        .set_json(json!({"username": "alice", "password": "battery-staple"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body = read_json(resp).await;
    assert_eq!(body["code"], 2000);
    assert!(body["data"].is_null());
}

#[actix_web::test]
async fn test_register_rejects_duplicates_and_mismatch() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    register(&app, "alice", "correct-horse").await;

    let req = TestRequest::post()
        .uri(&api("/auth/register/"))
        .set_json(json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "correct-horse",
            "password_confirm": "correct-horse",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    assert_eq!(read_json(resp).await["code"], 4001);

    let req = TestRequest::post()
        .uri(&api("/auth/register/"))
        .set_json(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "correct-horse",
            "password_confirm": "horse-correct",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(read_json(resp).await["message"], "Passwords don't match");

    let req = TestRequest::post()
        .uri(&api("/auth/register/"))
        .set_json(json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "short",
            "password_confirm": "short",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_refresh_and_verify_tokens() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let body = register(&app, "alice", "correct-horse").await;
    let access = body["data"]["tokens"]["access"].as_str().unwrap().to_string();
    let refresh = body["data"]["tokens"]["refresh"].as_str().unwrap().to_string();

    let req = TestRequest::post()
        .uri(&api("/auth/token/verify/"))
        .set_json(json!({"token": access}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(read_json(resp).await["data"]["valid"], true);

    let req = TestRequest::post()
        .uri(&api("/auth/token/refresh/"))
        .set_json(json!({"refresh": refresh}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert!(read_json(resp).await["data"]["access"].is_string());

    // access token 不能当 refresh token 用
    let req = TestRequest::post()
        .uri(&api("/auth/token/refresh/"))
        .set_json(json!({"refresh": access}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = TestRequest::post()
        .uri(&api("/auth/token/verify/"))
        .set_json(json!({"token": "not-a-jwt"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_profile_requires_token() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;

    let req = TestRequest::get().uri(&api("/profile/")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(read_json(resp).await["code"], 1001);
}

#[actix_web::test]
async fn test_profile_update() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let body = register(&app, "alice", "correct-horse").await;
    let token = body["data"]["tokens"]["access"].as_str().unwrap().to_string();

    let req = TestRequest::patch()
        .uri(&api("/profile/"))
        .insert_header(bearer(&token))
        .set_json(json!({
            "first_name": "Alice",
            "bio": "Writes about <b>Rust</b>",
            "show_email": true,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = TestRequest::get()
        .uri(&api("/profile/"))
        .insert_header(bearer(&token))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["first_name"], "Alice");
    assert_eq!(body["data"]["show_email"], true);

    // 公开资料在 show_email 打开后展示邮箱
    let req = TestRequest::get().uri(&api("/users/alice/")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"].get("is_staff").is_none());
}

#[actix_web::test]
async fn test_preferences_validation() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let body = register(&app, "alice", "correct-horse").await;
    let token = body["data"]["tokens"]["access"].as_str().unwrap().to_string();

    let req = TestRequest::get()
        .uri(&api("/profile/preferences/"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert!(body["data"]["theme"].is_string());

    let req = TestRequest::patch()
        .uri(&api("/profile/preferences/"))
        .insert_header(bearer(&token))
        .set_json(json!({"theme": "dark", "comments_per_page": 50}))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["theme"], "dark");
    assert_eq!(body["data"]["comments_per_page"], 50);

    let req = TestRequest::patch()
        .uri(&api("/profile/preferences/"))
        .insert_header(bearer(&token))
        .set_json(json!({"theme": "neon"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = TestRequest::patch()
        .uri(&api("/profile/preferences/"))
        .insert_header(bearer(&token))
        .set_json(json!({"comments_per_page": 7}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_change_password() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let body = register(&app, "alice", "correct-horse").await;
    let token = body["data"]["tokens"]["access"].as_str().unwrap().to_string();

    let req = TestRequest::post()
        .uri(&api("/profile/change-password/"))
        .insert_header(bearer(&token))
        .set_json(json!({
            "old_password": "wrong-guess",
            "new_password": "battery-staple",
            "new_password_confirm": "battery-staple",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = TestRequest::post()
        .uri(&api("/profile/change-password/"))
        .insert_header(bearer(&token))
        .set_json(json!({
            "old_password": "correct-horse",
            "new_password": "battery-staple",
            "new_password_confirm": "battery-staple",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        read_json(resp).await["data"]["message"],
        "Password changed successfully"
    );

    let req = TestRequest::post()
        .uri(&api("/auth/login/"))
        .set_json(json!({"username": "alice", "password": "battery-staple"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
async fn test_profile_stats_and_activity() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let body = register(&app, "alice", "correct-horse").await;
    let token = body["data"]["tokens"]["access"].as_str().unwrap().to_string();
    post_comment(&app, "alice", "First post", None).await;

    let req = TestRequest::get()
        .uri(&api("/profile/stats/"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["total_comments"], 1);
    assert_eq!(body["data"]["total_likes_received"], 0);

    let req = TestRequest::get()
        .uri(&api("/profile/activity/?limit=5"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert!(read_json(resp).await["data"].is_array());
}

#[actix_web::test]
async fn test_user_discovery() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    register(&app, "alice", "correct-horse").await;
    register(&app, "alina", "correct-horse").await;
    register(&app, "bob", "correct-horse").await;
    post_comment(&app, "bob", "One", None).await;
    post_comment(&app, "bob", "Two", None).await;
    post_comment(&app, "alice", "Three", None).await;

    let req = TestRequest::get()
        .uri(&api("/users/search/?q=ali"))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"alice"));
    assert!(names.contains(&"alina"));

    let req = TestRequest::get().uri(&api("/users/top/")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert_eq!(body["data"][0]["user_name"], "bob");
    assert_eq!(body["data"][0]["comment_count"], 2);

    let req = TestRequest::get().uri(&api("/users/nobody/")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(read_json(resp).await["code"], 4000);
}

#[actix_web::test]
async fn test_unknown_user_login_matches_wrong_password() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    register(&app, "alice", "correct-horse").await;

    let login = |username: &str| {
        TestRequest::post()
            .uri(&api("/auth/login/"))
            .set_json(json!({"username": username, "password": "battery-staple"}))
            .to_request()
    };

    let resp = test::call_service(&app, login("alice")).await;
    assert_eq!(resp.status(), 400);
    let wrong_password = read_json(resp).await;

    let resp = test::call_service(&app, login("mallory")).await;
    assert_eq!(resp.status(), 400);
    let unknown_user = read_json(resp).await;

    assert_eq!(wrong_password, unknown_user);
    assert_eq!(unknown_user["message"], "Invalid credentials");
}

#[actix_web::test]
async fn test_create_admin_promotes_existing_user() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    register(&app, "alice", "correct-horse").await;
    register(&app, "bob", "correct-horse").await;

    let promoted = env
        .services
        .users
        .create_admin("alice", "alice@staff.example.com", "new-admin-pass")
        .await
        .unwrap();
    assert!(promoted.is_staff);
    assert_eq!(promoted.email, "alice@staff.example.com");

    // 邮箱属于其他用户时拒绝
    let err = env
        .services
        .users
        .create_admin("alice", "bob@example.com", "new-admin-pass")
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 409);

    let req = TestRequest::post()
        .uri(&api("/auth/login/"))
        .set_json(json!({"username": "alice", "password": "new-admin-pass"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["user"]["is_staff"], true);
    assert_eq!(body["data"]["user"]["email"], "alice@staff.example.com");
}
