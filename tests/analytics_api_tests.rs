//! 分析统计 API 集成测试

mod common;

use actix_web::test::{self, TestRequest};
use serde_json::json;

use commentary::analytics::sink::SearchRecord;
use commentary::analytics::{EventSink, EventType, NewEvent};
use common::*;

fn event(event_type: EventType, ip: &str) -> NewEvent {
    let mut e = NewEvent::new(event_type);
    e.ip_address = Some(ip.to_string());
    e.user_identifier = ip.to_string();
    e.session_id = format!("session-{}", ip);
    e
}

#[actix_web::test]
async fn test_staff_routes_reject_anonymous_and_regular_users() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;

    let req = TestRequest::get().uri(&api("/analytics/dashboard/")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let body = register(&app, "alice", "correct-horse").await;
    let token = body["data"]["tokens"]["access"].as_str().unwrap().to_string();
    let req = TestRequest::get()
        .uri(&api("/analytics/dashboard/"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    assert_eq!(read_json(resp).await["code"], 1003);
}

#[actix_web::test]
async fn test_rollup_counts_recorded_events() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let token = staff_token(&env, &app).await;

    env.storage
        .write_events(vec![
            event(EventType::CommentCreated, "203.0.113.1"),
            event(EventType::CommentCreated, "203.0.113.2"),
            event(EventType::CommentLiked, "203.0.113.2"),
            event(EventType::FileUploaded, "203.0.113.3")
                .with_data(json!({"file_type": "image"})),
        ])
        .await
        .unwrap();

    let req = TestRequest::post()
        .uri(&api("/analytics/rollup/"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["comments_created"], 2);
    assert_eq!(body["data"]["comments_liked"], 1);
    assert_eq!(body["data"]["files_uploaded"], 1);
    assert_eq!(body["data"]["unique_visitors"], 3);

    let req = TestRequest::get()
        .uri(&api("/analytics/stats/daily/?days=7"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert!(!body["data"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_popular_is_public_and_reflects_rollup() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let token = staff_token(&env, &app).await;
    let created = post_comment(&app, "Alice", "Worth reading", None).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let req = TestRequest::post()
        .uri(&api("/analytics/rollup/"))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = TestRequest::get()
        .uri(&api("/analytics/popular/?type=comment"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["content_id"], id);
    assert_eq!(items[0]["content_title"], "Worth reading");
}

#[actix_web::test]
async fn test_dashboard_and_realtime() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let token = staff_token(&env, &app).await;
    post_comment(&app, "Alice", "Hello", None).await;

    let req = TestRequest::get()
        .uri(&api("/analytics/dashboard/?days=7"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert!(body["data"]["totals"].is_object());
    assert!(body["data"]["trend_data"].is_array());

    let req = TestRequest::get()
        .uri(&api("/analytics/realtime/"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert!(read_json(resp).await["data"]["stats"].is_object());
}

#[actix_web::test]
async fn test_export_csv() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let token = staff_token(&env, &app).await;

    let req = TestRequest::get()
        .uri(&api("/analytics/export/?type=daily_stats&days=7"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/csv"));
    let disposition = resp
        .headers()
        .get("Content-Disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("daily_stats_"));
    let body = test::read_body(resp).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("Date,Comments Created"));

    let req = TestRequest::get()
        .uri(&api("/analytics/export/?type=users"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(read_json(resp).await["code"], 6001);
}

fn search(query: &str, results_count: i64) -> SearchRecord {
    SearchRecord {
        query: query.to_string(),
        results_count,
        response_time_ms: 40,
        user_identifier: "203.0.113.1".to_string(),
        ip_address: Some("203.0.113.1".to_string()),
    }
}

#[actix_web::test]
async fn test_events_activity_search_and_health() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let token = staff_token(&env, &app).await;

    env.storage
        .write_events(vec![
            event(EventType::CommentCreated, "203.0.113.1"),
            event(EventType::CommentCreated, "203.0.113.1"),
            event(EventType::CommentLiked, "203.0.113.2"),
        ])
        .await
        .unwrap();
    env.storage.record_search(search("rust", 3)).await.unwrap();
    env.storage.record_search(search("rust", 5)).await.unwrap();
    env.storage.record_search(search("nothing here", 0)).await.unwrap();

    let get = |path: &str| {
        TestRequest::get()
            .uri(&api(path))
            .insert_header(bearer(&token))
            .to_request()
    };

    let resp = test::call_service(&app, get("/analytics/events/?event_type=comment_created")).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    let events = body["data"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e["event_type"] == "comment_created"));

    let body = read_json(test::call_service(&app, get("/analytics/events/?user=203.0.113.2")).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["event_type"], "comment_liked");

    let body = read_json(test::call_service(&app, get("/analytics/activity/")).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let body = read_json(test::call_service(&app, get("/analytics/activity/?user=203.0.113.1")).await).await;
    let sessions = body["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["comments_posted"], 2);
    assert_eq!(sessions[0]["session_id"], "session-203.0.113.1");

    let resp = test::call_service(&app, get("/analytics/search/")).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["total_searches"], 3);
    assert_eq!(body["data"]["top_queries"][0]["query"], "rust");
    assert_eq!(body["data"]["top_queries"][0]["count"], 2);
    assert_eq!(body["data"]["top_queries"][0]["avg_results"], 4.0);
    assert_eq!(body["data"]["no_results_queries"][0]["query"], "nothing here");

    let resp = test::call_service(&app, get("/analytics/health/")).await;
    assert_eq!(resp.status(), 200);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["total_events"], 3);
    assert_eq!(body["data"]["error_events"], 0);
    assert_eq!(body["data"]["health_score"], 100);
    assert_eq!(body["data"]["status"], "healthy");
}
