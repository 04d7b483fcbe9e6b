//! 评论与验证码 API 集成测试

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::json;

use common::{
    PEER, TestEnv, api, bearer, fresh_captcha, init_app, post_comment, read_json, staff_token,
};

#[actix_web::test]
async fn test_create_comment_sanitizes_and_hides_email() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;

    let body = post_comment(
        &app,
        "Alice",
        "Hello <script>alert(1)</script><strong>world</strong>",
        None,
    )
    .await;

    assert_eq!(body["code"], 0);
    let data = &body["data"];
    assert_eq!(data["user_name"], "Alice");
    assert_eq!(data["sanitized_text"], "Hello <strong>world</strong>");
    assert_eq!(data["depth"], 0);
    assert_eq!(data["can_reply"], true);
    assert!(data.get("email").is_none());
}

#[actix_web::test]
async fn test_captcha_is_consumed_once() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let (token, answer) = fresh_captcha(&app).await;

    let payload = json!({
        "user_name": "Bob",
        "email": "bob@example.com",
        "text": "first",
        "captcha_token": token,
        "captcha_solution": answer,
    });

    let req = TestRequest::post()
        .uri(&api("/comments/"))
        .peer_addr(PEER.parse().unwrap())
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = TestRequest::post()
        .uri(&api("/comments/"))
        .peer_addr(PEER.parse().unwrap())
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = read_json(resp).await;
    assert_eq!(body["code"], 3005);
}

#[actix_web::test]
async fn test_wrong_captcha_solution_rejected() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let (token, answer) = fresh_captcha(&app).await;
    let wrong = format!("{}1", answer);

    let req = TestRequest::post()
        .uri(&api("/comments/"))
        .set_json(json!({
            "user_name": "Bob",
            "email": "bob@example.com",
            "text": "hi",
            "captcha_token": token,
            "captcha_solution": wrong,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = read_json(resp).await;
    assert_eq!(body["code"], 3003);
}

#[actix_web::test]
async fn test_invalid_commenter_fields() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let (token, answer) = fresh_captcha(&app).await;

    let req = TestRequest::post()
        .uri(&api("/comments/"))
        .set_json(json!({
            "user_name": "not valid!",
            "email": "bob@example.com",
            "text": "hi",
            "captcha_token": token,
            "captcha_solution": answer,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = read_json(resp).await;
    assert_eq!(body["code"], 1000);
    assert!(body["message"].as_str().unwrap().contains("letters and numbers"));
}

#[actix_web::test]
async fn test_reply_updates_counts_and_depth_limit() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;

    let root = post_comment(&app, "Root", "root comment", None).await;
    let mut parent = root["data"]["id"].as_i64().unwrap();
    let root_id = parent;

    // 默认最大层级为 3：深度 1、2、3 的回复都允许
    for depth in 1..=3 {
        let reply = post_comment(&app, "Replier", &format!("depth {}", depth), Some(parent)).await;
        assert_eq!(reply["data"]["depth"], depth);
        assert_eq!(reply["data"]["can_reply"], depth < 3);
        parent = reply["data"]["id"].as_i64().unwrap();
    }

    let (token, answer) = fresh_captcha(&app).await;
    let req = TestRequest::post()
        .uri(&api(&format!("/comments/{}/reply/", parent)))
        .set_json(json!({
            "user_name": "Replier",
            "email": "replier@example.com",
            "text": "too deep",
            "captcha_token": token,
            "captcha_solution": answer,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = read_json(resp).await;
    assert_eq!(body["code"], 3001);

    let req = TestRequest::get()
        .uri(&api(&format!("/comments/{}/", root_id)))
        .to_request();
    let detail = read_json(test::call_service(&app, req).await).await;
    assert_eq!(detail["data"]["replies_count"], 1);
    assert_eq!(detail["data"]["has_replies"], true);
    assert_eq!(
        detail["data"]["replies"][0]["replies"][0]["replies"][0]["depth"],
        3
    );

    // 列表只返回顶层评论
    let req = TestRequest::get().uri(&api("/comments/")).to_request();
    let list = read_json(test::call_service(&app, req).await).await;
    assert_eq!(list["data"]["count"], 1);
    assert_eq!(list["data"]["results"][0]["id"], root_id);
}

#[actix_web::test]
async fn test_reply_to_missing_parent_is_not_found() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let (token, answer) = fresh_captcha(&app).await;

    let req = TestRequest::post()
        .uri(&api("/comments/9999/reply/"))
        .set_json(json!({
            "user_name": "Ghost",
            "email": "ghost@example.com",
            "text": "hello?",
            "captcha_token": token,
            "captcha_solution": answer,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_like_once_per_ip() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let created = post_comment(&app, "Liked", "like me", None).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let like = || {
        TestRequest::post()
            .uri(&api(&format!("/comments/{}/like/", id)))
            .peer_addr(PEER.parse().unwrap())
            .to_request()
    };

    let resp = test::call_service(&app, like()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["likes_count"], 1);

    let resp = test::call_service(&app, like()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = read_json(resp).await;
    assert_eq!(body["code"], 3002);

    // 另一个 IP 可以继续点赞
    let req = TestRequest::post()
        .uri(&api(&format!("/comments/{}/like/", id)))
        .peer_addr("203.0.113.50:1234".parse().unwrap())
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["likes_count"], 2);
}

#[actix_web::test]
async fn test_preview_reports_sanitized_text() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;

    let req = TestRequest::post()
        .uri(&api("/comments/preview/"))
        .set_json(json!({"text": "<i>hi</i><div>x</div>"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["sanitized_text"], "<i>hi</i>x");
    assert_eq!(body["data"]["is_valid_xhtml"], true);

    let req = TestRequest::post()
        .uri(&api("/comments/preview/"))
        .set_json(json!({"text": ""}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[actix_web::test]
async fn test_list_filters_and_history() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    post_comment(&app, "Carol", "rust is great", None).await;
    post_comment(&app, "Dave", "python is fine", None).await;
    post_comment(&app, "Carol", "another one", None).await;

    let req = TestRequest::get()
        .uri(&api("/comments/?user_name=Carol&ordering=created_at"))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["results"][0]["sanitized_text"], "rust is great");

    let req = TestRequest::get()
        .uri(&api("/comments/?search=python"))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["count"], 1);

    let req = TestRequest::get()
        .uri(&api("/comments/?created_after=not-a-date"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = TestRequest::get()
        .uri(&api("/comments/history/Carol/"))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let req = TestRequest::get().uri(&api("/comments/stats/")).to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["total_comments"], 3);
    assert_eq!(body["data"]["total_replies"], 0);
}

#[actix_web::test]
async fn test_spam_routes_require_staff() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let created = post_comment(&app, "Spammer", "buy now, click here", None).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let req = TestRequest::post()
        .uri(&api(&format!("/comments/{}/spam/", id)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let token = staff_token(&env, &app).await;
    let req = TestRequest::get()
        .uri(&api(&format!("/comments/{}/spam-score/", id)))
        .insert_header(bearer(&token))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert!(body["data"]["spam_score"].as_f64().unwrap() > 0.0);

    let req = TestRequest::post()
        .uri(&api(&format!("/comments/{}/spam/", id)))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["is_active"], false);
    assert_eq!(body["data"]["is_moderated"], true);

    // 隐藏后详情不可见
    let req = TestRequest::get()
        .uri(&api(&format!("/comments/{}/", id)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_captcha_image_is_png() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let (token, _) = fresh_captcha(&app).await;

    let req = TestRequest::get()
        .uri(&api(&format!("/captcha/image/{}/", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
    let bytes = test::read_body(resp).await;
    assert_eq!(&bytes[..4], b"\x89PNG");

    let req = TestRequest::get()
        .uri(&api("/captcha/image/unknown/"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_unknown_route_returns_envelope() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;

    let req = TestRequest::get().uri(&api("/nope/")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = read_json(resp).await;
    assert_eq!(body["code"], 1004);
}

#[actix_web::test]
async fn test_search_treats_wildcards_literally() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    post_comment(&app, "Alice", "use snake a_b naming", None).await;
    post_comment(&app, "Bob", "axb is not snake case", None).await;
    post_comment(&app, "Carol", "discount 100% off", None).await;
    post_comment(&app, "Dave", "only 1000 left", None).await;

    let req = TestRequest::get()
        .uri(&api("/comments/?search=a_b"))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["results"][0]["user_name"], "Alice");

    let req = TestRequest::get()
        .uri(&api("/comments/?search=100%25"))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["results"][0]["user_name"], "Carol");

    let req = TestRequest::get()
        .uri(&api("/comments/?search=_"))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["count"], 1);
}

#[actix_web::test]
async fn test_min_likes_count_follows_new_likes() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let id = post_comment(&app, "Erin", "like counting", None).await["data"]["id"]
        .as_i64()
        .unwrap();

    let list = || {
        TestRequest::get()
            .uri(&api("/comments/?min_likes=1"))
            .to_request()
    };
    let body = read_json(test::call_service(&app, list()).await).await;
    assert_eq!(body["data"]["count"], 0);

    let req = TestRequest::post()
        .uri(&api(&format!("/comments/{}/like/", id)))
        .peer_addr(PEER.parse().unwrap())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let body = read_json(test::call_service(&app, list()).await).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["results"][0]["id"], id);
}

#[actix_web::test]
async fn test_thread_returns_root_with_replies() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    let root = post_comment(&app, "Root", "top level", None).await["data"]["id"]
        .as_i64()
        .unwrap();
    let child = post_comment(&app, "Child", "first reply", Some(root)).await["data"]["id"]
        .as_i64()
        .unwrap();
    let grandchild = post_comment(&app, "Grand", "second level", Some(child)).await["data"]["id"]
        .as_i64()
        .unwrap();

    // 从最深的回复进入也返回整个线程
    let req = TestRequest::get()
        .uri(&api(&format!("/comments/{}/thread/", grandchild)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["id"], root);
    assert_eq!(body["data"]["depth"], 0);
    assert_eq!(body["data"]["replies"][0]["id"], child);
    assert_eq!(body["data"]["replies"][0]["replies"][0]["id"], grandchild);

    let req = TestRequest::get()
        .uri(&api("/comments/9999/thread/"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_trending_orders_by_likes() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    post_comment(&app, "Quiet", "nobody likes this", None).await;
    let popular = post_comment(&app, "Loud", "everyone likes this", None).await["data"]["id"]
        .as_i64()
        .unwrap();

    // 先请求一次，确认点赞后缓存失效
    let req = TestRequest::get().uri(&api("/comments/trending/")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = TestRequest::post()
        .uri(&api(&format!("/comments/{}/like/", popular)))
        .peer_addr(PEER.parse().unwrap())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = TestRequest::get()
        .uri(&api("/comments/trending/?limit=1"))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], popular);
    assert_eq!(items[0]["likes_count"], 1);
}

#[actix_web::test]
async fn test_spam_is_hidden_on_create() {
    let env = TestEnv::new().await;
    let app = init_app(&env).await;
    post_comment(&app, "Honest", "a normal remark", None).await;
    let spam = post_comment(&app, "Spammer", "casino poker viagra deals", None).await["data"]["id"]
        .as_i64()
        .unwrap();

    let req = TestRequest::get().uri(&api("/comments/")).to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["results"][0]["user_name"], "Honest");

    let req = TestRequest::get()
        .uri(&api(&format!("/comments/{}/", spam)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}
