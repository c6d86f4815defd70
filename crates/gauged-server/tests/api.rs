mod common;

use common::TestServer;
use gauged_session::now_epoch;
use serde_json::json;

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn api_rejects_unauthenticated_requests() {
    let server = TestServer::start().await;
    let driver = server.driver();

    let resp = driver.get("/api/user").await;
    assert_eq!(resp.status(), 403);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "Forbidden");
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn admin_api_is_absent_unless_enabled() {
    let server = TestServer::start().await;
    let driver = server.driver();

    let resp = driver.get("/admin/api/session?sid=abc123").await;
    assert_eq!(resp.status(), 404);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn admin_minted_session_works_as_bearer_token() {
    let server = TestServer::start_with_admin().await;
    let driver = server.driver();

    let resp = driver
        .post_json("/admin/api/session", &json!({"user": "bot", "expired_in": 0}))
        .await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    let sid = json["sid"].as_str().expect("minted sid").to_owned();

    // a cookie-less client authorizes with the bearer token alone
    let api = server.driver();
    let resp = api.get_bearer("/api/user", &sid).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["user"], "bot");

    let resp = driver.get(&format!("/admin/api/session?sid={sid}")).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["user"], "bot");
    assert_eq!(json["expired_in"], 0);

    let resp = driver.delete(&format!("/admin/api/session?sid={sid}")).await;
    assert_eq!(resp.status(), 200);

    let resp = driver.get(&format!("/admin/api/session?sid={sid}")).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert!(json.is_null(), "deleted session should read as absent");

    let resp = api.get_bearer("/api/user", &sid).await;
    assert_eq!(resp.status(), 403);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn expired_admin_session_reads_as_absent() {
    let server = TestServer::start_with_admin().await;
    let driver = server.driver();

    let resp = driver
        .post_json(
            "/admin/api/session",
            &json!({"user": "bot", "expired_in": now_epoch() - 30}),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    let sid = json["sid"].as_str().expect("minted sid").to_owned();

    let resp = driver.get(&format!("/admin/api/session?sid={sid}")).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert!(json.is_null(), "expired session should read as absent");

    let resp = server.driver().get_bearer("/api/user", &sid).await;
    assert_eq!(resp.status(), 403);
}
