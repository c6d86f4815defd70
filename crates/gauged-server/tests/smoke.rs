mod common;

use common::{TestServer, session_cookie};

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn anonymous_index_returns_200_and_a_session_cookie() {
    let server = TestServer::start().await;
    let driver = server.driver();

    let resp = driver.get("/").await;
    assert_eq!(resp.status(), 200);
    let sid = session_cookie(&resp).expect("anonymous visit should mint a session");
    assert!(!sid.is_empty());

    let body = resp.text().await.unwrap();
    assert!(body.contains("Sign in"), "Anonymous page should offer login");
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn session_id_is_stable_across_requests() {
    let server = TestServer::start().await;
    let driver = server.driver();

    let first = session_cookie(&driver.get("/").await).unwrap();
    let second = session_cookie(&driver.get("/").await).unwrap();
    assert_eq!(first, second, "Cookie refresh should keep the same id");
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn login_flow_authenticates_the_session() {
    let server = TestServer::start().await;
    let driver = server.driver();

    driver.login().await;

    let body = driver.get("/").await.text().await.unwrap();
    assert!(
        body.contains("Signed in as alice"),
        "Page should show the confirmed identity, got: {body}"
    );

    let resp = driver.get("/api/user").await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["user"], "alice");
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn login_redirects_back_to_the_referring_page() {
    let server = TestServer::start().await;
    let driver = server.driver();

    let resp = driver.get_with_referer("/oauth/login", "/").await;
    assert_eq!(resp.status(), 303);
    let location = resp.headers().get("location").unwrap().to_str().unwrap();

    let resp = driver.get(location).await;
    assert_eq!(resp.status(), 303);
    let back = resp.headers().get("location").unwrap().to_str().unwrap();
    assert_eq!(back, "/");
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn logout_ends_the_session() {
    let server = TestServer::start().await;
    let driver = server.driver();

    driver.login().await;

    let resp = driver.get("/oauth/logout").await;
    assert_eq!(resp.status(), 200);

    let resp = driver.get("/api/user").await;
    assert_eq!(resp.status(), 403);

    let body = driver.get("/").await.text().await.unwrap();
    assert!(body.contains("Sign in"), "Logged-out page should offer login");
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn logout_without_a_user_is_forbidden() {
    let server = TestServer::start().await;
    let driver = server.driver();

    let resp = driver.get("/oauth/logout").await;
    assert_eq!(resp.status(), 403);
}
