#![allow(dead_code)]

use std::sync::Arc;

use gauged_server::{DevIdentityProvider, Opts, Server};
use tempfile::TempDir;

/// A test server on a random port with ephemeral storage, confirming every
/// login as `alice` through the dev identity provider.
pub struct TestServer {
    base_url: String,
    _temp_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(false).await
    }

    pub async fn start_with_admin() -> Self {
        Self::start_with(true).await
    }

    async fn start_with(admin_api: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let opts = Opts {
            listen: "127.0.0.1:0".to_owned(),
            data_dir: temp_dir.path().to_path_buf(),
            cookie_name: "session".to_owned(),
            session_ttl_secs: 86400,
            admin_api,
            cors_origin: None,
            public_url: None,
            reuseport: false,
        };

        let server = Server::init(opts, Arc::new(DevIdentityProvider::new("alice")))
            .await
            .expect("Failed to start test server");
        let addr = server.addr().expect("listener has an address");
        tokio::spawn(server.run());

        Self {
            base_url: format!("http://{addr}"),
            _temp_dir: temp_dir,
        }
    }

    /// Create a new `Driver` with its own cookie jar (independent browser
    /// session).
    pub fn driver(&self) -> Driver {
        Driver::new(self.base_url.clone())
    }
}

/// HTTP client driver for talking to the server in tests.
///
/// Each `Driver` maintains its own cookie jar, so it represents an
/// independent browser session.
pub struct Driver {
    client: reqwest::Client,
    base_url: String,
}

impl Driver {
    fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            // Don't auto-follow redirects — let tests assert on redirect targets.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn get_with_referer(&self, path: &str, referer: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Referer", referer)
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn get_bearer(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    /// Run the full login round trip through the dev identity provider.
    pub async fn login(&self) {
        let resp = self.get("/oauth/login").await;
        assert_eq!(
            resp.status(),
            reqwest::StatusCode::SEE_OTHER,
            "Expected redirect to the identity provider, got {}",
            resp.status()
        );

        let location = resp
            .headers()
            .get("location")
            .expect("Missing Location header on login redirect")
            .to_str()
            .expect("Invalid Location header")
            .to_owned();

        let resp = self.get(&location).await;
        assert_eq!(
            resp.status(),
            reqwest::StatusCode::OK,
            "Expected login confirmation to succeed"
        );
    }
}

/// Session id from a response's `Set-Cookie` header, if any.
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    let raw = resp.headers().get("set-cookie")?.to_str().ok()?;
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    (name == "session" && !value.is_empty()).then(|| value.to_owned())
}
