//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use ruffed_client::{ClientBuilder, RuffedClient, UserInfo};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// CSRF token handed out by the mock backend.
pub const CSRF_TOKEN: &str = "csrf-token-1";

/// A mock backend speaking the auth API under `/api/v1`.
pub struct TestBackend {
    pub server: MockServer,
}

impl TestBackend {
    /// Start a backend that already serves `GET /auth/csrf-token`.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/auth/csrf-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": CSRF_TOKEN })))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn api_url(&self) -> String {
        format!("{}/api/v1", self.server.uri())
    }

    pub fn builder(&self) -> ClientBuilder {
        RuffedClient::builder().base_url(self.api_url())
    }

    pub fn client(&self) -> RuffedClient {
        self.builder().build().expect("client should build")
    }

    /// Accept any login with `user`, setting a session cookie.
    pub async fn mount_login(&self, user: &UserInfo) {
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .and(header("X-CSRF-TOKEN", CSRF_TOKEN))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session=initial; Path=/; HttpOnly")
                    .set_body_json(json!({ "user": user })),
            )
            .mount(&self.server)
            .await;
    }

    /// Expect exactly `times` server-side logouts.
    pub async fn expect_logout(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/logout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "Logged out successfully"
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Log `user` in through the mock backend.
    pub async fn logged_in(&self, client: &RuffedClient, user: &UserInfo) {
        self.mount_login(user).await;
        client
            .auth()
            .login(&ruffed_client::LoginCredentials::new(&user.username, "secret"))
            .await
            .expect("login should succeed");
    }

    /// Requests received so far for `verb` on `route`.
    pub async fn requests_to(&self, verb: &str, route: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == verb && r.url.path() == route)
            .collect()
    }

    /// Poll until at least `count` matching requests arrived or `timeout`
    /// passes. For endpoints hit from spawned tasks.
    pub async fn wait_for(&self, verb: &str, route: &str, count: usize, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let seen = self.requests_to(verb, route).await.len();
            if seen >= count || tokio::time::Instant::now() >= deadline {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

pub fn user(roles: &[&str]) -> UserInfo {
    UserInfo::new(42, "jdoe", "jdoe@example.com").with_roles(roles.iter().copied())
}

/// An error body in the backend's format.
pub fn error_body(code: u16, message: &str) -> serde_json::Value {
    json!({ "status": "error", "message": message, "code": code })
}
