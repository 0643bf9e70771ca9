//! Auth flow integration tests against a mock backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{CSRF_TOKEN, TestBackend, error_body, user};
use ruffed_client::{
    Error, LoginCredentials, LogoutReason, RegisterRequest, SessionEvent, UserInfo,
};
use ruffed_session::{FileSessionStore, SessionStore};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_login_stores_user_and_arms_idle_timer() -> Result<()> {
    let backend = TestBackend::start().await;
    let client = backend.client();
    let jdoe = user(&["operator"]);
    backend.mount_login(&jdoe).await;
    let mut events = client.subscribe_events();

    let logged_in = client
        .auth()
        .login(&LoginCredentials::new("jdoe", "secret"))
        .await?;

    assert_eq!(logged_in, jdoe);
    assert!(client.auth().is_logged_in());
    assert!(client.idle_timer_active());
    assert_eq!(client.session().store().get_user(), Some(jdoe.clone()));
    assert!(matches!(events.try_recv()?, SessionEvent::LoggedIn(u) if u == jdoe));

    // One token fetch, and the login carried it.
    assert_eq!(backend.requests_to("GET", "/api/v1/auth/csrf-token").await.len(), 1);
    let logins = backend.requests_to("POST", "/api/v1/auth/login").await;
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].headers.get("x-csrf-token").unwrap(), CSRF_TOKEN);
    let sent: serde_json::Value = serde_json::from_slice(&logins[0].body)?;
    assert_eq!(sent, json!({ "username": "jdoe", "password": "secret" }));

    Ok(())
}

#[tokio::test]
async fn test_login_rejection_uses_server_message() -> Result<()> {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_body(401, "Account locked")))
        .mount(&backend.server)
        .await;
    let client = backend.client();

    let err = client
        .auth()
        .login(&LoginCredentials::new("jdoe", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::Client { message } if message == "Account locked"));
    assert!(!client.auth().is_logged_in());
    assert!(client.session().store().get_user().is_none());
    assert!(!client.idle_timer_active());

    Ok(())
}

#[tokio::test]
async fn test_login_rejection_without_message() -> Result<()> {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&backend.server)
        .await;
    // A 401 from an auth endpoint must not start a refresh.
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend.server)
        .await;
    let client = backend.client();

    let err = client
        .auth()
        .login(&LoginCredentials::new("jdoe", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Invalid username or password");
    assert_eq!(client.refresh_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_login_fails_when_csrf_fetch_fails() -> Result<()> {
    let server = wiremock::MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/csrf-token"))
        .respond_with(ResponseTemplate::new(503).set_body_json(error_body(503, "Maintenance")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let client = ruffed_client::RuffedClient::builder()
        .base_url(format!("{}/api/v1", server.uri()))
        .build()?;

    let err = client
        .auth()
        .login(&LoginCredentials::new("jdoe", "secret"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(!client.auth().is_logged_in());

    Ok(())
}

#[tokio::test]
async fn test_logout_clears_everything() -> Result<()> {
    let backend = TestBackend::start().await;
    backend.expect_logout(1).await;
    let client = backend.client();
    backend.logged_in(&client, &user(&[])).await;
    let mut events = client.subscribe_events();

    client.auth().logout().await;

    assert!(!client.auth().is_logged_in());
    assert!(!client.idle_timer_active());
    assert!(client.csrf().cached().is_none());
    assert!(client.session().store().get_user().is_none());
    assert!(matches!(
        events.try_recv()?,
        SessionEvent::LoggedOut {
            reason: LogoutReason::UserRequested
        }
    ));

    let logouts = backend.requests_to("POST", "/api/v1/auth/logout").await;
    assert_eq!(logouts[0].headers.get("x-csrf-token").unwrap(), CSRF_TOKEN);

    Ok(())
}

#[tokio::test]
async fn test_logout_succeeds_locally_when_server_fails() -> Result<()> {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&backend.server)
        .await;
    let client = backend.client();
    backend.logged_in(&client, &user(&[])).await;

    client.auth().logout().await;

    assert!(!client.auth().is_logged_in());
    assert!(!client.idle_timer_active());

    Ok(())
}

#[tokio::test]
async fn test_register_does_not_log_in() -> Result<()> {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/register"))
        .and(header("X-CSRF-TOKEN", CSRF_TOKEN))
        .and(body_json(json!({
            "username": "newbie",
            "email": "newbie@example.com",
            "password": "hunter22"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&backend.server)
        .await;
    let client = backend.client();

    client
        .auth()
        .register(&RegisterRequest {
            username: "newbie".into(),
            email: "newbie@example.com".into(),
            password: "hunter22".into(),
        })
        .await?;

    assert!(!client.auth().is_logged_in());

    Ok(())
}

#[tokio::test]
async fn test_register_conflict_reports_server_message() -> Result<()> {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/register"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(error_body(409, "Username already exists")),
        )
        .mount(&backend.server)
        .await;
    let client = backend.client();

    let err = client
        .auth()
        .register(&RegisterRequest {
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            password: "x".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(err.user_message(), "Username already exists");

    Ok(())
}

#[tokio::test]
async fn test_fetch_current_user_updates_session() -> Result<()> {
    let backend = TestBackend::start().await;
    let client = backend.client();
    backend.logged_in(&client, &user(&["read-only"])).await;

    let promoted = user(&["read-only", "certificates:*"]);
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&promoted))
        .expect(1)
        .mount(&backend.server)
        .await;

    let me = client.auth().fetch_current_user().await?;

    assert_eq!(me, promoted);
    assert!(client.auth().has_permission("certificates:revoke"));
    assert_eq!(client.session().store().get_user(), Some(promoted));

    Ok(())
}

#[tokio::test]
async fn test_permission_reads() -> Result<()> {
    let backend = TestBackend::start().await;
    let client = backend.client();
    assert!(!client.auth().has_permission("certificates:read"));

    backend.logged_in(&client, &user(&["admin"])).await;

    assert!(client.auth().has_role("admin"));
    assert!(!client.auth().has_role("operator"));
    assert!(client.auth().has_permission("anything:at-all"));

    Ok(())
}

#[tokio::test]
async fn test_restore_resumes_persisted_session() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let jdoe = user(&["operator"]);
    FileSessionStore::new(dir.path()).set_user(&jdoe)?;

    let backend = TestBackend::start().await;
    let client = backend
        .builder()
        .session_store(Arc::new(FileSessionStore::new(dir.path())))
        .build()?;

    // A stored user is not a session until restored; no session runs
    // without its idle timer.
    assert!(!client.auth().is_logged_in());
    assert!(!client.idle_timer_active());

    let restored = client.auth().restore().await;

    assert_eq!(restored, Some(jdoe.clone()));
    assert_eq!(client.auth().current_user(), Some(jdoe));
    assert!(client.idle_timer_active());

    Ok(())
}

#[tokio::test]
async fn test_restore_without_stored_user() -> Result<()> {
    let backend = TestBackend::start().await;
    let client = backend.client();

    assert!(client.auth().restore().await.is_none());
    assert!(!client.auth().is_logged_in());
    assert!(!client.idle_timer_active());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_idle_timeout_logs_out_once() -> Result<()> {
    let backend = TestBackend::start().await;
    backend.expect_logout(1).await;
    let client = backend
        .builder()
        .idle_timeout(Duration::from_millis(300))
        .build()?;
    backend.logged_in(&client, &user(&[])).await;
    let mut events = client.subscribe_events();

    // Activity keeps the session alive past the first window.
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(client.record_activity(ruffed_client::ActivityEvent::KeyPress));
    }
    assert!(client.auth().is_logged_in());

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv()).await??;
    assert!(matches!(
        event,
        SessionEvent::LoggedOut {
            reason: LogoutReason::IdleTimeout
        }
    ));
    assert!(!client.auth().is_logged_in());
    assert!(!client.idle_timer_active());
    assert!(!client.record_activity(ruffed_client::ActivityEvent::MouseDown));

    Ok(())
}

#[tokio::test]
async fn test_sso_login_round_trip() -> Result<()> {
    let backend = TestBackend::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/sso/github/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "provider": "github",
            "clientId": "gh-client",
            "authEndpoint": "https://github.com/login/oauth/authorize",
            "tokenEndpoint": "https://github.com/login/oauth/access_token",
            "userInfoEndpoint": "https://api.github.com/user",
            "redirectUri": "http://localhost:4200/auth/sso/callback",
            "scope": "read:user",
            "responseType": "code"
        })))
        .mount(&backend.server)
        .await;
    let client = backend.client();

    let redirect = client.auth().initiate_sso_login("github").await?;
    assert!(
        redirect
            .url
            .starts_with("https://github.com/login/oauth/authorize?client_id=gh-client")
    );
    assert!(redirect.url.contains(&format!("state={}", redirect.state)));

    let sso_user = user(&["operator"]);
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/sso/callback"))
        .and(header("X-CSRF-TOKEN", CSRF_TOKEN))
        .and(body_json(json!({ "code": "abc123", "state": redirect.state })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": &sso_user })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let logged_in = client
        .auth()
        .handle_sso_callback("abc123", &redirect.state)
        .await?;

    assert_eq!(logged_in, sso_user);
    assert!(client.auth().is_logged_in());
    assert!(client.idle_timer_active());

    Ok(())
}

#[tokio::test]
async fn test_sso_state_mismatch_never_reaches_server() -> Result<()> {
    let backend = TestBackend::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/sso/okta/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "provider": "okta",
            "clientId": "okta-client",
            "authEndpoint": "https://okta.example.com/oauth2/v1/authorize",
            "redirectUri": "http://localhost:4200/auth/sso/callback",
            "scope": "openid profile email"
        })))
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/sso/callback"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend.server)
        .await;
    let client = backend.client();

    client.auth().initiate_sso_login("okta").await?;
    let err = client
        .auth()
        .handle_sso_callback("code", "forged-state")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Client { .. }));
    assert!(!client.auth().is_logged_in());

    Ok(())
}

#[tokio::test]
async fn test_forged_callback_keeps_pending_state() -> Result<()> {
    let backend = TestBackend::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/sso/okta/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "provider": "okta",
            "clientId": "okta-client",
            "authEndpoint": "https://okta.example.com/oauth2/v1/authorize",
            "redirectUri": "http://localhost:4200/auth/sso/callback",
            "scope": "openid profile email"
        })))
        .mount(&backend.server)
        .await;
    let sso_user = user(&["viewer"]);
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/sso/callback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": &sso_user })))
        .expect(1)
        .mount(&backend.server)
        .await;
    let client = backend.client();

    let redirect = client.auth().initiate_sso_login("okta").await?;

    // Two forged callbacks in a row are both refused.
    for _ in 0..2 {
        let err = client
            .auth()
            .handle_sso_callback("code", "forged-state")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "SSO state mismatch");
    }

    let logged_in = client
        .auth()
        .handle_sso_callback("code", &redirect.state)
        .await?;
    assert_eq!(logged_in, sso_user);
    assert!(client.auth().is_logged_in());

    Ok(())
}

#[tokio::test]
async fn test_sso_callback_failure_message() -> Result<()> {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/sso/callback"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body(400, "bad code")))
        .mount(&backend.server)
        .await;
    let client = backend.client();

    let err = client
        .auth()
        .handle_sso_callback("expired", "whatever")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "SSO authentication failed");
    assert!(!client.auth().is_logged_in());

    Ok(())
}

#[tokio::test]
async fn test_session_marker_round_trips_through_login() -> Result<()> {
    let backend = TestBackend::start().await;
    let mut jdoe: UserInfo = user(&["operator"]);
    jdoe.first_name = Some("Jane".into());
    jdoe.last_name = Some("Doe".into());
    let client = backend.client();

    backend.logged_in(&client, &jdoe).await;

    let current = client.auth().current_user().unwrap();
    assert_eq!(current.display_name(), jdoe.display_name());
    assert_eq!(current, jdoe);

    Ok(())
}
