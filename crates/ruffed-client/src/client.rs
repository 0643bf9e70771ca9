//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use ruffed_config::RuffedConfig;
use ruffed_session::{
    FileSessionStore, InMemorySessionStore, LogoutReason, SessionContext, SessionEvent,
    SharedSessionStore,
};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use url::Url;

use crate::api::AuthApi;
use crate::csrf::{CSRF_HEADER, CsrfTokenProvider};
use crate::error::{Error, ErrorResponse, Result};
use crate::error_log::{ErrorEvent, ErrorLog};
use crate::guard::{self, Access};
use crate::idle::{ActivityEvent, DEFAULT_IDLE_TIMEOUT, IdleTimer};
use crate::interceptor::{RefreshCoordinator, RefreshState, attach_csrf};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of error events kept in memory.
const DEFAULT_MAX_ERRORS: usize = 100;

/// Server-side error log endpoint.
const ERROR_LOG_PATH: &str = "logs/error";

/// Marks requests the UI should not show a loading indicator for.
const BACKGROUND_HEADER: &str = "X-Background-Request";

/// Session-aware API client.
///
/// All requests share one cookie jar, so the HttpOnly session cookies set
/// by `login` ride along on every later call. Requests issued through the
/// typed helpers ([`get`](Self::get), [`post`](Self::post), ...) are
/// intercepted: mutations fetch a CSRF token first, and a 401 triggers a
/// single shared silent refresh followed by one replay.
///
/// # Example
///
/// ```no_run
/// use ruffed_client::{LoginCredentials, RuffedClient};
///
/// # async fn example() -> ruffed_client::Result<()> {
/// let client = RuffedClient::builder()
///     .base_url("http://localhost:5000/api/v1")
///     .build()?;
///
/// client
///     .auth()
///     .login(&LoginCredentials::new("admin", "secret"))
///     .await?;
///
/// let certificates: serde_json::Value = client.get("certificates").await?;
/// println!("{}", certificates);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RuffedClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// HTTP client with the session cookie jar.
    pub(crate) http: reqwest::Client,
    /// API root; always ends with a slash.
    pub(crate) base_url: Url,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Current user and lifecycle events.
    pub(crate) session: SessionContext,
    pub(crate) csrf: CsrfTokenProvider,
    pub(crate) refresh: RefreshCoordinator,
    pub(crate) idle: IdleTimer,
    pub(crate) errors: ErrorLog,
    /// State of an SSO redirect awaiting its callback.
    pub(crate) pending_sso_state: Mutex<Option<String>>,
}

impl RuffedClient {
    /// Get access to the inner client state (for API implementations).
    pub(crate) fn inner(&self) -> &ClientInner {
        &self.inner
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<ClientInner> {
        Arc::downgrade(&self.inner)
    }
}

impl RuffedClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the API root URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the authentication API.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// The owned session context (current user, lifecycle events).
    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }

    /// Receive session lifecycle events (login, refresh, logout).
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.session.subscribe_events()
    }

    /// Recorded request failures.
    pub fn errors(&self) -> &ErrorLog {
        &self.inner.errors
    }

    /// The CSRF token provider shared by every request.
    pub fn csrf(&self) -> &CsrfTokenProvider {
        &self.inner.csrf
    }

    /// `GET /auth/csrf-token`, caching the result.
    pub async fn get_csrf_token(&self) -> Result<String> {
        self.inner.csrf.get_csrf_token(self).await
    }

    /// Whether a 401 recovery is currently running.
    pub fn refresh_state(&self) -> RefreshState {
        self.inner.refresh.state()
    }

    /// Number of silent refreshes started by the interceptor.
    pub fn refresh_count(&self) -> u64 {
        self.inner.refresh.refresh_count()
    }

    /// Report user activity; resets the idle timer of the current session.
    pub fn record_activity(&self, event: ActivityEvent) -> bool {
        self.inner.idle.record_activity(event)
    }

    /// Whether an idle timer is armed for the current session.
    pub fn idle_timer_active(&self) -> bool {
        self.inner.idle.is_active()
    }

    /// Decide whether the current user may open a view.
    pub fn check_access(&self, required_roles: &[&str], attempted_url: &str) -> Access {
        guard::check_access(&self.inner.session, required_roles, attempted_url)
    }

    /// Arm the idle timer; on expiry the session is ended.
    pub(crate) fn arm_idle_timer(&self) {
        let client = self.downgrade();
        self.inner.idle.start(move || async move {
            if let Some(inner) = client.upgrade() {
                RuffedClient::from_inner(inner)
                    .auth()
                    .end_session(LogoutReason::IdleTimeout)
                    .await;
            }
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Typed request helpers (intercepted)
    // ─────────────────────────────────────────────────────────────────────────

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::GET, path)?.build()?;
        self.send_json(request).await
    }

    /// Make a POST request.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.mutate(Method::POST, path, Some(body)).await
    }

    /// Make a PUT request.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.mutate(Method::PUT, path, Some(body)).await
    }

    /// Make a PATCH request.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.mutate(Method::PATCH, path, Some(body)).await
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.mutate::<serde_json::Value, ()>(Method::DELETE, path, None)
            .await
            .map(|_| ())
    }

    /// Fetch a CSRF token, then issue the mutation with it.
    async fn mutate<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let operation = format!("{} {}", method, path);
        let token = match self.get_csrf_token().await {
            Ok(token) => token,
            Err(e) => {
                self.report(&operation, &e);
                return Err(e);
            }
        };

        let mut builder = self.request(method, path)?.header(CSRF_HEADER, token);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send_json(builder.build()?).await
    }

    /// Run a request through the interceptor and decode the JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::Request) -> Result<T> {
        let operation = format!("{} {}", request.method(), request.url().path());
        let result = match self.execute(request).await {
            Ok(response) => self.handle_response(response).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            self.report(&operation, e);
        }
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Interceptor
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a request with 401 recovery.
    ///
    /// On a 401 the session is refreshed (or the in-flight refresh awaited)
    /// and the request replayed exactly once. A failed refresh has already
    /// logged the user out and yields [`Error::SessionExpired`]. Requests
    /// with non-cloneable bodies are returned as received.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let replay = request.try_clone();
        let response = self.dispatch(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(replay) = replay else {
            tracing::debug!(url = %response.url(), "401 on a non-replayable request");
            return Ok(response);
        };
        tracing::debug!(url = %response.url(), "401 received, refreshing session");
        drop(response);

        let client = self.clone();
        self.inner
            .refresh
            .run(move || async move {
                if client.auth().silent_refresh().await {
                    Ok(())
                } else {
                    Err("session refresh was rejected".to_string())
                }
            })
            .await
            .map_err(Error::SessionExpired)?;

        tracing::debug!(url = %replay.url(), "Replaying request after refresh");
        self.dispatch(replay).await
    }

    /// Attach the cached CSRF token and send, without 401 handling.
    async fn dispatch(&self, mut request: reqwest::Request) -> Result<reqwest::Response> {
        attach_csrf(&mut request, self.inner.csrf.cached().as_deref());
        tracing::debug!(method = %request.method(), url = %request.url(), "Sending request");
        Ok(self.inner.http.execute(request).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    /// Start a request for an API path with the client timeout.
    pub fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.url(path)?;
        Ok(self
            .inner
            .http
            .request(method, url)
            .timeout(self.inner.timeout))
    }

    /// Send without interception. Used by the auth endpoints themselves,
    /// whose 401s must never trigger a refresh.
    pub(crate) async fn send_raw(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        self.dispatch(builder.build()?).await
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            Ok(serde_json::from_slice(b"null")?)
        } else {
            Ok(serde_json::from_slice(&body)?)
        }
    }

    /// Extract an error from a failed response.
    pub(crate) async fn extract_error(&self, response: reqwest::Response) -> Error {
        let (status, url, message) = read_error(response).await;
        Error::Http {
            status,
            url,
            message: message.unwrap_or_else(|| format!("HTTP {}", status)),
        }
    }

    /// Record a failure and forward it to the server when configured.
    pub(crate) fn report(&self, operation: &str, error: &Error) {
        let event = ErrorEvent::from_error(Some(operation), error);
        self.inner.errors.record(event.clone());

        if self.inner.errors.forwards_to_server()
            && tokio::runtime::Handle::try_current().is_ok()
        {
            let client = self.clone();
            tokio::spawn(async move { client.forward_error(event).await });
        }
    }

    /// Best-effort `POST /logs/error`. Failures are only traced, never
    /// recorded, so forwarding cannot feed back into itself.
    async fn forward_error(&self, event: ErrorEvent) {
        let builder = match self.request(Method::POST, ERROR_LOG_PATH) {
            Ok(builder) => builder.header(BACKGROUND_HEADER, "true").json(&event),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build error log request");
                return;
            }
        };

        match self.send_raw(builder).await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Error logged to server");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Server rejected error log");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to log error to server"),
        }
    }
}

/// Split a failed response into status, URL and server-supplied message.
pub(crate) async fn read_error(response: reqwest::Response) -> (u16, String, Option<String>) {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let message = response
        .json::<ErrorResponse>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.is_empty());
    (status, url, message)
}

/// Builder for creating a [`RuffedClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
    session_store: Option<SharedSessionStore>,
    idle_timeout: Duration,
    log_errors_to_server: bool,
    max_errors: usize,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            session_store: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            log_errors_to_server: false,
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }

    /// Seed a builder from loaded configuration, storing the session marker
    /// in the configured data directory.
    pub fn from_config(config: &RuffedConfig) -> Self {
        let api = config.api();
        let session = config.session();
        let logging = config.logging();
        Self::new()
            .base_url(api.url.clone())
            .timeout(api.timeout())
            .idle_timeout(session.idle_timeout())
            .log_errors_to_server(logging.log_errors_to_server)
            .max_errors(logging.max_errors)
            .session_store(Arc::new(FileSessionStore::new(
                &session.effective_data_dir(),
            )))
    }

    /// Set the API root (e.g. `http://localhost:5000/api/v1`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Persist the session marker here (default: in memory).
    pub fn session_store(mut self, store: SharedSessionStore) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Inactivity window before a forced logout.
    pub fn idle_timeout(mut self, window: Duration) -> Self {
        self.idle_timeout = window;
        self
    }

    /// Forward recorded errors to `POST /logs/error`.
    pub fn log_errors_to_server(mut self, enabled: bool) -> Self {
        self.log_errors_to_server = enabled;
        self
    }

    /// Number of error events kept in memory.
    pub fn max_errors(mut self, max: usize) -> Self {
        self.max_errors = max;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<RuffedClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        if self.idle_timeout.is_zero() {
            return Err(Error::Config("idle timeout must be non-zero".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("ruffed-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .cookie_store(true)
            .build()?;

        let store = self
            .session_store
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));

        Ok(RuffedClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                session: SessionContext::new(store),
                csrf: CsrfTokenProvider::new(),
                refresh: RefreshCoordinator::new(),
                idle: IdleTimer::new(self.idle_timeout),
                errors: ErrorLog::new(self.max_errors, self.log_errors_to_server),
                pending_sso_state: Mutex::new(None),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
