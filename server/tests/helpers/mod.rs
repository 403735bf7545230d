//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for sending requests through the full axum router,
//! a recording [`MockBackend`], and a local event [`Collector`].
//!
//! ## Test Servers
//!
//! Use [`spawn_test_server()`] when you need stateful middleware testing
//! (rate limiting, real sockets) instead of `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{self, HeaderMap, Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use botgate_server::api::{create_router, AppState};
use botgate_server::backend::{Action, ActionResponse, Backend, Event, EventListener};
use botgate_server::config::Config;
use botgate_server::ratelimit::RateLimit;
use futures::future::BoxFuture;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tower::ServiceExt;

pub const TEST_SELF_ID: i64 = 10001;

// ============================================================================
// Mock Backend
// ============================================================================

/// Backend that records every call and answers with an ok envelope.
pub struct MockBackend {
    self_id: i64,
    delay: Option<Duration>,
    calls: Mutex<Vec<Action>>,
    listeners: Mutex<Vec<Arc<dyn EventListener>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            self_id: TEST_SELF_ID,
            delay: None,
            calls: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Make every `execute` take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Action> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Raise an event, awaiting every listener in registration order.
    pub async fn emit(&self, event: Event) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_event(event.clone()).await;
        }
    }
}

impl Backend for MockBackend {
    fn self_id(&self) -> i64 {
        self.self_id
    }

    fn execute(&self, action: Action) -> BoxFuture<'_, ActionResponse> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let data = match &action {
                Action::GetLoginInfo => json!({"user_id": self.self_id, "nickname": "mock"}),
                _ => Value::Null,
            };
            self.calls.lock().unwrap().push(action);
            ActionResponse::ok(data)
        })
    }

    fn on_event(&self, listener: Arc<dyn EventListener>) {
        self.listeners.lock().unwrap().push(listener);
    }
}

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub backend: Arc<MockBackend>,
    pub config: Arc<Config>,
}

impl TestApp {
    /// Create a new test app with the default test config.
    pub fn new() -> Self {
        Self::with_config(Config::default_for_test())
    }

    /// Create a test app with a custom config.
    pub fn with_config(config: Config) -> Self {
        Self::build(config, Arc::new(MockBackend::new()), None)
    }

    /// Create a test app with a rate limiter in front of dispatch.
    pub fn with_rate_limiter(limiter: Arc<dyn RateLimit>) -> Self {
        Self::build(Config::default_for_test(), Arc::new(MockBackend::new()), Some(limiter))
    }

    pub fn build(
        config: Config,
        backend: Arc<MockBackend>,
        rate_limiter: Option<Arc<dyn RateLimit>>,
    ) -> Self {
        let state = AppState::new(backend.clone(), config.clone(), rate_limiter);
        Self {
            router: create_router(state),
            backend,
            config: Arc::new(config),
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Build a POST request with a JSON body.
    pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Self::request(Method::POST, uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Build a GET request with an empty body.
    pub fn get(uri: &str) -> Request<Body> {
        Self::request(Method::GET, uri).body(Body::empty()).unwrap()
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes()
}

// ============================================================================
// Test Server
// ============================================================================

/// A running test server bound to a random port.
pub struct TestServer {
    /// Server address (127.0.0.1:PORT).
    pub addr: SocketAddr,
    /// Base URL for HTTP requests (e.g., `http://127.0.0.1:12345`).
    pub url: String,
    /// Handle to the server task for cleanup.
    _handle: JoinHandle<()>,
}

/// Spawn a real HTTP server on a random port.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

// ============================================================================
// Event Collector
// ============================================================================

/// One request received by the collector.
#[derive(Debug, Clone)]
pub struct CapturedPush {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedPush {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Pushed body is not JSON")
    }
}

/// How the collector answers.
#[derive(Debug, Clone)]
pub struct CollectorBehavior {
    /// Answer the first N requests with 500.
    pub fail_first: usize,
    /// Sleep this long before answering every request.
    pub delay: Option<Duration>,
    /// Body of successful answers.
    pub reply: String,
}

impl Default for CollectorBehavior {
    fn default() -> Self {
        Self {
            fail_first: 0,
            delay: None,
            reply: String::new(),
        }
    }
}

#[derive(Clone)]
struct CollectorState {
    behavior: CollectorBehavior,
    pushes: Arc<Mutex<Vec<CapturedPush>>>,
}

/// Local HTTP endpoint standing in for an event collector.
pub struct Collector {
    pub server: TestServer,
    pushes: Arc<Mutex<Vec<CapturedPush>>>,
}

impl Collector {
    pub async fn spawn(behavior: CollectorBehavior) -> Self {
        let pushes = Arc::new(Mutex::new(Vec::new()));
        let state = CollectorState {
            behavior,
            pushes: pushes.clone(),
        };
        let router = Router::new()
            .route("/events", post(collect))
            .with_state(state);

        Self {
            server: spawn_test_server(router).await,
            pushes,
        }
    }

    pub fn url(&self) -> String {
        format!("{}/events", self.server.url)
    }

    pub fn pushes(&self) -> Vec<CapturedPush> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

async fn collect(
    State(state): State<CollectorState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // Recorded before any delay so timed-out attempts still count.
    let seen = {
        let mut pushes = state.pushes.lock().unwrap();
        pushes.push(CapturedPush { headers, body });
        pushes.len()
    };

    if let Some(delay) = state.behavior.delay {
        tokio::time::sleep(delay).await;
    }

    if seen <= state.behavior.fail_first {
        (StatusCode::INTERNAL_SERVER_ERROR, String::new())
    } else {
        (StatusCode::OK, state.behavior.reply.clone())
    }
}
