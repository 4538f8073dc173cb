//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use clinic_assistant::config::AppConfig;
use clinic_assistant::context::DocumentContext;
use clinic_assistant::http::HttpServer;
use clinic_assistant::lifecycle::Shutdown;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// One canned upstream answer.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(&'static str, String)>,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: vec![("content-type", "application/json".to_string())],
        }
    }

    /// A successful completion carrying `text`.
    pub fn completion(text: &str) -> Self {
        Self::json(
            200,
            json!({
                "choices": [{ "message": { "role": "assistant", "content": text } }],
                "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
            }),
        )
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// A request the mock upstream received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    replies: Arc<Vec<MockReply>>,
    calls: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

/// Handle to a running mock chat-completions endpoint.
pub struct MockUpstream {
    pub url: String,
    calls: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl MockUpstream {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

/// Start a mock upstream. The nth call gets `replies[n]`; calls past the end
/// repeat the last reply.
pub async fn start_mock_upstream(replies: Vec<MockReply>) -> MockUpstream {
    assert!(!replies.is_empty(), "mock upstream needs at least one reply");

    let state = MockState {
        replies: Arc::new(replies),
        calls: Arc::new(AtomicUsize::new(0)),
        recorded: Arc::new(Mutex::new(Vec::new())),
    };
    let calls = state.calls.clone();
    let recorded = state.recorded.clone();

    let app = Router::new()
        .route("/openai/v1/chat/completions", post(mock_completions))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream {
        url: format!("http://{}/openai/v1/chat/completions", addr),
        calls,
        recorded,
    }
}

async fn mock_completions(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let n = state.calls.fetch_add(1, Ordering::SeqCst);
    state.recorded.lock().unwrap().push(Recorded {
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let reply = &state.replies[n.min(state.replies.len() - 1)];
    let mut response = (
        StatusCode::from_u16(reply.status).unwrap(),
        reply.body.clone(),
    )
        .into_response();
    for (name, value) in &reply.headers {
        response.headers_mut().insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    response
}

/// Default config pointed at `upstream_url`, with a test credential.
pub fn test_config(upstream_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.api_url = upstream_url.to_string();
    config.upstream.api_key = Some("test-key".into());
    config.upstream.system_prompt = "You are the clinic assistant.".into();
    config.timeouts.upstream_secs = 5;
    config
}

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the gateway with a fixed document context.
pub async fn start_gateway(config: AppConfig, context: &str) -> TestGateway {
    let server = HttpServer::with_context(config, Arc::new(DocumentContext::fixed(context)))
        .expect("server should build");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    TestGateway {
        addr,
        client,
        shutdown,
    }
}
