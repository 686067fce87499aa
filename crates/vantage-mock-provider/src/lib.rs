//! Mock remote insight endpoint.
//!
//! Serves `POST /v1/insights` with the same request/response shape as the real
//! backend, plus `GET /healthz`. Behavior knobs make it fail or stall so the
//! remote provider's timeout and retry paths can be exercised over real HTTP.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use vantage_protocol::{
    Insight, InsightAction, InsightAudit, InsightRequest, InsightResponse, InsightSeverity,
};

pub const INSIGHTS_PATH: &str = "/v1/insights";

#[derive(Clone, Debug)]
pub struct MockBehavior {
    /// Number of leading requests answered with `failure_status`.
    pub fail_first: u32,
    pub failure_status: u16,
    /// Delay applied before every successful answer.
    pub delay: Duration,
    /// When set, answers with `{insights: [], error}` instead of insights.
    pub error: Option<String>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            fail_first: 0,
            failure_status: 503,
            delay: Duration::ZERO,
            error: None,
        }
    }
}

#[derive(Clone)]
struct MockState {
    behavior: Arc<MockBehavior>,
    hits: Arc<AtomicU32>,
}

pub fn router(behavior: MockBehavior) -> (Router, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let state = MockState {
        behavior: Arc::new(behavior),
        hits: hits.clone(),
    };
    let app = Router::new()
        .route(INSIGHTS_PATH, post(insights))
        .route("/healthz", get(healthz))
        .with_state(state);
    (app, hits)
}

async fn healthz() -> impl IntoResponse {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Json(json!({
        "status": {"code": "ready", "label": "Mock insights ready"},
        "generated": now,
    }))
}

async fn insights(State(state): State<MockState>, Json(request): Json<InsightRequest>) -> Response {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst) + 1;
    let behavior = state.behavior.as_ref();
    if hit <= behavior.fail_first {
        let status =
            StatusCode::from_u16(behavior.failure_status).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
        tracing::debug!(hit, status = status.as_u16(), "mock insights failing request");
        return (status, "mock failure").into_response();
    }
    if !behavior.delay.is_zero() {
        tokio::time::sleep(behavior.delay).await;
    }
    if let Some(error) = behavior.error.as_ref() {
        return Json(InsightResponse::failed(error.clone())).into_response();
    }
    let insight = Insight::new(
        format!("remote.{}", request.view),
        format!("Remote insight for {}", request.view),
        format!("Generated for the {} persona", request.persona.display_label()),
        0.9,
        InsightSeverity::Info,
        InsightAudit::stamp("mock", 0.0),
    )
    .with_action(InsightAction::new("Acknowledge", "insight.ack"));
    Json(InsightResponse::ok(vec![insight])).into_response()
}

/// Running mock server; aborted on drop.
pub struct MockServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicU32>,
    task: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub fn endpoint(&self) -> String {
        format!("http://{}{}", self.addr, INSIGHTS_PATH)
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Binds an ephemeral localhost port and serves the mock in the background.
pub async fn spawn(behavior: MockBehavior) -> anyhow::Result<MockServer> {
    let (app, hits) = router(behavior);
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::warn!(%err, "mock insights server stopped");
        }
    });
    Ok(MockServer { addr, hits, task })
}
