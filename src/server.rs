//! HTTP trigger for the single-issue workflow.
//!
//! `GET /health` answers `OK`. `POST /trigger` takes
//! `{"linear_id": ..., "github_url": ...}` with the shared secret in
//! `X-API-Key`, answers `202 Accepted` at once and runs the workflow in a
//! background task whose result is only logged.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use console::style;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::AgentRunner;
use crate::issue_ref::IssueRef;
use crate::tracker::IssueTracker;
use crate::workflow::{IssueWorkflow, PullRequestOpener, WorkflowOptions};

pub const API_KEY_HEADER: &str = "x-api-key";

pub struct AppState {
    /// Shared secret every trigger must present.
    pub api_key: String,
    pub tracker: Arc<dyn IssueTracker>,
    pub agent: Arc<dyn AgentRunner>,
    pub pull_requests: Arc<dyn PullRequestOpener>,
    /// Parent directory for per-request clones.
    pub workdir: PathBuf,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    #[serde(default)]
    pub linear_id: String,
    #[serde(default)]
    pub github_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/trigger", post(trigger_workflow))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn trigger_workflow(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Json<TriggerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let presented = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    if !api_key_matches(&state.api_key, presented) {
        return Err(ApiError::Unauthorized);
    }

    let Json(req) = body.map_err(|e| ApiError::BadRequest(format!("bad request: {}", e)))?;
    if req.linear_id.trim().is_empty() || req.github_url.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "linear_id and github_url are required".to_string(),
        ));
    }
    let issue_ref = IssueRef::resolve(&req.linear_id)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    info!(issue = %issue_ref, repo_url = %req.github_url, "Workflow triggered");
    let message = format!("Workflow started for Linear issue {}", issue_ref);

    let workflow = IssueWorkflow::new(
        Arc::clone(&state.tracker),
        Arc::clone(&state.agent),
        Arc::clone(&state.pull_requests),
        WorkflowOptions {
            repo_url: req.github_url,
            workdir: state.workdir.clone(),
        },
    );
    tokio::spawn(async move {
        match workflow.run(&issue_ref).await {
            Ok(report) => info!(
                issue = %issue_ref,
                "Workflow completed: {}",
                report.pr_url
            ),
            Err(e) => error!(issue = %issue_ref, "Workflow failed: {}", e),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            status: "started".to_string(),
            message,
        }),
    ))
}

/// Constant-time comparison of the shared secret.
fn api_key_matches(expected: &str, presented: Option<&str>) -> bool {
    presented.is_some_and(|key| bool::from(expected.as_bytes().ct_eq(key.as_bytes())))
}

/// Serve until Ctrl-C.
pub async fn start_server(state: SharedState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!("Starting HTTP server on {}", local_addr);
    println!(
        "{} monday server listening on port {}",
        style("▶").green().bold(),
        local_addr.port()
    );
    println!("  Health check:     GET  http://localhost:{}/health", local_addr.port());
    println!("  Trigger workflow: POST http://localhost:{}/trigger", local_addr.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentOutcome;
    use crate::errors::{AgentError, TrackerError, WorkflowError};
    use crate::tracker::IssueDetails;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingTracker {
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl IssueTracker for RecordingTracker {
        async fn fetch_issue(&self, issue: &IssueRef) -> Result<IssueDetails, TrackerError> {
            self.fetched.lock().unwrap().push(issue.to_string());
            Err(TrackerError::IssueNotFound(issue.to_string()))
        }

        async fn mark_in_progress(&self, _: &IssueDetails) -> Result<(), TrackerError> {
            Ok(())
        }

        async fn post_comment(&self, _: &IssueDetails, _: &str) -> Result<(), TrackerError> {
            Ok(())
        }
    }

    struct UnusedAgent;

    #[async_trait]
    impl AgentRunner for UnusedAgent {
        async fn execute(&self, _: &str, _: &Path) -> Result<AgentOutcome, AgentError> {
            unreachable!("tracker fails first")
        }
    }

    struct UnusedOpener;

    #[async_trait]
    impl PullRequestOpener for UnusedOpener {
        async fn open(&self, _: &Path, _: &str, _: &str) -> Result<String, WorkflowError> {
            unreachable!("tracker fails first")
        }
    }

    fn test_router() -> (Router, Arc<RecordingTracker>) {
        let tracker = Arc::new(RecordingTracker::default());
        let state = Arc::new(AppState {
            api_key: "secret".to_string(),
            tracker: tracker.clone(),
            agent: Arc::new(UnusedAgent),
            pull_requests: Arc::new(UnusedOpener),
            workdir: std::env::temp_dir(),
        });
        (build_router(state), tracker)
    }

    fn trigger(key: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/trigger")
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("X-API-Key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_router();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_trigger_requires_api_key() {
        let (app, _) = test_router();
        let body = r#"{"linear_id":"DEL-1","github_url":"https://github.com/a/b"}"#;
        let resp = app.clone().oneshot(trigger(None, body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = app.oneshot(trigger(Some("wrong"), body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_api_key_matches() {
        assert!(api_key_matches("secret", Some("secret")));
        assert!(!api_key_matches("secret", Some("secreT")));
        assert!(!api_key_matches("secret", Some("secret-but-longer")));
        assert!(!api_key_matches("secret", Some("")));
        assert!(!api_key_matches("secret", None));
    }

    #[tokio::test]
    async fn test_trigger_rejects_malformed_body() {
        let (app, _) = test_router();
        let resp = app.oneshot(trigger(Some("secret"), "{not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().starts_with("bad request"));
    }

    #[tokio::test]
    async fn test_trigger_rejects_missing_fields() {
        let (app, _) = test_router();
        let resp = app
            .clone()
            .oneshot(trigger(Some("secret"), r#"{"linear_id":"DEL-1"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = app
            .oneshot(trigger(Some("secret"), r#"{"linear_id":"","github_url":"x"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_trigger_rejects_invalid_issue_id() {
        let (app, _) = test_router();
        let body = r#"{"linear_id":"not an issue","github_url":"https://github.com/a/b"}"#;
        let resp = app.oneshot(trigger(Some("secret"), body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_trigger_accepts_and_runs_in_background() {
        let (app, tracker) = test_router();
        let body = r#"{"linear_id":"https://linear.app/acme/issue/del-163/slug","github_url":"https://github.com/a/b"}"#;
        let resp = app.oneshot(trigger(Some("secret"), body)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "started");
        assert_eq!(json["message"], "Workflow started for Linear issue DEL-163");

        for _ in 0..50 {
            if !tracker.fetched.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(*tracker.fetched.lock().unwrap(), vec!["DEL-163".to_string()]);
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let (app, _) = test_router();
        let req = Request::builder()
            .method("GET")
            .uri("/trigger")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
