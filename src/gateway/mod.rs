//! Axum-based HTTP gateway for the chat front end.
//!
//! - `GET /health` for liveness checks
//! - `POST /api/query` runs one workflow per request and returns the outcome
//!
//! Bodies are capped at 64KB and every request is bounded by a timeout.
//! Workflows share only the immutable capabilities held by [`Workflow`].

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::workflow::Workflow;

/// Maximum request body size (64KB).
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout. A run makes several sequential model calls plus retries.
pub const REQUEST_TIMEOUT_SECS: u64 = 180;
/// Longest query accepted, in characters.
pub const MAX_QUERY_CHARS: usize = 4_000;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
}

/// Build the router. Split out from [`run_gateway`] so tests can drive it.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/query", post(handle_query))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    if !addr.ip().is_loopback() {
        tracing::warn!(%addr, "Gateway bound to a non-loopback address");
    }

    let workflow = Arc::new(Workflow::from_config(&config)?);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "Gateway listening");
    println!("⚖️  lexgate gateway listening on http://{local}");
    println!("   POST /api/query  {{\"query\": \"...\"}}");

    let app = router(AppState { workflow });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// GET /health
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    query: String,
}

/// POST /api/query — run the workflow for one query.
async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryBody>, JsonRejection>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4().to_string();

    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(request_id = %request_id, "Query JSON parse error: {e}");
            let err = serde_json::json!({
                "error": "Invalid JSON body. Expected: {\"query\": \"...\"}",
                "request_id": request_id,
            });
            return (StatusCode::BAD_REQUEST, Json(err));
        }
    };

    let query = body.query.trim();
    if query.is_empty() {
        let err = serde_json::json!({
            "error": "Query must not be empty",
            "request_id": request_id,
        });
        return (StatusCode::BAD_REQUEST, Json(err));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        let err = serde_json::json!({
            "error": format!("Query exceeds {MAX_QUERY_CHARS} characters"),
            "request_id": request_id,
        });
        return (StatusCode::PAYLOAD_TOO_LARGE, Json(err));
    }

    tracing::info!(request_id = %request_id, query_len = query.chars().count(), "Query received");
    let outcome = state.workflow.run(query).await;
    tracing::info!(
        request_id = %request_id,
        terminal = ?outcome.terminal,
        retry_count = outcome.retry_count,
        "Query answered"
    );

    let body = serde_json::json!({
        "request_id": request_id,
        "final_answer": outcome.final_answer,
        "responder_kind": outcome.responder_kind,
        "terminal": outcome.terminal,
        "retry_count": outcome.retry_count,
    });
    (StatusCode::OK, Json(body))
}
