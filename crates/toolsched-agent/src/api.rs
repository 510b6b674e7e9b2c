//! HTTP surface
//!
//! Three routes: a liveness message, a health probe, and the answer
//! endpoint. The request body is schema-validated by the Json extractor;
//! `scheduler` defaults to enabling the selection middleware.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use toolsched_core::agent::AgentService;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AgentService>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    #[serde(default)]
    pub scheduler: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/agent/answer", post(answer))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Agent API is running",
        "status": "ok",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Json<AnswerResponse> {
    let scheduling = request.scheduler.unwrap_or(true);
    let answer = state.service.answer(&request.question, scheduling).await;
    Json(AnswerResponse { answer })
}
