//! REST facade for the tax advisor client
//!
//! Exposes normalization, classification, rendering and the backend
//! round-trips to a browser UI.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::advisor::{ChatOutcome, SubmissionOutcome, TaxAdvisor};
use crate::classifier::SessionState;
use crate::error::ClientError;
use crate::markdown;
use crate::models::{ChatTurn, SessionContext};
use crate::payload::to_request_payload;

const USER_ID_HEADER: &str = "x-user-id";

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub markdown: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Failure that still carries structured detail for the UI
    pub fn failure<T: Serialize>(message: String, data: T) -> Self {
        Self {
            data: serde_json::to_value(data).ok(),
            ..Self::error(message)
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub advisor: Arc<TaxAdvisor>,
}

/// =============================
/// Helpers
/// =============================

fn session_context(headers: &HeaderMap) -> Result<SessionContext, ApiResult> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(SessionContext::new)
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("X-User-ID header is required".into())),
            )
        })
}

/// Unwrap a JSON body, keeping malformed bodies inside the response envelope.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiResult> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        (
            rejection.status(),
            Json(ApiResponse::error(rejection.body_text())),
        )
    })
}

fn client_error(err: ClientError) -> ApiResult {
    let status = match &err {
        ClientError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_contract_violation() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ApiResponse::error(err.to_string())))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Profile Endpoints
/// =============================

async fn normalize_profile(
    State(state): State<ApiState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult {
    let raw = match json_body(payload) {
        Ok(raw) => raw,
        Err(rejection) => return rejection,
    };

    match state.advisor.normalizer().normalize_value(&raw) {
        Ok(profile) => {
            let payload = to_request_payload(&profile);
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "profile": profile,
                    "payload": payload,
                }))),
            )
        }
        Err(violations) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::failure(
                format!("{} field(s) failed validation", violations.len()),
                serde_json::json!({ "violations": violations }),
            )),
        ),
    }
}

async fn submit_profile(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult {
    let ctx = match session_context(&headers) {
        Ok(ctx) => ctx,
        Err(rejection) => return rejection,
    };
    let raw = match json_body(payload) {
        Ok(raw) => raw,
        Err(rejection) => return rejection,
    };

    let outcome = state.advisor.submit_value(&ctx, &raw).await;
    let status = match &outcome {
        SubmissionOutcome::Submitted { .. } => StatusCode::OK,
        SubmissionOutcome::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionOutcome::TransportError { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SubmissionOutcome::ContractViolation { .. } => StatusCode::BAD_GATEWAY,
    };

    let response = if status == StatusCode::OK {
        ApiResponse::success(&outcome)
    } else {
        ApiResponse::failure("Tax profile submission failed".into(), &outcome)
    };
    (status, Json(response))
}

/// =============================
/// Chat Endpoints
/// =============================

async fn classify_history(payload: Result<Json<ClassifyRequest>, JsonRejection>) -> ApiResult {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };
    let state = SessionState::of(&req.history);
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "isInterruptionResponse": state == SessionState::AwaitingResponse,
            "state": state,
        }))),
    )
}

async fn list_sessions(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult {
    let ctx = match session_context(&headers) {
        Ok(ctx) => ctx,
        Err(rejection) => return rejection,
    };

    match state.advisor.list_sessions(&ctx).await {
        Ok(sessions) => (StatusCode::OK, Json(ApiResponse::success(sessions))),
        Err(e) => client_error(e),
    }
}

async fn get_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    let ctx = match session_context(&headers) {
        Ok(ctx) => ctx.with_session(session_id.clone()),
        Err(rejection) => return rejection,
    };

    match state.advisor.load_session(&ctx, &session_id).await {
        Ok(history) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "session": history,
                "state": history.state(),
            }))),
        ),
        Err(e) => client_error(e),
    }
}

async fn send_message(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult {
    let ctx = match session_context(&headers) {
        Ok(ctx) => ctx.with_session(session_id.clone()),
        Err(rejection) => return rejection,
    };
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };

    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("message must not be empty".into())),
        );
    }

    // The backend owns the session; refresh before classifying.
    let mut history = match state.advisor.load_session(&ctx, &session_id).await {
        Ok(history) => history,
        Err(e) => return client_error(e),
    };

    info!(session_id = %session_id, state = ?history.state(), "Forwarding chat message");

    match state.advisor.send_message(&ctx, &mut history, &req.message).await {
        outcome @ ChatOutcome::Replied { .. } => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "outcome": outcome,
                "turns": history.turns(),
            }))),
        ),
        outcome @ ChatOutcome::TransportError { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::failure("Chat backend unavailable".into(), outcome)),
        ),
        outcome @ ChatOutcome::ContractViolation { .. } => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::failure("Unexpected chat backend response".into(), outcome)),
        ),
    }
}

/// =============================
/// Render Endpoint
/// =============================

async fn render_markdown(payload: Result<Json<RenderRequest>, JsonRejection>) -> ApiResult {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "html": markdown::render(&req.markdown),
        }))),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(advisor: Arc<TaxAdvisor>) -> Router {
    let state = ApiState { advisor };

    Router::new()
        .route("/health", get(health))
        .route("/api/profile/normalize", post(normalize_profile))
        .route("/api/profile/submit", post(submit_profile))
        .route("/api/chat/classify", post(classify_history))
        .route("/api/chat/sessions", get(list_sessions))
        .route("/api/chat/sessions/:session_id", get(get_session))
        .route("/api/chat/sessions/:session_id/messages", post(send_message))
        .route("/api/render", post(render_markdown))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    advisor: Arc<TaxAdvisor>,
    bind_addr: &str,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(advisor);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    info!("API Server listening on http://{}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
