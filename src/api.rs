//! REST API Server for the conversation orchestrator
//!
//! Thin HTTP wrapper over [`ChatOrchestrator`]. Authentication and ledger
//! CRUD live elsewhere; callers pass the financial snapshot in the body.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::agent::{ChatOrchestrator, ChatTurnRequest};
use crate::error::OrchestrationError;
use crate::llm::ImageInput;
use crate::models::FinancialContext;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: Option<String>,
    pub message: Option<String>,
    /// Persona chosen by the caller; classified from the message when absent
    pub persona: Option<String>,
    pub image_base64: Option<String>,
    pub mime_type: Option<String>,
    #[serde(default)]
    pub financial_context: FinancialContext,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub user_id: Option<String>,
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
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<ChatOrchestrator>,
}

/// =============================
/// Helpers
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Parse a caller id; non-UUID ids map to a stable UUID, blank ids to nil
fn parse_user_id(value: Option<&str>) -> Uuid {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v)),
        _ => Uuid::nil(),
    }
}

fn error_status(error: &OrchestrationError) -> StatusCode {
    if error.is_contract_violation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
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
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_user_id(req.user_id.as_deref());

    let image = req.image_base64.filter(|data| !data.is_empty()).map(|data| ImageInput {
        mime_type: req.mime_type.unwrap_or_else(|| "image/jpeg".to_string()),
        data,
    });

    let turn = ChatTurnRequest {
        user_id,
        message: req.message,
        persona_hint: req.persona,
        image,
        financial_context: req.financial_context,
    };

    match state.orchestrator.handle_turn(turn).await {
        Ok(response) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "user_id": user_id.to_string(),
                "agent": response.persona.as_str(),
                "response": response.response,
                "model_tier": response.decision.model_tier,
                "model": response.decision.model_id,
                "pending_action": response.state.pending_action,
                "awaiting_confirmation": response.state.awaiting_confirmation,
                "resolved_intent": response.resolved_intent,
                "audit_id": response.audit_id,
                "degraded": response.degraded,
            }))),
        ),
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Chat turn rejected");
            (error_status(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// =============================
/// Reset Endpoint
/// =============================

async fn reset_handler(
    State(state): State<ApiState>,
    Json(req): Json<ResetRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_user_id(req.user_id.as_deref());

    match state.orchestrator.reset_state(user_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "user_id": user_id.to_string(),
                "reset": true,
            }))),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<ChatOrchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/reset", post(reset_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<ChatOrchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
