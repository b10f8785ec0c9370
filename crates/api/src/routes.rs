//! HTTP route handlers for the API.

use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use quantdesk_coordinator::FinalOutput;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Invocation request body.
#[derive(Debug, Deserialize)]
pub struct InvocationRequest {
    pub prompt: String,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// Run one task through the orchestration engine.
///
/// The engine is infallible, so a syntactically valid request always gets a
/// 200 with a [`FinalOutput`]; run-level failures are reported inside the
/// payload's `status` and `failed_stage` fields.
pub async fn invoke(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvocationRequest>,
) -> Result<Json<FinalOutput>, ErrorResponse> {
    if request.prompt.trim().is_empty() {
        return Err(ErrorResponse {
            error: "prompt must not be empty".into(),
            code: "EMPTY_PROMPT",
        });
    }

    info!(
        prompt_preview = %request.prompt.chars().take(50).collect::<String>(),
        "Received invocation"
    );

    let output = state.engine.run(&request.prompt, Utc::now()).await;
    Ok(Json(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.3.0",
            uptime_seconds: 100,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("uptime_seconds"));
    }

    #[test]
    fn invocation_request_deserialization() {
        let request: InvocationRequest =
            serde_json::from_str(r#"{"prompt": "How is AAPL doing?"}"#).unwrap();
        assert_eq!(request.prompt, "How is AAPL doing?");
    }

    #[test]
    fn request_without_prompt_is_rejected() {
        assert!(serde_json::from_str::<InvocationRequest>(r#"{"query": "x"}"#).is_err());
    }
}
