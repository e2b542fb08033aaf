//! REST API for the codepad editor

use crate::dispatch::{DispatchError, Dispatcher};
use crate::explain::{ExplainError, Explainer};
use crate::normalize::{CodeEncoding, Normalizer, ValidationError};
use crate::share::{ChatWebhook, ShareError, ShareKind};
use crate::store::{StoreError, TeamSave, WorkspaceDocument, WorkspaceStore};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// API state
pub struct ApiState {
    pub normalizer: Normalizer,
    pub dispatcher: Dispatcher,
    pub store: Arc<dyn WorkspaceStore>,
    pub webhook: ChatWebhook,
    pub explainer: Arc<dyn Explainer>,
}

/// Request to run code
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// Language label: python, javascript, java, c, c++
    #[serde(default)]
    pub language: Option<String>,
    /// Source text, possibly urlencoded
    #[serde(default)]
    pub code: Option<String>,
    /// How `code` is encoded; omitted means "guess" for legacy clients
    #[serde(default)]
    pub encoding: Option<CodeEncoding>,
}

/// Response from a run
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    /// Merged stdout/stderr for display
    pub output: String,
    /// The sandbox's raw `run` object
    pub raw: serde_json::Value,
}

/// Request to share to chat
#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub output: String,
}

/// Request to explain code
#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Explanation plus the model's raw reply
#[derive(Debug, Serialize, Deserialize)]
pub struct ExplainResponse {
    pub explanation: String,
    pub raw: serde_json::Value,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sandbox: String,
    pub webhook_configured: bool,
    pub explain_model: String,
}

/// Uniform error body: `{"error": "...", "details": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        warn!(error = %err, "Execution failed");
        ApiError::internal(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "Team store failed");
        ApiError::internal(err.to_string())
    }
}

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        let message = err.to_string();
        match err {
            ShareError::InvalidType(_) => ApiError::new(StatusCode::BAD_REQUEST, message),
            ShareError::Rejected { body, .. } => {
                warn!(error = %message, "Webhook rejected message");
                ApiError::new(StatusCode::BAD_GATEWAY, message).with_details(body)
            }
            _ => ApiError::internal(message),
        }
    }
}

impl From<ExplainError> for ApiError {
    fn from(err: ExplainError) -> Self {
        let message = err.to_string();
        warn!(error = %message, "Explanation failed");
        match err {
            ExplainError::Status { body, .. } => {
                ApiError::new(StatusCode::BAD_GATEWAY, message).with_details(body)
            }
            ExplainError::HttpError(_) => ApiError::new(StatusCode::BAD_GATEWAY, message),
        }
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "internal error".to_string()
    };
    error!(panic = %message, "Handler panicked");
    ApiError::internal(message).into_response()
}

/// Create the API router
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/execute", post(execute))
        .route(
            "/team-workspace",
            get(get_team).post(save_team).delete(delete_team),
        )
        .route("/share", post(share))
        .route("/explain", post(explain))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sandbox: state.dispatcher.sandbox().name().to_string(),
        webhook_configured: state.webhook.is_configured(),
        explain_model: state.explainer.model().to_string(),
    })
}

/// Normalize and run code
async fn execute(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let Json(request) = body?;
    let normalized = state.normalizer.normalize(
        request.language.as_deref(),
        request.code.as_deref(),
        request.encoding,
    )?;

    let result = state.dispatcher.execute(&normalized).await?;
    Ok(Json(ExecuteResponse {
        output: result.display_output,
        raw: result.raw,
    }))
}

/// Current team document (the default if never saved)
async fn get_team(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<WorkspaceDocument>, ApiError> {
    Ok(Json(state.store.get().await?))
}

/// Overwrite the team document
async fn save_team(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<TeamSave>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(save) = body?;
    state.store.set(save.into()).await?;
    Ok(Json(serde_json::json!({ "saved": true })))
}

/// Reset the team document to its default
async fn delete_team(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.reset().await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Post code and/or output to the chat webhook
async fn share(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<ShareRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = body?;
    let kind = ShareKind::from_label(&request.kind)?;
    let reply = state
        .webhook
        .share(kind, &request.language, &request.code, &request.output)
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "reply": reply })))
}

/// Ask the model to explain a snippet
async fn explain(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<ExplainRequest>, JsonRejection>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let Json(request) = body?;
    let language = required(request.language.as_deref(), "language")?;
    let code = required(request.code.as_deref(), "code")?;

    let explanation = state.explainer.explain(language, code).await?;
    Ok(Json(ExplainResponse {
        explanation: explanation.text,
        raw: explanation.raw,
    }))
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, ValidationError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ValidationError::MissingField(field))
}
