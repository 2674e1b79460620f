//! Action-server endpoints called by the dialogue runtime.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use shiptrack_agent::{ActionResponse, AgentRuntime, Tracker};
use shiptrack_core::errors::{ApplicationError, InterfaceError};

#[derive(Clone)]
pub struct WebhookState {
    runtime: Arc<AgentRuntime>,
}

impl WebhookState {
    pub fn new(runtime: Arc<AgentRuntime>) -> Self {
        Self { runtime }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionCall {
    pub next_action: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub domain: Option<Value>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionDescriptor {
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
struct ActionFailure {
    error: String,
    message: &'static str,
    action_name: String,
    correlation_id: String,
}

pub struct WebhookError {
    action_name: String,
    error: InterfaceError,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self.error {
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ActionFailure {
            error: self.error.message().to_string(),
            message: self.error.user_message(),
            action_name: self.action_name,
            correlation_id: self.error.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(run_action))
        .route("/actions", get(list_actions))
        .with_state(state)
}

pub async fn run_action(
    State(state): State<WebhookState>,
    Json(mut call): Json<ActionCall>,
) -> Result<Json<ActionResponse>, WebhookError> {
    let correlation_id = Uuid::new_v4().simple().to_string();
    if call.tracker.sender_id.is_empty() {
        if let Some(sender_id) = call.sender_id.take() {
            call.tracker.sender_id = sender_id;
        }
    }
    info!(
        event_name = "server.webhook.received",
        correlation_id = %correlation_id,
        action_name = %call.next_action,
        sender_id = %call.tracker.sender_id,
        sdk_version = call.version.as_deref().unwrap_or("unknown"),
        "action call received"
    );

    state.runtime.execute(&call.next_action, &call.tracker, &correlation_id).await.map(Json).map_err(
        |error| WebhookError {
            action_name: call.next_action.clone(),
            error: ApplicationError::from(error).into_interface(correlation_id.clone()),
        },
    )
}

pub async fn list_actions(State(state): State<WebhookState>) -> Json<Vec<ActionDescriptor>> {
    Json(state.runtime.action_names().into_iter().map(|name| ActionDescriptor { name }).collect())
}
