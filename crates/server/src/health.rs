use std::path::{Path, PathBuf};

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    ratings_path: PathBuf,
    action_count: usize,
}

impl HealthState {
    pub fn new(ratings_path: impl Into<PathBuf>, action_count: usize) -> Self {
        Self { ratings_path: ratings_path.into(), action_count }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub rating_log: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let rating_log = rating_log_check(&state.ratings_path).await;
    let ready = rating_log.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("{} actions registered", state.action_count),
        },
        rating_log,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

/// The log is ready when its directory accepts a new file; the log itself may
/// not exist until the first rating arrives.
async fn rating_log_check(path: &Path) -> HealthCheck {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let probe = tokio::task::spawn_blocking(move || tempfile::tempfile_in(&dir).map(|_| dir)).await;
    match probe {
        Ok(Ok(dir)) => HealthCheck {
            status: "ready",
            detail: format!("rating log directory `{}` is writable", dir.display()),
        },
        Ok(Err(error)) => HealthCheck {
            status: "degraded",
            detail: format!("rating log directory is not writable: {error}"),
        },
        Err(error) => HealthCheck { status: "degraded", detail: format!("write probe failed: {error}") },
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_log_directory_is_writable() {
        let dir = tempfile::tempdir().expect("tempdir");

        let (status, Json(payload)) =
            health(State(HealthState::new(dir.path().join("ratings_log.csv"), 8))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.rating_log.status, "ready");
        assert_eq!(payload.service.detail, "8 actions registered");
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_log_directory_is_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("gone").join("ratings_log.csv");

        let (status, Json(payload)) = health(State(HealthState::new(missing, 8))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.rating_log.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
