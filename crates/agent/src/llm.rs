//! Text-generation client for an Ollama-compatible `/api/generate` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use shiptrack_core::config::LlmConfig;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("could not build http client: {0}")]
    Client(String),
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode endpoint response: {0}")]
    Decode(String),
}

impl LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            Self::Client(_) | Self::Decode(_) => false,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;

    /// Sends one non-streaming prompt asking for JSON output and returns the
    /// raw generated text.
    async fn generate_json(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Client(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists installed models; used by readiness checks to confirm the
    /// endpoint answers at all.
    pub async fn probe(&self) -> Result<(), LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|error| LlmError::Transport { url: url.clone(), message: error.to_string() })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }
        Ok(())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest { model: &self.model, prompt, stream: false, format: "json" };

        let response = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|error| LlmError::Transport { url: url.clone(), message: error.to_string() })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let body: GenerateResponse =
            response.json().await.map_err(|error| LlmError::Decode(error.to_string()))?;
        Ok(body.response)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_json(&self, prompt: &str) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self.generate_once(prompt).await {
                Ok(text) => {
                    debug!(event_name = "agent.llm.generated", model = %self.model, attempt, "generation complete");
                    return Ok(text);
                }
                Err(error) if attempt < self.max_retries && error.is_retryable() => {
                    let delay = RETRY_BASE_DELAY * 2_u32.saturating_pow(attempt);
                    warn!(
                        event_name = "agent.llm.retry",
                        model = %self.model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use secrecy::SecretString;
    use serde_json::{json, Value};

    use shiptrack_core::config::LlmConfig;

    use super::{LlmClient, LlmError, OllamaClient};

    /// Requests seen by the local endpoint; the first `failures` calls get a 503.
    #[derive(Default)]
    struct Recorded {
        failures: usize,
        bodies: Vec<Value>,
        authorization: Vec<Option<String>>,
    }

    type Shared = Arc<Mutex<Recorded>>;

    async fn generate(State(recorded): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
        let mut recorded = recorded.lock().expect("recorded lock");
        recorded.bodies.push(body);
        recorded.authorization.push(
            headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string),
        );
        if recorded.bodies.len() <= recorded.failures {
            return (StatusCode::SERVICE_UNAVAILABLE, "model is loading").into_response();
        }
        Json(json!({
            "model": "llama3.2:latest",
            "response": "{\"summary\": \"Asked about a parcel\", \"sentiment\": \"Neutral\"}",
            "done": true
        }))
        .into_response()
    }

    async fn tags() -> Json<Value> {
        Json(json!({"models": [{"name": "llama3.2:latest"}]}))
    }

    async fn local_endpoint(failures: usize) -> (String, Shared) {
        let recorded = Arc::new(Mutex::new(Recorded { failures, ..Recorded::default() }));
        let app = Router::new()
            .route("/api/generate", post(generate))
            .route("/api/tags", get(tags))
            .with_state(recorded.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        (format!("http://{address}"), recorded)
    }

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            model: "llama3.2:latest".to_string(),
            api_key: Some(SecretString::from("token".to_string())),
            timeout_secs: 1,
            max_retries: 0,
        }
    }

    #[test]
    fn base_url_is_normalized_without_trailing_slash() {
        let client = OllamaClient::from_config(&config("http://localhost:11434/")).expect("client");
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), "llama3.2:latest");
    }

    #[test]
    fn only_transport_and_server_side_failures_are_retried() {
        let transport = LlmError::Transport { url: "u".to_string(), message: "refused".to_string() };
        assert!(transport.is_retryable());
        assert!(LlmError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(LlmError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!LlmError::Status { status: 404, body: String::new() }.is_retryable());
        assert!(!LlmError::Decode("eof".to_string()).is_retryable());
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_transport_error() {
        let client = OllamaClient::from_config(&config("http://127.0.0.1:9")).expect("client");

        let error = client.generate_json("hi").await.expect_err("nothing listens on port 9");

        assert!(matches!(error, LlmError::Transport { ref url, .. } if url == "http://127.0.0.1:9/api/generate"));
    }

    #[tokio::test]
    async fn generate_posts_json_request_with_bearer_token_and_retries_unavailable() {
        let (base_url, recorded) = local_endpoint(1).await;
        let client = OllamaClient::from_config(&LlmConfig { max_retries: 2, ..config(&base_url) })
            .expect("client");

        let text = client.generate_json("Summarize this chat").await.expect("generated");

        assert_eq!(text, r#"{"summary": "Asked about a parcel", "sentiment": "Neutral"}"#);
        let recorded = recorded.lock().expect("recorded lock");
        assert_eq!(recorded.bodies.len(), 2);
        assert_eq!(
            recorded.bodies[1],
            json!({"model": "llama3.2:latest", "prompt": "Summarize this chat", "stream": false, "format": "json"})
        );
        assert_eq!(recorded.bodies[0], recorded.bodies[1]);
        assert!(recorded.authorization.iter().all(|value| value.as_deref() == Some("Bearer token")));
    }

    #[tokio::test]
    async fn unavailable_endpoint_is_not_retried_by_default() {
        let (base_url, recorded) = local_endpoint(1).await;
        let client = OllamaClient::from_config(&config(&base_url)).expect("client");

        let error = client.generate_json("hi").await.expect_err("503 without retries");

        assert!(matches!(error, LlmError::Status { status: 503, ref body } if body == "model is loading"));
        assert_eq!(recorded.lock().expect("recorded lock").bodies.len(), 1);
    }

    #[tokio::test]
    async fn probe_succeeds_against_listening_endpoint() {
        let (base_url, _recorded) = local_endpoint(0).await;
        let client = OllamaClient::from_config(&config(&base_url)).expect("client");

        client.probe().await.expect("tags endpoint answers");
    }
}
