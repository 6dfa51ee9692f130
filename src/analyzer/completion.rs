//! Chat-completion API client used for roaming analysis.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info};

use crate::error::AnalyzerError;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const TEMPERATURE: f64 = 0.2;
const MAX_TOKENS: u32 = 4000;

/// A text-completion backend: one prompt in, the model's raw answer out.
pub trait CompletionService {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, AnalyzerError>> + Send;
}

/// Settings for an OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Client for OpenAI-style `/v1/chat/completions` endpoints.
pub struct OpenAiClient {
    client: reqwest::Client,
    settings: CompletionSettings,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(settings: CompletionSettings, api_key: String) -> Result<Self, AnalyzerError> {
        if api_key.trim().is_empty() {
            return Err(AnalyzerError::MissingCredential);
        }
        let client = build_api_client(settings.timeout_secs)?;
        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }
}

/// Request body sent for every analysis.
pub fn request_body(model: &str, prompt: &str) -> Value {
    serde_json::json!({
        "model": model,
        "messages": [
            {"role": "user", "content": prompt}
        ],
        "temperature": TEMPERATURE,
        "max_tokens": MAX_TOKENS
    })
}

impl CompletionService for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnalyzerError> {
        let body = request_body(&self.settings.model, prompt);
        info!(
            "Calling completion API at {} with model '{}' ({} prompt chars)",
            self.settings.endpoint,
            self.settings.model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let err = if e.is_timeout() {
                    AnalyzerError::Timeout(self.settings.timeout_secs)
                } else {
                    AnalyzerError::Transport(e.to_string())
                };
                error!("{}", err);
                err
            })?;

        let body_text = handle_api_response(response, self.settings.timeout_secs).await?;
        extract_message_content(&body_text)
    }
}

/// Build a reqwest client with the per-request timeout.
fn build_api_client(timeout_secs: u64) -> Result<reqwest::Client, AnalyzerError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnalyzerError::Transport(format!("Failed to build HTTP client: {}", e)))
}

/// Check the status (only 200 is accepted) and read the body text.
async fn handle_api_response(
    response: reqwest::Response,
    timeout_secs: u64,
) -> Result<String, AnalyzerError> {
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());
        let err = AnalyzerError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        };
        error!("{}", err);
        return Err(err);
    }
    response.text().await.map_err(|e| {
        if e.is_timeout() {
            AnalyzerError::Timeout(timeout_secs)
        } else {
            AnalyzerError::Transport(format!("Failed to read API response body: {}", e))
        }
    })
}

/// Prefer the `error.message` of an OpenAI error body, else the truncated body.
fn api_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(message) = json["error"]["message"].as_str() {
            return message.to_string();
        }
    }
    if body.chars().count() > 1024 {
        let truncated: String = body.chars().take(1024).collect();
        format!("{}...", truncated)
    } else {
        body.to_string()
    }
}

/// Pull `choices[0].message.content` out of the response envelope.
pub fn extract_message_content(body_text: &str) -> Result<String, AnalyzerError> {
    let resp_json: Value = serde_json::from_str(body_text).map_err(|e| {
        let err = AnalyzerError::MalformedEnvelope(format!("response is not JSON: {}", e));
        error!("{}", err);
        err
    })?;

    resp_json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| {
            let err =
                AnalyzerError::MalformedEnvelope("no choices[0].message.content".to_string());
            error!("{}", err);
            err
        })
}
