use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{CompletionBackend, ModelError};
use crate::config::ModelConfig;

/// Completion backend for a locally served Ollama model.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    retry_delay_ms: u64,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

enum AttemptError {
    Retryable(String),
    Fatal(String),
}

impl OllamaBackend {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.host()),
            model: config.name().to_string(),
            temperature: config.temperature(),
            max_retries: config.max_retries(),
            retry_delay_ms: config.retry_delay_ms(),
        })
    }

    async fn send_once(&self, prompt: &str) -> Result<String, AttemptError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(format!("request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Retryable(format!(
                "backend returned {}: {}",
                status.as_u16(),
                body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Fatal(format!(
                "backend returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Fatal(format!("malformed completion: {}", e)))?;
        Ok(generated.response)
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    /// Retries transport failures, 429 and 5xx up to `max_retries` times with
    /// exponential backoff. Any other failure ends the call immediately.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_bytes = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let max_attempts = self.max_retries.saturating_add(1);
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self
                    .retry_delay_ms
                    .saturating_mul(2_u64.saturating_pow(attempt - 2));
                debug!(attempt, delay_ms = delay, "retrying model request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.send_once(prompt).await {
                Ok(text) => {
                    debug!(attempt, completion_bytes = text.len(), "received completion");
                    return Ok(text);
                }
                Err(AttemptError::Retryable(reason)) => {
                    warn!(attempt, max_attempts, %reason, "model request failed");
                    last_reason = reason;
                }
                Err(AttemptError::Fatal(reason)) => {
                    return Err(ModelError::Unavailable {
                        attempts: attempt,
                        reason,
                    });
                }
            }
        }

        Err(ModelError::Unavailable {
            attempts: max_attempts,
            reason: last_reason,
        })
    }
}
