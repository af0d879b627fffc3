//! OpenAI-compatible API backend
//!
//! Implements CompletionBackend by making HTTP calls to any OpenAI-compatible
//! API endpoint (OpenAI, Ollama, vLLM, LM Studio, etc.).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{CompletionRequest, CompletionResponse, FinishReason, TokenUsage};

use super::{BackendCapabilities, BackendHealth, CompletionBackend};

const BACKEND_NAME: &str = "openai";

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for OpenAI-compatible API backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    pub api_key: String,

    /// Model to use (e.g., "gpt-3.5-turbo", "llama3")
    pub default_model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient errors
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            default_model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible API backend
pub struct OpenAiBackend {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiBackend {
    /// Create a new OpenAI backend with the given configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            model = %config.default_model,
            "OpenAI-compatible backend created"
        );

        Ok(Self {
            config,
            client,
        })
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.config.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.config.api_key))
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Make a chat completion request with retry logic
    async fn chat_completion(
        &self,
        request_body: &ChatCompletionRequest,
    ) -> Result<(String, FinishReason, TokenUsage)> {
        let url = self.endpoint("chat/completions");
        let mut last_error: Option<Error> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                debug!(attempt, ?backoff, "Retrying after error");
                tokio::time::sleep(backoff).await;
            }

            let mut req = self.client.post(&url).json(request_body);
            if let Some(ref auth) = self.auth_header() {
                req = req.header("Authorization", auth);
            }

            let err = match req.send().await {
                Ok(response) if response.status().is_success() => {
                    let parsed = response
                        .json::<ChatCompletionResponse>()
                        .await
                        .map_err(|e| {
                            Error::upstream_response(
                                BACKEND_NAME,
                                format!("Failed to parse API response: {}", e),
                            )
                        })?;

                    let choice = parsed.choices.into_iter().next().ok_or_else(|| {
                        Error::upstream_response(BACKEND_NAME, "No choices in API response")
                    })?;

                    let text = choice.message.content.unwrap_or_default();
                    let finish_reason = FinishReason::from_api(choice.finish_reason.as_deref());
                    let usage = parsed
                        .usage
                        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
                        .unwrap_or_default();

                    return Ok((text, finish_reason, usage));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let message = format!("API error {}: {}", status, body);
                    if status.as_u16() == 429 || status.is_server_error() {
                        Error::upstream_unavailable(BACKEND_NAME, message)
                    } else {
                        Error::upstream_response(BACKEND_NAME, message)
                    }
                }
                Err(e) if e.is_timeout() => Error::UpstreamTimeout {
                    backend: BACKEND_NAME.to_string(),
                    timeout_ms: self.config.timeout_secs * 1000,
                },
                Err(e) if e.is_connect() => {
                    Error::upstream_unavailable(BACKEND_NAME, format!("Connection error: {}", e))
                }
                Err(e) => Error::upstream_response(BACKEND_NAME, format!("Request error: {}", e)),
            };

            if !err.is_retryable() {
                return Err(err);
            }
            warn!(attempt, error = %err, "Retryable API error");
            last_error = Some(err);
        }

        Err(last_error.unwrap_or_else(|| {
            Error::upstream_unavailable(BACKEND_NAME, "All retry attempts exhausted")
        }))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: BACKEND_NAME,
            model: self.config.default_model.clone(),
            supports_system_prompt: true,
            remote: true,
        }
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        let start = Instant::now();
        let mut req = self.client.get(self.endpoint("models"));
        if let Some(ref auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        let health = match req.send().await {
            Ok(resp) if resp.status().is_success() => BackendHealth {
                operational: true,
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
            Ok(resp) => BackendHealth {
                operational: false,
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: Some(format!("API returned status {}", resp.status())),
            },
            Err(e) => BackendHealth {
                operational: false,
                latency_ms: None,
                error: Some(format!("Connection failed: {}", e)),
            },
        };
        Ok(health)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt,
        });

        let body = ChatCompletionRequest {
            model: self.config.default_model.clone(),
            messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
        };

        let (text, finish_reason, usage) = self.chat_completion(&body).await?;

        Ok(CompletionResponse {
            text,
            finish_reason,
            usage,
            generation_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
