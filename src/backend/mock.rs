//! Mock backend
//!
//! Deterministic stand-in for the completion service. Used when no API key
//! is configured and throughout the test suite.

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::rating::RatingScale;
use crate::types::{CompletionRequest, CompletionResponse, FinishReason, TokenUsage};

use super::{BackendCapabilities, BackendHealth, CompletionBackend};

// ─────────────────────────────────────────────────────────────────
// Mock Backend Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for mock backend behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Simulated latency per completion (ms)
    pub latency_ms: u64,

    /// Fail every completion with an upstream error
    pub fail_completion: bool,

    /// Fixed response text (for deterministic testing)
    pub fixed_response: Option<String>,

    /// Scale used for generated ratings
    pub scale: RatingScale,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            fail_completion: false,
            fixed_response: None,
            scale: RatingScale::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────

/// Mock implementation of CompletionBackend
pub struct MockBackend {
    config: MockConfig,
    call_counts: RwLock<CallCounts>,
}

/// Track method call counts for verification
#[derive(Debug, Default)]
struct CallCounts {
    complete: u32,
    health_check: u32,
}

impl MockBackend {
    /// Create a new mock backend with default configuration
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a new mock backend with custom configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            call_counts: RwLock::new(CallCounts::default()),
        }
    }

    /// Get the number of times a method was called
    pub fn call_count(&self, method: &str) -> u32 {
        let counts = self.call_counts.read();
        match method {
            "complete" => counts.complete,
            "health_check" => counts.health_check,
            _ => 0,
        }
    }

    /// Rating derived from the prompt hash, so the same prompt always gets
    /// the same answer.
    fn generate_response(&self, request: &CompletionRequest) -> String {
        if let Some(ref fixed) = self.config.fixed_response {
            return fixed.clone();
        }

        let hash = Sha256::digest(request.prompt.as_bytes());
        let scale = self.config.scale;
        let span = u16::from(scale.max.saturating_sub(scale.min)) + 1;
        let rating = u16::from(scale.min) + u16::from(hash[0]) % span;

        format!(
            "Speaking as this persona, the offer is clear and I can see what it does. \
             Price and relevance decide whether I would click.\n\nRating: {}/{}",
            rating, scale.max
        )
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "mock",
            model: "mock".to_string(),
            supports_system_prompt: true,
            remote: false,
        }
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        self.call_counts.write().health_check += 1;
        Ok(BackendHealth {
            operational: !self.config.fail_completion,
            latency_ms: Some(0),
            error: self
                .config
                .fail_completion
                .then(|| "Mock configured to fail".to_string()),
        })
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.call_counts.write().complete += 1;
        let start = Instant::now();

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.config.fail_completion {
            return Err(Error::upstream_unavailable("mock", "Mock completion failure"));
        }

        let text = self.generate_response(&request);
        let completion_tokens = (text.split_whitespace().count() * 4 / 3) as u32;
        let prompt_tokens = (request.prompt.split_whitespace().count() * 4 / 3) as u32;

        Ok(CompletionResponse {
            text,
            finish_reason: FinishReason::Stop,
            usage: TokenUsage::new(prompt_tokens, completion_tokens),
            generation_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::{RatingExtractor, RatingParse};
    use crate::types::GenerationParams;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest::new(prompt, GenerationParams::default())
    }

    #[tokio::test]
    async fn test_mock_completion_is_deterministic_and_parseable() {
        let backend = MockBackend::new();
        let a = backend.complete(request("persona A sees ad X")).await.unwrap();
        let b = backend.complete(request("persona A sees ad X")).await.unwrap();
        assert_eq!(a.text, b.text);
        assert_eq!(a.finish_reason, FinishReason::Stop);
        assert!(a.usage.total_tokens > 0);

        let extractor = RatingExtractor::new(RatingScale::default()).unwrap();
        assert!(matches!(
            extractor.extract(&a.text),
            RatingParse::Parsed { clamped: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_fixed_response() {
        let backend = MockBackend::with_config(MockConfig {
            fixed_response: Some("no idea".into()),
            ..Default::default()
        });
        let out = backend.complete(request("anything")).await.unwrap();
        assert_eq!(out.text, "no idea");
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let backend = MockBackend::with_config(MockConfig {
            fail_completion: true,
            ..Default::default()
        });
        let err = backend.complete(request("Test")).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable { .. }));
        assert!(!backend.health_check().await.unwrap().operational);
    }

    #[tokio::test]
    async fn test_call_counting() {
        let backend = MockBackend::new();
        for _ in 0..3 {
            let _ = backend.complete(request("Test")).await;
        }
        assert_eq!(backend.call_count("complete"), 3);
        assert_eq!(backend.call_count("health_check"), 0);

        backend.health_check().await.unwrap();
        assert_eq!(backend.call_count("health_check"), 1);
    }

    #[test]
    fn test_capabilities() {
        let backend = MockBackend::new();
        let caps = backend.capabilities();
        assert_eq!(caps.name, "mock");
        assert!(!caps.remote);
    }
}
