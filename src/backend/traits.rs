//! Backend trait definitions
//!
//! Defines the CompletionBackend trait that every text-completion service
//! adapter implements.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{CompletionRequest, CompletionResponse};

// ─────────────────────────────────────────────────────────────────
// Backend Health & Capabilities
// ─────────────────────────────────────────────────────────────────

/// Health status of a backend
#[derive(Debug, Clone)]
pub struct BackendHealth {
    /// Whether the backend is operational
    pub operational: bool,

    /// Round-trip time of the health check
    pub latency_ms: Option<u64>,

    /// Any error message
    pub error: Option<String>,
}

impl Default for BackendHealth {
    fn default() -> Self {
        Self {
            operational: true,
            latency_ms: None,
            error: None,
        }
    }
}

/// Capabilities of a backend
#[derive(Debug, Clone)]
pub struct BackendCapabilities {
    /// Name of the backend
    pub name: &'static str,

    /// Model requests are sent to
    pub model: String,

    /// Whether a system prompt is honoured
    pub supports_system_prompt: bool,

    /// Whether calls leave the process
    pub remote: bool,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            name: "unknown",
            model: String::new(),
            supports_system_prompt: true,
            remote: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// CompletionBackend Trait
// ─────────────────────────────────────────────────────────────────

/// Capability interface for an external text-completion service.
///
/// Implementations must be safe to call from many tasks at once; the survey
/// runner shares one instance across all in-flight evaluations.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Get the backend name (e.g., "openai", "mock")
    fn name(&self) -> &'static str;

    /// Get the backend capabilities
    fn capabilities(&self) -> BackendCapabilities;

    /// Check whether the service is reachable
    async fn health_check(&self) -> Result<BackendHealth>;

    /// Send one prompt and return the free-text answer
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Type alias for a shared backend reference
pub type SharedBackend = Arc<dyn CompletionBackend>;
