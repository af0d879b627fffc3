//! Per-pair evaluation outcome.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal state of one (persona, content) evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationState {
    /// Rating parsed from the completion service's answer
    Rated,
    /// Rating produced by the fallback scorer
    Fallback,
}

/// Why an evaluation ended in FALLBACK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// External calls disabled by configuration
    MockMode,
    /// Backend returned an error
    Unavailable,
    /// Backend exceeded the per-call timeout
    Timeout,
    /// Backend answered without a recognizable rating
    Unparsed,
}

impl FallbackReason {
    /// True when the live service failed (as opposed to being disabled or vague).
    pub fn is_upstream_failure(&self) -> bool {
        matches!(self, FallbackReason::Unavailable | FallbackReason::Timeout)
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FallbackReason::MockMode => "mock_mode",
            FallbackReason::Unavailable => "unavailable",
            FallbackReason::Timeout => "timeout",
            FallbackReason::Unparsed => "unparsed",
        };
        write!(f, "{}", s)
    }
}

/// Rating one persona gave one content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub persona_id: String,
    pub content_id: String,

    /// Always within the configured rating scale
    pub rating: u8,

    /// Free-text answer from the completion service, when there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    pub state: EvaluationState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl EvaluationResult {
    pub fn rated(
        persona_id: impl Into<String>,
        content_id: impl Into<String>,
        rating: u8,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            persona_id: persona_id.into(),
            content_id: content_id.into(),
            rating,
            rationale: Some(rationale.into()),
            state: EvaluationState::Rated,
            fallback_reason: None,
        }
    }

    pub fn fallback(
        persona_id: impl Into<String>,
        content_id: impl Into<String>,
        rating: u8,
        reason: FallbackReason,
    ) -> Self {
        Self {
            persona_id: persona_id.into(),
            content_id: content_id.into(),
            rating,
            rationale: None,
            state: EvaluationState::Fallback,
            fallback_reason: Some(reason),
        }
    }

    /// Keep the unusable answer for inspection.
    pub fn with_rationale(mut self, text: impl Into<String>) -> Self {
        self.rationale = Some(text.into());
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.state == EvaluationState::Fallback
    }
}
