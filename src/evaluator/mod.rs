//! Per-pair evaluation.
//!
//! Each (persona, content item) pair moves through
//! PROMPT_BUILT → EXTERNAL_CALL_ATTEMPTED → {RATED | FALLBACK}.
//! With mock mode on, the external call is skipped and the pair goes
//! straight to FALLBACK. `evaluate` never fails: every upstream problem
//! becomes a fallback rating with its reason recorded.

mod scoring;

pub use scoring::{pair_rng, DefaultFallbackScorer, FallbackScorer, FallbackWeights};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::backend::{BackendHealth, SharedBackend};
use crate::config::SurveyConfig;
use crate::error::{Error, Result};
use crate::persona::PersonaRecord;
use crate::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::rating::{RatingExtractor, RatingParse, RatingScale};
use crate::types::{
    CompletionRequest, ContentItem, EvaluationResult, FallbackReason, GenerationParams,
};

/// Knobs for one evaluator
#[derive(Debug, Clone)]
pub struct EvaluatorOptions {
    /// Skip the backend and always use the fallback scorer
    pub mock_mode: bool,
    /// Timeout for a single completion call
    pub call_timeout: Duration,
    pub params: GenerationParams,
    /// Run seed mixed into every per-pair fallback RNG
    pub seed: u64,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            mock_mode: false,
            call_timeout: Duration::from_secs(30),
            params: GenerationParams::default(),
            seed: 0,
        }
    }
}

/// Evaluates one pair at a time; shared read-only across runner tasks.
pub struct Evaluator {
    backend: SharedBackend,
    prompts: PromptBuilder,
    extractor: RatingExtractor,
    scorer: Arc<dyn FallbackScorer>,
    options: EvaluatorOptions,
}

impl Evaluator {
    /// Evaluator with the default fallback scorer
    pub fn new(backend: SharedBackend, scale: RatingScale, options: EvaluatorOptions) -> Result<Self> {
        Ok(Self {
            backend,
            prompts: PromptBuilder::new(scale),
            extractor: RatingExtractor::new(scale)?,
            scorer: Arc::new(DefaultFallbackScorer::default()),
            options,
        })
    }

    /// Evaluator wired from configuration. `seed` is the resolved run seed.
    pub fn from_config(config: &SurveyConfig, backend: SharedBackend, seed: u64) -> Result<Self> {
        let options = EvaluatorOptions {
            mock_mode: config.survey.mock_mode,
            call_timeout: config.call_timeout(),
            params: GenerationParams {
                max_tokens: config.evaluator.max_tokens,
                temperature: config.evaluator.temperature,
            },
            seed,
        };

        Ok(Self::new(backend, config.rating_scale(), options)?
            .with_scorer(Arc::new(DefaultFallbackScorer::new(config.fallback_weights()))))
    }

    /// Replace the fallback scorer
    pub fn with_scorer(mut self, scorer: Arc<dyn FallbackScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn scale(&self) -> RatingScale {
        self.extractor.scale()
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Rate one pair. Total: always returns a result within the scale.
    pub async fn evaluate(
        &self,
        persona: &PersonaRecord,
        content: &ContentItem,
        context: Option<&str>,
    ) -> EvaluationResult {
        if self.options.mock_mode {
            trace!(persona = %persona.id, content = %content.id, "Mock mode, skipping backend");
            return self.fallback(persona, content, FallbackReason::MockMode);
        }

        let prompt = self.prompts.build(persona, content, context);
        trace!(persona = %persona.id, content = %content.id, "Prompt built");

        let request = CompletionRequest::new(prompt, self.options.params.clone())
            .with_system_prompt(SYSTEM_PROMPT);

        let timeout_ms = self.options.call_timeout.as_millis() as u64;
        let outcome = tokio::time::timeout(self.options.call_timeout, self.backend.complete(request))
            .await
            .unwrap_or_else(|_| {
                Err(Error::UpstreamTimeout {
                    backend: self.backend.name().to_string(),
                    timeout_ms,
                })
            });

        match outcome {
            Ok(response) => match self.extractor.extract(&response.text) {
                RatingParse::Parsed { rating, clamped } => {
                    debug!(
                        persona = %persona.id,
                        content = %content.id,
                        rating,
                        clamped,
                        tokens = response.usage.total_tokens,
                        "Rated"
                    );
                    EvaluationResult::rated(&persona.id, &content.id, rating, response.text)
                }
                RatingParse::Unparsed => {
                    debug!(persona = %persona.id, content = %content.id, "No rating in answer");
                    self.fallback(persona, content, FallbackReason::Unparsed)
                        .with_rationale(response.text)
                }
            },
            Err(e) => {
                let reason = match e {
                    Error::UpstreamTimeout { .. } => FallbackReason::Timeout,
                    _ => FallbackReason::Unavailable,
                };
                warn!(
                    persona = %persona.id,
                    content = %content.id,
                    error = %e.format_for_log(),
                    retryable = e.is_retryable(),
                    ?reason,
                    "Completion failed, using fallback rating"
                );
                self.fallback(persona, content, reason)
            }
        }
    }

    /// Ask the backend whether it is reachable before a run.
    ///
    /// Returns `None` in mock mode, where the backend is never called. A
    /// failed or slow health check is reported as a non-operational backend.
    pub async fn check_backend(&self) -> Option<BackendHealth> {
        if self.options.mock_mode {
            return None;
        }

        let caps = self.backend.capabilities();
        info!(
            backend = caps.name,
            model = %caps.model,
            remote = caps.remote,
            "Checking completion backend"
        );

        let health = match tokio::time::timeout(self.options.call_timeout, self.backend.health_check()).await {
            Ok(Ok(health)) => health,
            Ok(Err(e)) => BackendHealth {
                operational: false,
                latency_ms: None,
                error: Some(e.to_string()),
            },
            Err(_) => BackendHealth {
                operational: false,
                latency_ms: None,
                error: Some(format!(
                    "health check timed out after {}ms",
                    self.options.call_timeout.as_millis()
                )),
            },
        };

        if health.operational {
            info!(latency_ms = ?health.latency_ms, "Completion backend is reachable");
        } else {
            warn!(
                backend = caps.name,
                error = health.error.as_deref().unwrap_or("unknown"),
                "Completion backend failed its health check, pairs will likely use fallback ratings"
            );
        }
        Some(health)
    }

    /// Fallback rating for a pair; the same pair always gets the same value.
    pub fn fallback_rating(&self, persona: &PersonaRecord, content: &ContentItem) -> u8 {
        let mut rng = pair_rng(self.options.seed, &persona.id, &content.id);
        let rating = self.scorer.score(persona, content, self.scale(), &mut rng);
        // A custom scorer may ignore the scale
        self.scale().clamp_round(f64::from(rating)).0
    }

    fn fallback(
        &self,
        persona: &PersonaRecord,
        content: &ContentItem,
        reason: FallbackReason,
    ) -> EvaluationResult {
        let rating = self.fallback_rating(persona, content);
        EvaluationResult::fallback(&persona.id, &content.id, rating, reason)
    }
}
