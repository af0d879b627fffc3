//! Survey runner: evaluates every (content item × persona) pair with bounded
//! concurrency and aggregates the results.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use super::summary::{aggregate, AggregationSettings, SurveySummary};
use crate::config::SurveyConfig;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::persona::PersonaRecord;
use crate::types::{validate_content_items, ContentItem, EvaluationResult};

// ─────────────────────────────────────────────────────────────────
// Cancellation
// ─────────────────────────────────────────────────────────────────

/// Cooperative cancellation for a running survey.
///
/// Pairs not yet dispatched are skipped; pairs already in flight finish.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close here
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Survey Run
// ─────────────────────────────────────────────────────────────────

/// Outcome of one completed comparison
#[derive(Debug, Clone)]
pub struct SurveyRun {
    /// Content-major, persona-minor, in input order
    pub results: Vec<EvaluationResult>,
    pub summary: SurveySummary,
    /// Pairs that fell back because the live service failed or timed out
    pub upstream_failures: usize,
}

impl SurveyRun {
    /// True when some ratings came from the fallback scorer because the
    /// service was unavailable.
    pub fn is_degraded(&self) -> bool {
        self.upstream_failures > 0
    }
}

// ─────────────────────────────────────────────────────────────────
// Survey Runner
// ─────────────────────────────────────────────────────────────────

/// Drives all evaluations of a survey.
pub struct SurveyRunner {
    evaluator: Arc<Evaluator>,
    concurrency_limit: usize,
    aggregation: AggregationSettings,
    cancel: CancelHandle,
}

impl SurveyRunner {
    pub fn new(evaluator: Arc<Evaluator>, concurrency_limit: usize) -> Self {
        Self {
            evaluator,
            concurrency_limit: concurrency_limit.max(1),
            aggregation: AggregationSettings::default(),
            cancel: CancelHandle::new(),
        }
    }

    /// Runner wired from configuration
    pub fn from_config(config: &SurveyConfig, evaluator: Arc<Evaluator>) -> Self {
        Self::new(evaluator, config.survey.concurrency_limit).with_aggregation(config.aggregation())
    }

    pub fn with_aggregation(mut self, aggregation: AggregationSettings) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Handle that cancels runs started by this runner.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Evaluate every content item with every persona.
    ///
    /// Inputs are validated before anything is dispatched. Per-pair failures
    /// never abort the run; they surface as fallback results. A cancelled run
    /// is abandoned before aggregation.
    pub async fn run_comparison(
        &self,
        content_items: &[ContentItem],
        personas: &[PersonaRecord],
        context: Option<&str>,
    ) -> Result<SurveyRun> {
        validate_inputs(content_items, personas)?;

        let total = content_items.len() * personas.len();
        info!(
            items = content_items.len(),
            personas = personas.len(),
            pairs = total,
            concurrency = self.concurrency_limit,
            backend = self.evaluator.backend_name(),
            mock_mode = self.evaluator.options().mock_mode,
            "Starting survey run"
        );

        let items: Arc<[ContentItem]> = content_items.into();
        let people: Arc<[PersonaRecord]> = personas.into();
        let context: Option<Arc<str>> = context.map(Arc::from);
        let sem = Arc::new(Semaphore::new(self.concurrency_limit));

        let mut tasks = Vec::with_capacity(total);
        let mut cancelled = false;

        'dispatch: for ci in 0..items.len() {
            for pi in 0..people.len() {
                let permit = Arc::clone(&sem)
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Internal(format!("semaphore closed: {}", e)))?;

                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break 'dispatch;
                }

                let index = ci * people.len() + pi;
                let evaluator = Arc::clone(&self.evaluator);
                let items = Arc::clone(&items);
                let people = Arc::clone(&people);
                let context = context.clone();

                tasks.push(tokio::spawn(async move {
                    let _permit = permit;
                    let result = evaluator
                        .evaluate(&people[pi], &items[ci], context.as_deref())
                        .await;
                    (index, result)
                }));
            }
        }

        let mut slots: Vec<Option<EvaluationResult>> = vec![None; total];
        let mut completed = 0;
        for task in tasks {
            let (index, result) = task
                .await
                .map_err(|e| Error::Internal(format!("evaluation task failed: {}", e)))?;
            slots[index] = Some(result);
            completed += 1;
            debug!(completed, total, "Pair evaluated");
        }

        if cancelled {
            warn!(completed, total, "Survey run cancelled");
            return Err(Error::RunCancelled { completed, total });
        }

        let results: Vec<EvaluationResult> = slots.into_iter().flatten().collect();
        if results.len() != total {
            return Err(Error::Internal(format!(
                "expected {} results, collected {}",
                total,
                results.len()
            )));
        }

        let upstream_failures = results
            .iter()
            .filter(|r| r.fallback_reason.map_or(false, |f| f.is_upstream_failure()))
            .count();

        let summary = aggregate(content_items, personas, &results, &self.aggregation);

        if upstream_failures > 0 {
            warn!(
                upstream_failures,
                total, "Some ratings fell back because the completion service was unavailable"
            );
        }
        info!(
            rated = summary.rated_count,
            fallback = summary.fallback_count,
            winner = summary.winner.as_ref().map(|w| w.content_id.as_str()).unwrap_or("-"),
            "Survey run complete"
        );

        Ok(SurveyRun {
            results,
            summary,
            upstream_failures,
        })
    }
}

/// Reject inputs that would make the run meaningless.
fn validate_inputs(content_items: &[ContentItem], personas: &[PersonaRecord]) -> Result<()> {
    validate_content_items(content_items)?;

    if personas.is_empty() {
        return Err(Error::EmptyPersonas);
    }
    let mut seen = std::collections::HashSet::new();
    for persona in personas {
        if !seen.insert(persona.id.as_str()) {
            return Err(Error::DuplicatePersonaId {
                id: persona.id.clone(),
            });
        }
    }
    Ok(())
}
