//! End-to-end survey tests against the library API
//!
//! Persona generation, evaluation through mock and unreachable backends,
//! aggregation, and report export.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use avatar_survey::backend::{MockBackend, MockConfig, OpenAiBackend, OpenAiConfig, SharedBackend};
use avatar_survey::evaluator::{Evaluator, EvaluatorOptions};
use avatar_survey::persona::PersonaRecord;
use avatar_survey::rating::RatingScale;
use avatar_survey::survey::{
    AggregationSettings, DemographicAttribute, RunInfo, SurveyReport, SurveyRun, SurveyRunner,
};
use avatar_survey::types::{ContentItem, EvaluationState, FallbackReason};
use avatar_survey::Error;
use tempfile::TempDir;

use common::{sample_items, sample_personas};

fn runner(backend: SharedBackend, options: EvaluatorOptions, limit: usize) -> SurveyRunner {
    let evaluator = Evaluator::new(backend, RatingScale::default(), options).unwrap();
    SurveyRunner::new(Arc::new(evaluator), limit)
}

fn mock_options() -> EvaluatorOptions {
    EvaluatorOptions {
        mock_mode: true,
        seed: 99,
        ..Default::default()
    }
}

fn ratings_by_pair(run: &SurveyRun) -> HashMap<(String, String), u8> {
    run.results
        .iter()
        .map(|r| ((r.persona_id.clone(), r.content_id.clone()), r.rating))
        .collect()
}

// ─────────────────────────────────────────────────────────────────
// Mock Mode
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mock_mode_rates_every_pair() {
    let backend = Arc::new(MockBackend::new());
    let items = sample_items();
    let personas = sample_personas(5);

    let run = runner(backend.clone(), mock_options(), 4)
        .run_comparison(&items, &personas, Some("Fitness launch"))
        .await
        .unwrap();

    assert_eq!(run.results.len(), 15);
    assert_eq!(backend.call_count("complete"), 0);
    assert!(!run.is_degraded());
    assert_eq!(run.summary.total_responses, 15);
    assert_eq!(run.summary.fallback_count, 15);
    assert_eq!(run.summary.rated_count, 0);

    // Content-major, persona-minor, in input order
    for (i, result) in run.results.iter().enumerate() {
        assert_eq!(result.content_id, items[i / 5].id);
        assert_eq!(result.persona_id, personas[i % 5].id);
        assert_eq!(result.fallback_reason, Some(FallbackReason::MockMode));
        assert!((1..=10).contains(&result.rating));
    }

    for stats in &run.summary.content {
        assert_eq!(stats.total_responses, 5);
        assert!(stats.mean >= 1.0 && stats.mean <= 10.0);
    }
    assert!(run.summary.winner.is_some());
}

#[tokio::test]
async fn test_same_seed_same_ratings() {
    let items = sample_items();
    let personas = sample_personas(4);

    let first = runner(Arc::new(MockBackend::new()), mock_options(), 1)
        .run_comparison(&items, &personas, None)
        .await
        .unwrap();
    let second = runner(Arc::new(MockBackend::new()), mock_options(), 8)
        .run_comparison(&items, &personas, None)
        .await
        .unwrap();

    assert_eq!(first.results, second.results);
    assert_eq!(first.summary, second.summary);
}

#[tokio::test]
async fn test_shuffled_personas_keep_pair_ratings() {
    let items = sample_items();
    let personas = sample_personas(6);
    let mut reversed: Vec<PersonaRecord> = personas.clone();
    reversed.reverse();

    let forward = runner(Arc::new(MockBackend::new()), mock_options(), 3)
        .run_comparison(&items, &personas, None)
        .await
        .unwrap();
    let backward = runner(Arc::new(MockBackend::new()), mock_options(), 3)
        .run_comparison(&items, &reversed, None)
        .await
        .unwrap();

    assert_eq!(ratings_by_pair(&forward), ratings_by_pair(&backward));
    for (a, b) in forward.summary.content.iter().zip(&backward.summary.content) {
        assert_eq!(a.content_id, b.content_id);
        assert!((a.mean - b.mean).abs() < 1e-9);
    }
}

// ─────────────────────────────────────────────────────────────────
// Live Backend Paths
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mock_backend_answers_are_rated() {
    let backend = Arc::new(MockBackend::new());
    let items = sample_items();
    let personas = sample_personas(3);

    let run = runner(backend.clone(), EvaluatorOptions::default(), 2)
        .run_comparison(&items, &personas, None)
        .await
        .unwrap();

    assert_eq!(backend.call_count("complete"), 9);
    assert!(run.results.iter().all(|r| r.state == EvaluationState::Rated));
    assert!(run.results.iter().all(|r| r.rationale.is_some()));
    assert_eq!(run.summary.rated_count, 9);
    assert!(!run.is_degraded());
}

#[tokio::test]
async fn test_equal_means_pick_first_item() {
    let backend = Arc::new(MockBackend::with_config(MockConfig {
        fixed_response: Some("Solid offer.\nRating: 6/10".into()),
        ..Default::default()
    }));
    let items = sample_items();

    let run = runner(backend, EvaluatorOptions::default(), 4)
        .run_comparison(&items, &sample_personas(4), None)
        .await
        .unwrap();

    let winner = run.summary.winner.unwrap();
    assert_eq!(winner.content_id, "Ad_A");
    assert!((winner.mean - 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_engagement_thresholds() {
    let backend = Arc::new(MockBackend::with_config(MockConfig {
        fixed_response: Some("Rating: 7/10".into()),
        ..Default::default()
    }));
    let items = sample_items();

    let run = runner(backend, EvaluatorOptions::default(), 4)
        .with_aggregation(AggregationSettings {
            high_threshold: 7,
            low_threshold: 4,
            breakdown: Some(DemographicAttribute::IncomeLevel),
        })
        .run_comparison(&items, &sample_personas(5), None)
        .await
        .unwrap();

    for stats in &run.summary.content {
        assert_eq!(stats.high_engagement, 5);
        assert_eq!(stats.low_engagement, 0);
        assert_eq!(stats.min, 7);
        assert_eq!(stats.max, 7);
    }

    let breakdown = run.summary.breakdown.unwrap();
    assert_eq!(breakdown.attribute, DemographicAttribute::IncomeLevel);
    let responses: usize = breakdown.groups.iter().map(|g| g.responses).sum();
    assert_eq!(responses, 15);
}

#[tokio::test]
async fn test_unreachable_service_degrades_but_completes() {
    let backend = OpenAiBackend::new(OpenAiConfig {
        base_url: "http://127.0.0.1:9/v1".to_string(),
        api_key: "sk-test".to_string(),
        timeout_secs: 2,
        max_retries: 0,
        ..Default::default()
    })
    .unwrap();
    let items = sample_items();
    let personas = sample_personas(2);

    let run = runner(
        Arc::new(backend),
        EvaluatorOptions {
            call_timeout: Duration::from_secs(5),
            seed: 3,
            ..Default::default()
        },
        4,
    )
    .run_comparison(&items, &personas, None)
    .await
    .unwrap();

    assert_eq!(run.results.len(), 6);
    assert_eq!(run.upstream_failures, 6);
    assert!(run.is_degraded());
    for result in &run.results {
        assert_eq!(result.state, EvaluationState::Fallback);
        assert!(matches!(
            result.fallback_reason,
            Some(FallbackReason::Unavailable) | Some(FallbackReason::Timeout)
        ));
        assert!((1..=10).contains(&result.rating));
    }
}

#[tokio::test]
async fn test_slow_service_times_out_per_pair() {
    let backend = Arc::new(MockBackend::with_config(MockConfig {
        latency_ms: 1_000,
        ..Default::default()
    }));

    let run = runner(
        backend,
        EvaluatorOptions {
            call_timeout: Duration::from_millis(25),
            ..Default::default()
        },
        8,
    )
    .run_comparison(&sample_items(), &sample_personas(2), None)
    .await
    .unwrap();

    assert!(run
        .results
        .iter()
        .all(|r| r.fallback_reason == Some(FallbackReason::Timeout)));
    assert_eq!(run.upstream_failures, 6);
}

// ─────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_inputs_dispatch_nothing() {
    let backend = Arc::new(MockBackend::new());
    let survey = runner(backend.clone(), EvaluatorOptions::default(), 2);
    let personas = sample_personas(2);

    let mut duplicated = sample_items();
    duplicated.push(ContentItem::new("Ad_A", "Again", "Same id"));
    let err = survey
        .run_comparison(&duplicated, &personas, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateContentId { .. }));
    assert!(err.is_validation());

    let err = survey
        .run_comparison(&sample_items(), &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyPersonas));

    let twins = vec![personas[0].clone(), personas[0].clone()];
    let err = survey
        .run_comparison(&sample_items(), &twins, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicatePersonaId { .. }));

    assert_eq!(backend.call_count("complete"), 0);
}

// ─────────────────────────────────────────────────────────────────
// Export
// ─────────────────────────────────────────────────────────────────

async fn finished_report() -> SurveyReport {
    let items = sample_items();
    let personas = sample_personas(3);
    let run = runner(Arc::new(MockBackend::new()), mock_options(), 2)
        .with_aggregation(AggregationSettings {
            breakdown: Some(DemographicAttribute::AgeBracket),
            ..Default::default()
        })
        .run_comparison(&items, &personas, None)
        .await
        .unwrap();

    SurveyReport::new(
        run,
        items,
        personas,
        RunInfo {
            seed: 99,
            backend: "mock".into(),
            mock_mode: true,
            context: None,
        },
    )
}

#[tokio::test]
async fn test_report_round_trip_reaggregates() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("reports").join("run.json");
    let report = finished_report().await;

    report.export(&path).unwrap();
    let loaded = SurveyReport::load(&path).unwrap();

    assert_eq!(loaded, report);
    assert_eq!(loaded.reaggregate(&loaded.summary.settings()), report.summary);
    assert_eq!(loaded.results.len(), 9);
}

#[tokio::test]
async fn test_failed_export_can_be_retried() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("occupied");
    std::fs::write(&blocker, "not a directory").unwrap();
    let report = finished_report().await;

    let err = report.export(&blocker.join("run.json")).unwrap_err();
    assert!(matches!(err, Error::ExportFailed { .. }));

    // The report is still in memory; a second destination works
    let retry = tmp.path().join("run.json");
    report.export(&retry).unwrap();
    assert_eq!(SurveyReport::load(&retry).unwrap(), report);
}
