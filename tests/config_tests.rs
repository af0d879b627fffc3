//! Configuration system tests
//!
//! Loading, validation, and environment overrides. Environment behavior is
//! checked through the binary so each case gets its own process.

mod common;

use std::fs;
use std::path::PathBuf;

use avatar_survey::config::{BackendKind, SurveyConfig};
use avatar_survey::survey::DemographicAttribute;
use avatar_survey::Error;
use predicates::prelude::*;
use tempfile::TempDir;

use common::valid_config_fixture;

struct ConfigFixture {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new(content: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, content).unwrap();
        Self {
            _temp_dir: temp_dir,
            config_path,
        }
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    fn load(&self) -> avatar_survey::Result<SurveyConfig> {
        SurveyConfig::load(Some(self.path()))
    }
}

fn show_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("avatar-survey").unwrap();
    for key in ["OPENAI_API_KEY", "SURVEY_API_KEY", "SURVEY_BACKEND", "SURVEY_MOCK_MODE"] {
        cmd.env_remove(key);
    }
    cmd.args(["config", "show", "--config"])
        .arg(valid_config_fixture());
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_empty_file_uses_defaults() {
    let fixture = ConfigFixture::new("");
    let config = fixture.load().unwrap();

    assert_eq!(config.survey.rating_min, 1);
    assert_eq!(config.survey.rating_max, 10);
    assert_eq!(config.survey.high_threshold, 7);
    assert_eq!(config.survey.low_threshold, 4);
    assert!(config.survey.concurrency_limit >= 1);
    assert_eq!(config.personas.min_age, 18);
    assert_eq!(config.personas.max_age, 75);
}

#[test]
fn test_fixture_values() {
    let config = SurveyConfig::load(valid_config_fixture().to_str()).unwrap();

    assert_eq!(config.survey.high_threshold, 8);
    assert_eq!(config.survey.low_threshold, 3);
    assert_eq!(config.survey.concurrency_limit, 2);
    assert_eq!(config.survey.breakdown, Some(DemographicAttribute::IncomeLevel));
    assert_eq!(config.backend.kind, BackendKind::Mock);
    assert_eq!(config.personas.default_count, 6);

    let aggregation = config.aggregation();
    assert_eq!(aggregation.high_threshold, 8);
    assert_eq!(aggregation.low_threshold, 3);
    assert_eq!(config.age_bounds().min, 21);
}

#[test]
fn test_custom_scale() {
    let fixture = ConfigFixture::new(
        r#"
[survey]
rating_min = 0
rating_max = 5
high_threshold = 4
low_threshold = 1
"#,
    );
    let config = fixture.load().unwrap();
    let scale = config.rating_scale();
    assert_eq!((scale.min, scale.max), (0, 5));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_threshold_outside_scale() {
    let fixture = ConfigFixture::new(
        r#"
[survey]
high_threshold = 11
"#,
    );
    let err = fixture.load().unwrap_err();
    assert!(matches!(err, Error::ConfigValidation { .. }));
    assert_eq!(err.exit_code(), 10);
}

#[test]
fn test_zero_concurrency() {
    let fixture = ConfigFixture::new(
        r#"
[survey]
concurrency_limit = 0
"#,
    );
    assert!(matches!(
        fixture.load(),
        Err(Error::ConfigValidation { .. })
    ));
}

#[test]
fn test_inverted_ages() {
    let fixture = ConfigFixture::new(
        r#"
[personas]
min_age = 70
max_age = 30
"#,
    );
    assert!(fixture.load().is_err());
}

#[test]
fn test_bad_log_level() {
    let fixture = ConfigFixture::new(
        r#"
[logging]
level = "shout"
"#,
    );
    assert!(fixture.load().is_err());
}

#[test]
fn test_non_finite_fallback_weights() {
    for body in [
        "jitter = inf",
        "tech_weight = nan",
        "interest_weight = -nan",
        "affinity_weight = -inf",
    ] {
        let fixture = ConfigFixture::new(&format!("[evaluator]\n{}\n", body));
        let err = fixture.load().unwrap_err();
        assert!(
            matches!(err, Error::ConfigValidation { .. }),
            "{} was accepted",
            body
        );
    }
}

#[test]
fn test_jitter_wider_than_scale() {
    let fixture = ConfigFixture::new(
        r#"
[survey]
rating_min = 1
rating_max = 5
high_threshold = 4
low_threshold = 2

[evaluator]
jitter = 4.5
"#,
    );
    assert!(matches!(
        fixture.load(),
        Err(Error::ConfigValidation { .. })
    ));

    let fixture = ConfigFixture::new("[evaluator]\njitter = 9.0\n");
    assert_eq!(fixture.load().unwrap().evaluator.jitter, 9.0);
}

#[test]
fn test_syntax_error() {
    let fixture = ConfigFixture::new("[survey\nseed = ");
    let err = fixture.load().unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
}

#[test]
fn test_unknown_backend_kind() {
    let fixture = ConfigFixture::new(
        r#"
[backend]
kind = "carrier-pigeon"
"#,
    );
    assert!(fixture.load().is_err());
}

#[test]
fn test_missing_explicit_file() {
    let err = SurveyConfig::load(Some("/nonexistent/avatar-survey.toml")).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound { .. }));
}

// ─────────────────────────────────────────────────────────────────
// Environment Overrides
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    show_cmd()
        .env("SURVEY_CONCURRENCY", "9")
        .env("SURVEY_SEED", "31337")
        .assert()
        .success()
        .stdout(predicate::str::contains("concurrency_limit = 9"))
        .stdout(predicate::str::contains("seed = 31337"));
}

#[test]
fn test_env_backend_override() {
    show_cmd()
        .env("SURVEY_BACKEND", "openai")
        .assert()
        .success()
        .stdout(predicate::str::contains("kind = \"openai\""));
}

#[test]
fn test_env_invalid_threshold_is_rejected() {
    show_cmd()
        .env("SURVEY_LOW_THRESHOLD", "9")
        .assert()
        .code(10);
}
