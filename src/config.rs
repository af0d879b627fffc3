//! Configuration system for avatar-survey
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (SURVEY_* prefix, plus OPENAI_API_KEY)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::OpenAiConfig;
use crate::error::{Error, Result};
use crate::evaluator::FallbackWeights;
use crate::persona::AgeRange;
use crate::rating::RatingScale;
use crate::survey::{AggregationSettings, DemographicAttribute};

/// Main survey configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Rating scale, thresholds and run behaviour
    pub survey: SurveySettings,

    /// Per-pair evaluation settings
    pub evaluator: EvaluatorSettings,

    /// Completion backend selection
    pub backend: BackendSettings,

    /// Persona generation bounds
    pub personas: PersonaSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// Output locations
    pub storage: StorageSettings,
}

/// Survey-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveySettings {
    /// Lowest rating on the scale
    pub rating_min: u8,

    /// Highest rating on the scale
    pub rating_max: u8,

    /// Ratings at or above this count as high engagement
    pub high_threshold: u8,

    /// Ratings at or below this count as low engagement
    pub low_threshold: u8,

    /// Maximum number of evaluations in flight
    pub concurrency_limit: usize,

    /// Skip the completion backend and use fallback ratings only
    pub mock_mode: bool,

    /// Seed for persona generation and fallback jitter (random if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Persona attribute to break results down by
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<DemographicAttribute>,
}

/// Evaluation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// Timeout for a single completion call in milliseconds
    pub timeout_ms: u64,

    /// Maximum tokens requested per completion
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Fallback score contribution per tech-savviness step
    pub tech_weight: f64,

    /// Fallback score contribution per interest found in the content
    pub interest_weight: f64,

    /// Fallback score contribution for income/price-tier affinity
    pub affinity_weight: f64,

    /// Maximum absolute jitter added to fallback scores
    pub jitter: f64,
}

/// Which completion backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI when an API key is configured, otherwise the mock stub
    Auto,
    /// OpenAI-compatible HTTP API
    OpenAi,
    /// Deterministic local stub
    Mock,
}

/// Completion backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Backend selection
    pub kind: BackendKind,

    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// HTTP client timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient failures
    pub max_retries: u32,
}

/// Persona generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    /// Youngest allowed persona age
    pub min_age: u8,

    /// Oldest allowed persona age
    pub max_age: u8,

    /// Number of personas generated when none is requested
    pub default_count: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// Storage path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for exported reports when --output is not given
    pub output_dir: String,
}

// Default implementations

impl Default for SurveySettings {
    fn default() -> Self {
        Self {
            rating_min: 1,
            rating_max: 10,
            high_threshold: 7,
            low_threshold: 4,
            concurrency_limit: 4,
            mock_mode: false,
            seed: None,
            breakdown: None,
        }
    }
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        let weights = FallbackWeights::default();
        Self {
            timeout_ms: 30_000,
            max_tokens: 300,
            temperature: 0.7,
            tech_weight: weights.tech,
            interest_weight: weights.interest,
            affinity_weight: weights.affinity,
            jitter: weights.jitter,
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::Auto,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl Default for PersonaSettings {
    fn default() -> Self {
        let bounds = AgeRange::default();
        Self {
            min_age: bounds.min,
            max_age: bounds.max,
            default_count: 5,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
        }
    }
}

impl SurveyConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        let search_paths = [
            Some(PathBuf::from("avatar-survey.toml")),
            dirs::config_dir().map(|p| p.join("avatar-survey").join("config.toml")),
            dirs::home_dir().map(|p| p.join(".avatar-survey").join("config.toml")),
        ];

        for path in search_paths.into_iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Survey settings
        if let Some(v) = env_bool("SURVEY_MOCK_MODE") {
            self.survey.mock_mode = v;
        }
        if let Some(n) = env_parse("SURVEY_SEED") {
            self.survey.seed = Some(n);
        }
        if let Some(n) = env_parse("SURVEY_CONCURRENCY") {
            self.survey.concurrency_limit = n;
        }
        if let Some(n) = env_parse("SURVEY_HIGH_THRESHOLD") {
            self.survey.high_threshold = n;
        }
        if let Some(n) = env_parse("SURVEY_LOW_THRESHOLD") {
            self.survey.low_threshold = n;
        }

        // Evaluator settings
        if let Some(n) = env_parse("SURVEY_TIMEOUT_MS") {
            self.evaluator.timeout_ms = n;
        }

        // Backend settings
        if let Ok(val) = std::env::var("SURVEY_BACKEND") {
            match val.to_lowercase().as_str() {
                "auto" => self.backend.kind = BackendKind::Auto,
                "openai" => self.backend.kind = BackendKind::OpenAi,
                "mock" => self.backend.kind = BackendKind::Mock,
                other => debug!(value = %other, "Ignoring unknown SURVEY_BACKEND"),
            }
        }
        if let Ok(val) = std::env::var("SURVEY_BASE_URL") {
            self.backend.base_url = val;
        }
        if let Ok(val) = std::env::var("SURVEY_MODEL") {
            self.backend.model = val;
        }
        if let Ok(val) = std::env::var("SURVEY_API_KEY") {
            self.backend.api_key = val;
        } else if self.backend.api_key.is_empty() {
            if let Ok(val) = std::env::var("OPENAI_API_KEY") {
                self.backend.api_key = val;
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("SURVEY_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("SURVEY_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(v) = env_bool("SURVEY_LOG_JSON") {
            self.logging.json_format = v;
        }

        // Storage settings
        if let Ok(val) = std::env::var("SURVEY_OUTPUT_DIR") {
            self.storage.output_dir = val;
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.storage.output_dir = expand_path(&self.storage.output_dir);
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let s = &self.survey;
        if s.rating_min >= s.rating_max {
            return Err(Error::config_field_invalid(
                "survey.rating_min",
                format!(
                    "rating_min ({}) must be below rating_max ({})",
                    s.rating_min, s.rating_max
                ),
            ));
        }
        for (field, value) in [
            ("survey.high_threshold", s.high_threshold),
            ("survey.low_threshold", s.low_threshold),
        ] {
            if value < s.rating_min || value > s.rating_max {
                return Err(Error::config_field_invalid(
                    field,
                    format!(
                        "{} must lie within the rating scale {}..={}",
                        value, s.rating_min, s.rating_max
                    ),
                ));
            }
        }
        if s.low_threshold >= s.high_threshold {
            return Err(Error::config_field_invalid(
                "survey.low_threshold",
                "low_threshold must be below high_threshold",
            ));
        }
        if s.concurrency_limit == 0 {
            return Err(Error::config_field_invalid(
                "survey.concurrency_limit",
                "concurrency_limit must be at least 1",
            ));
        }

        if self.evaluator.timeout_ms == 0 {
            return Err(Error::config_field_invalid(
                "evaluator.timeout_ms",
                "timeout_ms must be greater than zero",
            ));
        }
        let e = &self.evaluator;
        for (field, value) in [
            ("evaluator.tech_weight", e.tech_weight),
            ("evaluator.interest_weight", e.interest_weight),
            ("evaluator.affinity_weight", e.affinity_weight),
            ("evaluator.jitter", e.jitter),
        ] {
            if !value.is_finite() {
                return Err(Error::config_field_invalid(
                    field,
                    format!("{} must be a finite number", value),
                ));
            }
        }
        let width = f64::from(s.rating_max - s.rating_min);
        if e.jitter < 0.0 || e.jitter > width {
            return Err(Error::config_field_invalid(
                "evaluator.jitter",
                format!("jitter must lie within 0..={} (the rating scale width)", width),
            ));
        }

        if self.personas.min_age > self.personas.max_age {
            return Err(Error::config_field_invalid(
                "personas.min_age",
                "min_age must not exceed max_age",
            ));
        }

        if self.backend.kind == BackendKind::OpenAi && self.backend.base_url.is_empty() {
            return Err(Error::config_field_invalid(
                "backend.base_url",
                "base_url cannot be empty for the openai backend",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Derived settings
    // ─────────────────────────────────────────────────────────────

    /// Rating scale described by `[survey]`
    pub fn rating_scale(&self) -> RatingScale {
        RatingScale::new(self.survey.rating_min, self.survey.rating_max)
    }

    /// Aggregation thresholds and breakdown attribute
    pub fn aggregation(&self) -> AggregationSettings {
        AggregationSettings {
            high_threshold: self.survey.high_threshold,
            low_threshold: self.survey.low_threshold,
            breakdown: self.survey.breakdown,
        }
    }

    /// Weights for the default fallback scorer
    pub fn fallback_weights(&self) -> FallbackWeights {
        FallbackWeights {
            tech: self.evaluator.tech_weight,
            interest: self.evaluator.interest_weight,
            affinity: self.evaluator.affinity_weight,
            jitter: self.evaluator.jitter,
        }
    }

    /// Allowed persona ages
    pub fn age_bounds(&self) -> AgeRange {
        AgeRange::new(self.personas.min_age, self.personas.max_age)
    }

    /// Per-call completion timeout
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluator.timeout_ms)
    }

    /// Backend kind after resolving `auto`
    pub fn resolved_backend(&self) -> BackendKind {
        match self.backend.kind {
            BackendKind::Auto if self.backend.api_key.is_empty() => BackendKind::Mock,
            BackendKind::Auto => BackendKind::OpenAi,
            kind => kind,
        }
    }

    /// Connection settings for the OpenAI-compatible backend
    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.backend.base_url.clone(),
            api_key: self.backend.api_key.clone(),
            default_model: self.backend.model.clone(),
            timeout_secs: self.backend.timeout_secs,
            max_retries: self.backend.max_retries,
        }
    }

    /// Directory for exported reports
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.output_dir)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".avatar-survey")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, DEFAULT_CONFIG).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Default configuration content with comments
const DEFAULT_CONFIG: &str = r#"# avatar-survey configuration

[survey]
# Rating scale bounds (inclusive)
rating_min = 1
rating_max = 10

# Ratings >= high_threshold count as high engagement, <= low_threshold as low
high_threshold = 7
low_threshold = 4

# Maximum number of evaluations in flight
concurrency_limit = 4

# Skip the completion backend entirely and use fallback ratings
mock_mode = false

# Fixed seed for reproducible personas and fallback jitter
# seed = 42

# Break results down by: income-level, tech-savviness, age-bracket,
# occupation, shopping-behavior
# breakdown = "income-level"

[evaluator]
# Timeout for a single completion call (milliseconds)
timeout_ms = 30000
max_tokens = 300
temperature = 0.7

# Fallback scoring weights
tech_weight = 0.5
interest_weight = 0.75
affinity_weight = 1.5
jitter = 1.0

[backend]
# auto: use openai when an API key is set (here or OPENAI_API_KEY), else mock
kind = "auto"
base_url = "https://api.openai.com/v1"
# api_key = "sk-..."
model = "gpt-3.5-turbo"
timeout_secs = 60
max_retries = 2

[personas]
min_age = 18
max_age = 75
default_count = 5

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.avatar-survey/logs/survey.log"

max_file_size_mb = 100
max_files = 5
json_format = false

[storage]
# Where reports go when --output is not given
output_dir = "."
"#;
