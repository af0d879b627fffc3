//! Error types for avatar-survey
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI
//!
//! Upstream (completion service) errors never escape the evaluator: they are
//! converted into fallback ratings. They still live here so backends can
//! report them with the same codes as everything else.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for survey operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Survey input validation errors (3xx)
    InvalidFilter = 300,
    InvalidCount = 301,
    EmptyContent = 302,
    EmptyPersonas = 303,
    DuplicateContentId = 304,
    DuplicatePersonaId = 305,
    InvalidInput = 306,

    // Upstream completion service errors (4xx)
    UpstreamUnavailable = 400,
    UpstreamTimeout = 401,
    UpstreamResponse = 402,

    // Export / report errors (5xx)
    ExportFailed = 500,
    ReportParse = 501,

    // Run control (6xx)
    RunCancelled = 600,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E300")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            600..=699 => 60,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Validation Errors
    // ─────────────────────────────────────────────────────────────

    /// Malformed persona-generation filter
    #[error("Invalid demographic filter: {reason}")]
    InvalidFilter { reason: String },

    /// Requested persona count is not positive
    #[error("Persona count must be at least 1, got {count}")]
    InvalidCount { count: usize },

    /// No content items supplied
    #[error("At least one content item is required")]
    EmptyContent,

    /// No personas supplied
    #[error("At least one persona is required")]
    EmptyPersonas,

    /// Two content items share an identifier
    #[error("Duplicate content identifier '{id}'")]
    DuplicateContentId { id: String },

    /// Two personas share an identifier
    #[error("Duplicate persona identifier '{id}'")]
    DuplicatePersonaId { id: String },

    /// Other malformed survey input (content file, persona file, CLI value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ─────────────────────────────────────────────────────────────
    // Upstream Errors
    // ─────────────────────────────────────────────────────────────

    /// Completion service unreachable or failing
    #[error("Completion backend '{backend}' unavailable: {message}")]
    UpstreamUnavailable { backend: String, message: String },

    /// Completion call exceeded its timeout
    #[error("Completion backend '{backend}' timed out after {timeout_ms}ms")]
    UpstreamTimeout { backend: String, timeout_ms: u64 },

    /// Completion service answered with something unusable
    #[error("Completion backend '{backend}' returned an invalid response: {message}")]
    UpstreamResponse { backend: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Export Errors
    // ─────────────────────────────────────────────────────────────

    /// Report could not be written to its destination
    #[error("Failed to export survey report to {path}")]
    ExportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Exported report could not be parsed back
    #[error("Failed to parse survey report {path}: {message}")]
    ReportParse { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────
    // Run Control / Internal
    // ─────────────────────────────────────────────────────────────

    /// Run was cancelled before aggregation
    #[error("Survey run cancelled after {completed} of {total} evaluations")]
    RunCancelled { completed: usize, total: usize },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::InvalidInput,

            Error::InvalidFilter { .. } => ErrorCode::InvalidFilter,
            Error::InvalidCount { .. } => ErrorCode::InvalidCount,
            Error::EmptyContent => ErrorCode::EmptyContent,
            Error::EmptyPersonas => ErrorCode::EmptyPersonas,
            Error::DuplicateContentId { .. } => ErrorCode::DuplicateContentId,
            Error::DuplicatePersonaId { .. } => ErrorCode::DuplicatePersonaId,
            Error::InvalidInput(_) => ErrorCode::InvalidInput,

            Error::UpstreamUnavailable { .. } => ErrorCode::UpstreamUnavailable,
            Error::UpstreamTimeout { .. } => ErrorCode::UpstreamTimeout,
            Error::UpstreamResponse { .. } => ErrorCode::UpstreamResponse,

            Error::ExportFailed { .. } => ErrorCode::ExportFailed,
            Error::ReportParse { .. } => ErrorCode::ReportParse,

            Error::RunCancelled { .. } => ErrorCode::RunCancelled,
            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::UpstreamUnavailable { .. }
                | Error::UpstreamTimeout { .. }
                | Error::ExportFailed { .. }
                | Error::Io(_)
                | Error::IoRead { .. }
                | Error::IoWrite { .. }
        )
    }

    /// Check if the error is a survey input validation failure
    pub fn is_validation(&self) -> bool {
        (300..400).contains(&(self.code() as u16))
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'avatar-survey config init' to create a default configuration file.",
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'avatar-survey config validate' to see details.",
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the [survey] and [evaluator] sections; thresholds must lie inside the rating scale.",
            ),
            Error::InvalidFilter { .. } => Some(
                "Pass at least one --income level and make sure --min-age is not above --max-age.",
            ),
            Error::InvalidCount { .. } => Some("Use --count with a value of 1 or more."),
            Error::EmptyContent => Some(
                "Provide a content file with --content, or omit it to use the bundled sample ads.",
            ),
            Error::DuplicateContentId { .. } => {
                Some("Every content item needs its own 'id' within one survey.")
            }
            Error::UpstreamUnavailable { .. } | Error::UpstreamTimeout { .. } => Some(
                "Check the [backend] base_url and api_key, or run with --mock to use fallback ratings.",
            ),
            Error::ExportFailed { .. } => Some(
                "Choose a writable --output path. The survey results are still shown above.",
            ),
            Error::ReportParse { .. } => {
                Some("The file does not look like a report written by 'avatar-survey run'.")
            }
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code().as_str(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an invalid filter error
    pub fn invalid_filter(reason: impl Into<String>) -> Self {
        Error::InvalidFilter {
            reason: reason.into(),
        }
    }

    /// Create an upstream unavailable error
    pub fn upstream_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::UpstreamUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create an upstream response error
    pub fn upstream_response(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::UpstreamResponse {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::InvalidFilter.as_str(), "E300");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigValidation.exit_code(), 10);
        assert_eq!(ErrorCode::IoRead.exit_code(), 20);
        assert_eq!(ErrorCode::DuplicateContentId.exit_code(), 30);
        assert_eq!(ErrorCode::UpstreamTimeout.exit_code(), 40);
        assert_eq!(ErrorCode::ExportFailed.exit_code(), 50);
        assert_eq!(ErrorCode::RunCancelled.exit_code(), 60);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_validation_classification() {
        assert!(Error::EmptyContent.is_validation());
        assert!(Error::EmptyPersonas.is_validation());
        assert!(Error::invalid_filter("empty income set").is_validation());
        assert!(Error::DuplicateContentId { id: "A".into() }.is_validation());
        assert!(!Error::upstream_unavailable("openai", "refused").is_validation());
        assert!(!Error::Internal("boom".into()).is_validation());
    }

    #[test]
    fn test_error_retryable() {
        assert!(Error::upstream_unavailable("openai", "refused").is_retryable());
        assert!(Error::UpstreamTimeout { backend: "openai".into(), timeout_ms: 10 }.is_retryable());
        assert!(!Error::EmptyContent.is_retryable());
        assert!(!Error::InvalidCount { count: 0 }.is_retryable());
    }

    #[test]
    fn test_format_for_terminal() {
        let err = Error::DuplicateContentId { id: "Ad_A".into() };
        let formatted = err.format_for_terminal();
        assert!(formatted.contains("E304"));
        assert!(formatted.contains("Ad_A"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let formatted = Error::EmptyPersonas.format_for_log();
        assert!(formatted.contains("[E303]"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert_eq!(err.code(), ErrorCode::IoNotFound);
    }
}
