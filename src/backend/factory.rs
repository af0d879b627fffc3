//! Backend Factory
//!
//! Turns the `[backend]` configuration section into a shared backend.

use std::sync::Arc;

use tracing::info;

use crate::config::{BackendKind, SurveyConfig};
use crate::error::Result;

use super::{MockBackend, MockConfig, OpenAiBackend, SharedBackend};

/// Factory for creating backends
pub struct BackendFactory;

impl BackendFactory {
    /// Create the backend selected by configuration, resolving `auto`.
    pub fn from_config(config: &SurveyConfig) -> Result<SharedBackend> {
        let kind = config.resolved_backend();
        if config.backend.kind == BackendKind::Auto {
            info!(
                resolved = ?kind,
                "Backend 'auto' resolved (openai needs an API key)"
            );
        }
        Self::create(kind, config)
    }

    /// Create a backend of the specified kind
    pub fn create(kind: BackendKind, config: &SurveyConfig) -> Result<SharedBackend> {
        match kind {
            BackendKind::OpenAi => Ok(Arc::new(OpenAiBackend::new(config.openai_config())?)),
            BackendKind::Mock | BackendKind::Auto => Ok(Arc::new(MockBackend::with_config(
                MockConfig {
                    scale: config.rating_scale(),
                    ..Default::default()
                },
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_without_key_is_mock() {
        let config = SurveyConfig::default();
        let backend = BackendFactory::from_config(&config).unwrap();
        assert_eq!(backend.name(), "mock");
    }

    #[test]
    fn test_auto_with_key_is_openai() {
        let mut config = SurveyConfig::default();
        config.backend.api_key = "sk-test".into();
        let backend = BackendFactory::from_config(&config).unwrap();
        assert_eq!(backend.name(), "openai");
        assert_eq!(backend.capabilities().model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_explicit_kind() {
        let config = SurveyConfig::default();
        let backend = BackendFactory::create(BackendKind::OpenAi, &config).unwrap();
        assert_eq!(backend.name(), "openai");
    }
}
