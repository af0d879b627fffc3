//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use avatar_survey::persona::PersonaFactory;
use avatar_survey::persona::PersonaRecord;
use avatar_survey::types::ContentItem;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

/// Three ads in the shape of the bundled samples
pub fn sample_items() -> Vec<ContentItem> {
    vec![
        ContentItem::new(
            "Ad_A",
            "Premium Fitness Tracker",
            "Track every workout with our premium sensor suite.",
        ),
        ContentItem::new(
            "Ad_B",
            "Budget Fitness Watch",
            "Affordable step counting for everyone.",
        ),
        ContentItem::new(
            "Ad_C",
            "Luxury Health Monitor",
            "Exclusive luxury health insights around the clock.",
        ),
    ]
}

/// Reproducible personas
pub fn sample_personas(count: usize) -> Vec<PersonaRecord> {
    PersonaFactory::seeded(42)
        .generate_random(count)
        .expect("persona generation")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_exist() {
        assert!(fixtures_dir().exists());
        assert!(valid_config_fixture().exists());
        assert!(invalid_config_fixture().exists());
    }
}
