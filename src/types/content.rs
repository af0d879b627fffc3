//! Content items (advertisements) under test.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Bundled sample advertisements
const SAMPLE_ADS: &str = include_str!("../../config/sample_ads.toml");

/// One advertisement shown to every persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique within a run
    pub id: String,
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Content items plus the survey context they were written for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSet {
    /// Scenario text shown to every persona
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(alias = "ads", alias = "content_items")]
    pub items: Vec<ContentItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentFile {
    Set(ContentSet),
    List(Vec<ContentItem>),
}

impl ContentSet {
    /// The bundled fitness-tracker sample set.
    pub fn samples() -> Result<Self> {
        toml::from_str(SAMPLE_ADS)
            .map_err(|e| Error::Internal(format!("bundled sample ads are malformed: {}", e)))
    }

    /// Load content from a `.json` or `.toml` file.
    ///
    /// JSON may be a bare array of items or an object with `items`
    /// (`ads` and `content_items` are accepted too) and an optional `context`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let set = if is_toml {
            toml::from_str::<ContentSet>(&content).map_err(|e| {
                Error::InvalidInput(format!("{}: not a content file: {}", path.display(), e))
            })?
        } else {
            match serde_json::from_str::<ContentFile>(&content).map_err(|e| {
                Error::InvalidInput(format!("{}: not a content file: {}", path.display(), e))
            })? {
                ContentFile::Set(set) => set,
                ContentFile::List(items) => ContentSet {
                    context: None,
                    items,
                },
            }
        };

        validate_content_items(&set.items)?;
        info!(path = %path.display(), count = set.items.len(), "Loaded content items");
        Ok(set)
    }
}

/// Reject empty sets, blank identifiers and duplicate identifiers.
pub fn validate_content_items(items: &[ContentItem]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::EmptyContent);
    }

    let mut seen = HashSet::new();
    for item in items {
        if item.id.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "content item '{}' has an empty id",
                item.title
            )));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(Error::DuplicateContentId {
                id: item.id.clone(),
            });
        }
    }
    Ok(())
}
