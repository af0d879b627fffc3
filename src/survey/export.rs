//! Survey report export and import.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::runner::SurveyRun;
use super::summary::{aggregate, AggregationSettings, SurveySummary};
use crate::error::{Error, Result};
use crate::persona::PersonaRecord;
use crate::types::{ContentItem, EvaluationResult};
use crate::version::build_info;

/// Everything needed to inspect or re-aggregate a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyReport {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    /// Version of the tool that produced the report
    pub tool_version: String,
    /// Seed used for persona generation and fallback jitter
    pub seed: u64,
    /// Backend the run was configured with
    pub backend: String,
    pub mock_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub content_items: Vec<ContentItem>,
    pub personas: Vec<PersonaRecord>,
    pub results: Vec<EvaluationResult>,
    pub summary: SurveySummary,
}

/// Run metadata recorded alongside the results
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub seed: u64,
    pub backend: String,
    pub mock_mode: bool,
    pub context: Option<String>,
}

impl SurveyReport {
    pub fn new(
        run: SurveyRun,
        content_items: Vec<ContentItem>,
        personas: Vec<PersonaRecord>,
        info: RunInfo,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            tool_version: build_info().full_version(),
            seed: info.seed,
            backend: info.backend,
            mock_mode: info.mock_mode,
            context: info.context,
            content_items,
            personas,
            results: run.results,
            summary: run.summary,
        }
    }

    /// Write the report as pretty JSON, replacing `destination` atomically.
    pub fn export(&self, destination: &Path) -> Result<()> {
        write_json_atomic(self, destination)?;
        info!(path = %destination.display(), run_id = %self.run_id, "Survey report exported");
        Ok(())
    }

    /// Read a report written by [`SurveyReport::export`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let report = serde_json::from_str(&content).map_err(|e| Error::ReportParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "Survey report loaded");
        Ok(report)
    }

    /// Recompute the summary from the stored results.
    pub fn reaggregate(&self, settings: &AggregationSettings) -> SurveySummary {
        aggregate(&self.content_items, &self.personas, &self.results, settings)
    }

    /// Default report file name for this run.
    pub fn default_file_name(&self) -> String {
        format!(
            "survey-{}-{}.json",
            self.created_at.format("%Y%m%d-%H%M%S"),
            self.run_id.chars().take(8).collect::<String>()
        )
    }
}

/// Serialize `value` to a sibling temp file, then rename it over `path`.
///
/// Readers never observe a half-written file. Any failure is reported as
/// [`Error::ExportFailed`] and leaves an existing file at `path` untouched.
pub fn write_json_atomic<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    let export_err = |source: std::io::Error| Error::ExportFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(export_err)?;
    }

    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, json.as_bytes()) {
        let _ = fs::remove_file(&tmp);
        return Err(export_err(e));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(export_err(e));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!(
        ".{}.{}.tmp",
        name,
        uuid::Uuid::new_v4().simple()
    ))
}
