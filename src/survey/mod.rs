//! Survey orchestration: running comparisons, aggregating results, and
//! exporting reports.

pub mod export;
pub mod runner;
pub mod summary;

pub use export::{write_json_atomic, RunInfo, SurveyReport};
pub use runner::{CancelHandle, SurveyRun, SurveyRunner};
pub use summary::{
    aggregate, AggregationSettings, ContentStats, DemographicAttribute, DemographicBreakdown,
    GroupStats, SurveySummary, Winner,
};
