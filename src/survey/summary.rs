//! Aggregation of evaluation results into summary statistics.
//!
//! Summaries are always recomputed from the full result list.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::persona::PersonaRecord;
use crate::types::{ContentItem, EvaluationResult};

// ─────────────────────────────────────────────────────────────────
// Demographic Attribute
// ─────────────────────────────────────────────────────────────────

/// Persona attribute a breakdown groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemographicAttribute {
    IncomeLevel,
    TechSavviness,
    AgeBracket,
    Occupation,
    ShoppingBehavior,
}

impl DemographicAttribute {
    pub fn slug(&self) -> &'static str {
        match self {
            DemographicAttribute::IncomeLevel => "income-level",
            DemographicAttribute::TechSavviness => "tech-savviness",
            DemographicAttribute::AgeBracket => "age-bracket",
            DemographicAttribute::Occupation => "occupation",
            DemographicAttribute::ShoppingBehavior => "shopping-behavior",
        }
    }

    pub fn all() -> &'static [DemographicAttribute] {
        &[
            DemographicAttribute::IncomeLevel,
            DemographicAttribute::TechSavviness,
            DemographicAttribute::AgeBracket,
            DemographicAttribute::Occupation,
            DemographicAttribute::ShoppingBehavior,
        ]
    }

    /// Group label of `persona` under this attribute.
    pub fn group_of(&self, persona: &PersonaRecord) -> String {
        match self {
            DemographicAttribute::IncomeLevel => persona.income_level.to_string(),
            DemographicAttribute::TechSavviness => persona.tech_savviness.to_string(),
            DemographicAttribute::AgeBracket => persona.age_bracket().to_string(),
            DemographicAttribute::Occupation => persona.occupation.to_string(),
            DemographicAttribute::ShoppingBehavior => persona.shopping_behavior.to_string(),
        }
    }
}

impl fmt::Display for DemographicAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for DemographicAttribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "income-level" | "income" => Ok(DemographicAttribute::IncomeLevel),
            "tech-savviness" | "tech" => Ok(DemographicAttribute::TechSavviness),
            "age-bracket" | "age" => Ok(DemographicAttribute::AgeBracket),
            "occupation" => Ok(DemographicAttribute::Occupation),
            "shopping-behavior" | "shopping" => Ok(DemographicAttribute::ShoppingBehavior),
            _ => Err(format!(
                "Unknown attribute '{}'. Valid: income-level, tech-savviness, age-bracket, occupation, shopping-behavior",
                s
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Summary Types
// ─────────────────────────────────────────────────────────────────

/// Thresholds and grouping used by [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationSettings {
    /// Ratings at or above count as high engagement
    pub high_threshold: u8,
    /// Ratings at or below count as low engagement
    pub low_threshold: u8,
    pub breakdown: Option<DemographicAttribute>,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            high_threshold: 7,
            low_threshold: 4,
            breakdown: None,
        }
    }
}

/// Statistics for one content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStats {
    pub content_id: String,
    pub title: String,
    pub mean: f64,
    pub total_responses: usize,
    pub high_engagement: usize,
    pub low_engagement: usize,
    pub min: u8,
    pub max: u8,
}

/// Content item with the greatest mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub content_id: String,
    pub mean: f64,
}

/// Mean rating one demographic group gave one content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub content_id: String,
    pub group: String,
    pub mean: f64,
    pub responses: usize,
}

/// Results split by one persona attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicBreakdown {
    pub attribute: DemographicAttribute,
    /// Content input order, then group name
    pub groups: Vec<GroupStats>,
}

/// Aggregate view of one survey run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySummary {
    /// One entry per content item, in input order
    pub content: Vec<ContentStats>,
    pub winner: Option<Winner>,
    pub high_threshold: u8,
    pub low_threshold: u8,
    pub total_responses: usize,
    pub rated_count: usize,
    pub fallback_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<DemographicBreakdown>,
}

impl SurveySummary {
    /// Settings that reproduce this summary from the same results.
    pub fn settings(&self) -> AggregationSettings {
        AggregationSettings {
            high_threshold: self.high_threshold,
            low_threshold: self.low_threshold,
            breakdown: self.breakdown.as_ref().map(|b| b.attribute),
        }
    }

    pub fn stats_for(&self, content_id: &str) -> Option<&ContentStats> {
        self.content.iter().find(|s| s.content_id == content_id)
    }
}

// ─────────────────────────────────────────────────────────────────
// Aggregation
// ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tally {
    sum: u64,
    count: usize,
    high: usize,
    low: usize,
    min: Option<u8>,
    max: Option<u8>,
}

impl Tally {
    fn add(&mut self, rating: u8, settings: &AggregationSettings) {
        self.sum += u64::from(rating);
        self.count += 1;
        if rating >= settings.high_threshold {
            self.high += 1;
        }
        if rating <= settings.low_threshold {
            self.low += 1;
        }
        self.min = Some(self.min.map_or(rating, |m| m.min(rating)));
        self.max = Some(self.max.map_or(rating, |m| m.max(rating)));
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

/// Compute per-item statistics, the winner, and the optional breakdown.
///
/// Results referring to unknown content items are ignored. The winner is the
/// item with the strictly greatest mean; ties go to the item listed first.
/// Items without responses never win.
pub fn aggregate(
    items: &[ContentItem],
    personas: &[PersonaRecord],
    results: &[EvaluationResult],
    settings: &AggregationSettings,
) -> SurveySummary {
    let mut tallies: HashMap<&str, Tally> = items
        .iter()
        .map(|item| (item.id.as_str(), Tally::default()))
        .collect();

    let mut rated_count = 0;
    let mut fallback_count = 0;
    let mut total_responses = 0;

    for result in results {
        let Some(tally) = tallies.get_mut(result.content_id.as_str()) else {
            debug!(content = %result.content_id, "Ignoring result for unknown content item");
            continue;
        };
        tally.add(result.rating, settings);
        total_responses += 1;
        if result.is_fallback() {
            fallback_count += 1;
        } else {
            rated_count += 1;
        }
    }

    let content: Vec<ContentStats> = items
        .iter()
        .map(|item| {
            let tally = tallies.remove(item.id.as_str()).unwrap_or_default();
            ContentStats {
                content_id: item.id.clone(),
                title: item.title.clone(),
                mean: tally.mean(),
                total_responses: tally.count,
                high_engagement: tally.high,
                low_engagement: tally.low,
                min: tally.min.unwrap_or(0),
                max: tally.max.unwrap_or(0),
            }
        })
        .collect();

    let mut winner: Option<Winner> = None;
    for stats in content.iter().filter(|s| s.total_responses > 0) {
        if winner.as_ref().map_or(true, |w| stats.mean > w.mean) {
            winner = Some(Winner {
                content_id: stats.content_id.clone(),
                mean: stats.mean,
            });
        }
    }

    let breakdown = settings
        .breakdown
        .map(|attribute| breakdown(attribute, items, personas, results));

    SurveySummary {
        content,
        winner,
        high_threshold: settings.high_threshold,
        low_threshold: settings.low_threshold,
        total_responses,
        rated_count,
        fallback_count,
        breakdown,
    }
}

fn breakdown(
    attribute: DemographicAttribute,
    items: &[ContentItem],
    personas: &[PersonaRecord],
    results: &[EvaluationResult],
) -> DemographicBreakdown {
    let groups_by_persona: HashMap<&str, String> = personas
        .iter()
        .map(|p| (p.id.as_str(), attribute.group_of(p)))
        .collect();

    // content id -> group -> (sum, count)
    let mut sums: HashMap<&str, BTreeMap<&str, (u64, usize)>> = HashMap::new();
    for result in results {
        let Some(group) = groups_by_persona.get(result.persona_id.as_str()) else {
            continue;
        };
        let entry = sums
            .entry(result.content_id.as_str())
            .or_default()
            .entry(group.as_str())
            .or_default();
        entry.0 += u64::from(result.rating);
        entry.1 += 1;
    }

    let groups = items
        .iter()
        .filter_map(|item| sums.get(item.id.as_str()).map(|g| (item, g)))
        .flat_map(|(item, groups)| {
            groups.iter().map(move |(group, (sum, count))| GroupStats {
                content_id: item.id.clone(),
                group: group.to_string(),
                mean: *sum as f64 / *count as f64,
                responses: *count,
            })
        })
        .collect();

    DemographicBreakdown { attribute, groups }
}
