//! Rating scale and best-effort rating extraction from free text.
//!
//! Candidates come from three patterns:
//!
//! 1. a fraction, `N/D` or `N out of D`
//! 2. a number following `rating`, `rate`, `rated` or `score` within 20
//!    non-digit characters, skipping scale ranges such as `1-10` or
//!    `1 to 10` on the way
//! 3. a line consisting only of a number
//!
//! Keyword matches and fractions over the scale maximum are preferred to
//! other fractions, which are preferred to bare lines. Within a tier the
//! earliest candidate wins. A keyword whose number opens a fraction takes
//! that fraction's denominator.
//!
//! Decimals round half away from zero, fractions with a different
//! denominator are rescaled onto the scale, and anything outside the scale
//! is clamped to the nearest bound.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Rating Scale
// ─────────────────────────────────────────────────────────────────

/// Inclusive integer rating scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: u8,
    pub max: u8,
}

impl RatingScale {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, rating: u8) -> bool {
        (self.min..=self.max).contains(&rating)
    }

    pub fn midpoint(&self) -> f64 {
        (f64::from(self.min) + f64::from(self.max)) / 2.0
    }

    /// Round half away from zero, then clamp. Returns the rating and whether
    /// clamping was needed.
    pub fn clamp_round(&self, value: f64) -> (u8, bool) {
        let rounded = value.round();
        if rounded < f64::from(self.min) {
            (self.min, true)
        } else if rounded > f64::from(self.max) {
            (self.max, true)
        } else {
            (rounded as u8, false)
        }
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 1, max: 10 }
    }
}

impl fmt::Display for RatingScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

// ─────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────

/// Outcome of parsing a free-text answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingParse {
    Parsed { rating: u8, clamped: bool },
    Unparsed,
}

impl RatingParse {
    pub fn rating(&self) -> Option<u8> {
        match self {
            RatingParse::Parsed { rating, .. } => Some(*rating),
            RatingParse::Unparsed => None,
        }
    }
}

/// A number found in the text, with the denominator when it was a fraction.
struct Candidate {
    tier: u8,
    start: usize,
    priority: u8,
    value: f64,
    denominator: Option<f64>,
}

/// Parses ratings out of completion text.
#[derive(Debug, Clone)]
pub struct RatingExtractor {
    scale: RatingScale,
    fraction: Regex,
    keyword: Regex,
    number: Regex,
    range_tail: Regex,
    bare_line: Regex,
}

const NUMBER: &str = r"(\d+(?:\.\d+)?)";

/// Non-digit characters allowed between a keyword and its number
const KEYWORD_GAP: usize = 20;

/// Scale ranges skipped after a keyword before giving up
const MAX_SKIPPED_RANGES: usize = 2;

impl RatingExtractor {
    pub fn new(scale: RatingScale) -> Result<Self> {
        let compile = |pattern: String| {
            Regex::new(&pattern)
                .map_err(|e| Error::Internal(format!("rating pattern failed to compile: {}", e)))
        };

        Ok(Self {
            scale,
            fraction: compile(format!(r"(?i){NUMBER}\s*(?:/|out\s+of)\s*{NUMBER}"))?,
            keyword: compile(r"(?i)\b(?:rating|rated|rate|score)\b".to_string())?,
            number: compile(NUMBER.to_string())?,
            range_tail: compile(format!(r"(?i)^\s*(?:-|–|—|to)\s*{NUMBER}"))?,
            bare_line: compile(format!(r"(?m)^[ \t]*{NUMBER}[ \t]*\.?[ \t\r]*$"))?,
        })
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    /// Find the best rating candidate in `text`.
    pub fn extract(&self, text: &str) -> RatingParse {
        let max = f64::from(self.scale.max);
        let mut fractions = Vec::new();

        for caps in self.fraction.captures_iter(text) {
            let (Some(num), Some(den)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let (Ok(value), Ok(denominator)) =
                (num.as_str().parse::<f64>(), den.as_str().parse::<f64>())
            else {
                continue;
            };
            // "24/7" and the like are not ratings
            if denominator <= 0.0 || (value > denominator && denominator != max) {
                continue;
            }
            fractions.push(Candidate {
                tier: if denominator == max { 0 } else { 1 },
                start: num.start(),
                priority: 0,
                value,
                denominator: Some(denominator),
            });
        }

        let mut candidates = Vec::new();
        for keyword in self.keyword.find_iter(text) {
            let Some((start, value)) = self.keyword_number(text, keyword.end()) else {
                continue;
            };
            match fractions.iter_mut().find(|f| f.start == start) {
                Some(fraction) => fraction.tier = 0,
                None => candidates.push(Candidate {
                    tier: 0,
                    start,
                    priority: 1,
                    value,
                    denominator: None,
                }),
            }
        }
        candidates.append(&mut fractions);

        for caps in self.bare_line.captures_iter(text) {
            let Some(num) = caps.get(1) else { continue };
            if let Ok(value) = num.as_str().parse::<f64>() {
                candidates.push(Candidate {
                    tier: 2,
                    start: num.start(),
                    priority: 2,
                    value,
                    denominator: None,
                });
            }
        }

        let Some(best) = candidates
            .into_iter()
            .min_by_key(|c| (c.tier, c.start, c.priority))
        else {
            return RatingParse::Unparsed;
        };

        let value = match best.denominator {
            Some(den) if den != max => best.value * max / den,
            _ => best.value,
        };

        let (rating, clamped) = self.scale.clamp_round(value);
        RatingParse::Parsed { rating, clamped }
    }

    /// Number following a keyword that ends at `from`, stepping over ranges
    /// like `(1-10)` or `on a scale of 1 to 10`.
    fn keyword_number(&self, text: &str, from: usize) -> Option<(usize, f64)> {
        let mut pos = from;
        for _ in 0..=MAX_SKIPPED_RANGES {
            let num = self.number.find_at(text, pos)?;
            let gap = &text[pos..num.start()];
            if gap.contains('\n') || gap.chars().count() > KEYWORD_GAP {
                return None;
            }
            match self.range_tail.find(&text[num.end()..]) {
                Some(tail) => pos = num.end() + tail.end(),
                None => return num.as_str().parse().ok().map(|v| (num.start(), v)),
            }
        }
        None
    }

    /// Canonical rating text; always parses back to `rating`.
    pub fn render(&self, rating: u8) -> String {
        format!("Rating: {}/{}", rating, self.scale.max)
    }
}
