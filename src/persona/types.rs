//! Core types for synthetic survey respondents.
//!
//! A [`PersonaRecord`] is built once by the factory (or loaded from a persona
//! file) and never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Attribute Pools
// ─────────────────────────────────────────────────────────────────

/// Interests a persona can be sampled with.
pub const INTEREST_POOL: &[&str] = &[
    "Technology",
    "Sports",
    "Travel",
    "Cooking",
    "Reading",
    "Music",
    "Movies",
    "Gaming",
    "Fitness",
    "Art",
    "Fashion",
    "Photography",
    "Gardening",
    "Cars",
    "Finance",
    "Health",
    "Nature",
    "Social Media",
];

/// Personality traits a persona can be sampled with.
pub const TRAIT_POOL: &[&str] = &[
    "Outgoing",
    "Analytical",
    "Creative",
    "Practical",
    "Curious",
    "Cautious",
    "Adventurous",
    "Traditional",
    "Modern",
    "Frugal",
    "Generous",
    "Detail-oriented",
    "Big-picture thinker",
    "Social",
    "Independent",
    "Family-oriented",
    "Career-focused",
    "Relaxed",
];

// ─────────────────────────────────────────────────────────────────
// Income Level
// ─────────────────────────────────────────────────────────────────

/// Coarse income bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeLevel {
    Low,
    Medium,
    High,
}

impl IncomeLevel {
    pub fn slug(&self) -> &'static str {
        match self {
            IncomeLevel::Low => "low",
            IncomeLevel::Medium => "medium",
            IncomeLevel::High => "high",
        }
    }

    pub fn all() -> &'static [IncomeLevel] {
        &[IncomeLevel::Low, IncomeLevel::Medium, IncomeLevel::High]
    }
}

impl fmt::Display for IncomeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for IncomeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(IncomeLevel::Low),
            "medium" | "mid" => Ok(IncomeLevel::Medium),
            "high" => Ok(IncomeLevel::High),
            _ => Err(format!(
                "Unknown income level '{}'. Valid: low, medium, high",
                s
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tech Savviness
// ─────────────────────────────────────────────────────────────────

/// How comfortable the persona is with technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechSavviness {
    Low,
    Medium,
    High,
}

impl TechSavviness {
    pub fn slug(&self) -> &'static str {
        match self {
            TechSavviness::Low => "low",
            TechSavviness::Medium => "medium",
            TechSavviness::High => "high",
        }
    }

    pub fn all() -> &'static [TechSavviness] {
        &[TechSavviness::Low, TechSavviness::Medium, TechSavviness::High]
    }

    /// Signed step used by fallback scoring: low = -1, medium = 0, high = +1.
    pub fn step(&self) -> f64 {
        match self {
            TechSavviness::Low => -1.0,
            TechSavviness::Medium => 0.0,
            TechSavviness::High => 1.0,
        }
    }
}

impl fmt::Display for TechSavviness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

// ─────────────────────────────────────────────────────────────────
// Shopping Behavior
// ─────────────────────────────────────────────────────────────────

/// Dominant purchasing pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShoppingBehavior {
    BudgetConscious,
    Impulse,
    ResearchHeavy,
    BrandLoyal,
}

impl ShoppingBehavior {
    pub fn slug(&self) -> &'static str {
        match self {
            ShoppingBehavior::BudgetConscious => "budget-conscious",
            ShoppingBehavior::Impulse => "impulse",
            ShoppingBehavior::ResearchHeavy => "research-heavy",
            ShoppingBehavior::BrandLoyal => "brand-loyal",
        }
    }

    pub fn all() -> &'static [ShoppingBehavior] {
        &[
            ShoppingBehavior::BudgetConscious,
            ShoppingBehavior::Impulse,
            ShoppingBehavior::ResearchHeavy,
            ShoppingBehavior::BrandLoyal,
        ]
    }
}

impl fmt::Display for ShoppingBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

// ─────────────────────────────────────────────────────────────────
// Occupation
// ─────────────────────────────────────────────────────────────────

/// Occupation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Occupation {
    SoftwareEngineer,
    Teacher,
    Nurse,
    MarketingManager,
    Student,
    Retired,
    SmallBusinessOwner,
    Artist,
    Accountant,
    Chef,
    Doctor,
    SalesRepresentative,
    Designer,
    Writer,
}

impl Occupation {
    /// Human-readable display name, as rendered into prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Occupation::SoftwareEngineer => "Software Engineer",
            Occupation::Teacher => "Teacher",
            Occupation::Nurse => "Nurse",
            Occupation::MarketingManager => "Marketing Manager",
            Occupation::Student => "Student",
            Occupation::Retired => "Retired",
            Occupation::SmallBusinessOwner => "Small Business Owner",
            Occupation::Artist => "Artist",
            Occupation::Accountant => "Accountant",
            Occupation::Chef => "Chef",
            Occupation::Doctor => "Doctor",
            Occupation::SalesRepresentative => "Sales Representative",
            Occupation::Designer => "Designer",
            Occupation::Writer => "Writer",
        }
    }

    pub fn all() -> &'static [Occupation] {
        &[
            Occupation::SoftwareEngineer,
            Occupation::Teacher,
            Occupation::Nurse,
            Occupation::MarketingManager,
            Occupation::Student,
            Occupation::Retired,
            Occupation::SmallBusinessOwner,
            Occupation::Artist,
            Occupation::Accountant,
            Occupation::Chef,
            Occupation::Doctor,
            Occupation::SalesRepresentative,
            Occupation::Designer,
            Occupation::Writer,
        ]
    }
}

impl fmt::Display for Occupation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Age
// ─────────────────────────────────────────────────────────────────

/// Inclusive age range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

impl AgeRange {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, age: u8) -> bool {
        (self.min..=self.max).contains(&age)
    }

    /// True when `other` lies entirely inside this range.
    pub fn covers(&self, other: &AgeRange) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self { min: 18, max: 75 }
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Decade-style bracket label used by demographic breakdowns.
pub fn age_bracket(age: u8) -> &'static str {
    match age {
        0..=24 => "18-24",
        25..=34 => "25-34",
        35..=44 => "35-44",
        45..=54 => "45-54",
        55..=64 => "55-64",
        _ => "65+",
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Record
// ─────────────────────────────────────────────────────────────────

/// One synthetic survey respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRecord {
    /// Unique within one generation (`persona-0001`, ...)
    pub id: String,
    /// Display name (`User_0001`, ...)
    pub name: String,
    pub age: u8,
    pub occupation: Occupation,
    pub income_level: IncomeLevel,
    /// Ordered, non-empty, no duplicates
    pub interests: Vec<String>,
    /// Ordered, no duplicates
    pub personality_traits: Vec<String>,
    pub tech_savviness: TechSavviness,
    pub shopping_behavior: ShoppingBehavior,
}

impl PersonaRecord {
    /// Case-insensitive interest lookup.
    pub fn has_interest(&self, interest: &str) -> bool {
        self.interests
            .iter()
            .any(|i| i.eq_ignore_ascii_case(interest))
    }

    pub fn age_bracket(&self) -> &'static str {
        age_bracket(self.age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_income_from_str() {
        assert_eq!("HIGH".parse::<IncomeLevel>().unwrap(), IncomeLevel::High);
        assert_eq!(" medium ".parse::<IncomeLevel>().unwrap(), IncomeLevel::Medium);
        assert!("rich".parse::<IncomeLevel>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ShoppingBehavior::BudgetConscious).unwrap();
        assert_eq!(json, "\"budget-conscious\"");
        let json = serde_json::to_string(&Occupation::SmallBusinessOwner).unwrap();
        assert_eq!(json, "\"small-business-owner\"");
        let json = serde_json::to_string(&IncomeLevel::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn test_pools_have_no_duplicates() {
        let mut interests = INTEREST_POOL.to_vec();
        interests.sort_unstable();
        interests.dedup();
        assert_eq!(interests.len(), INTEREST_POOL.len());
        assert_eq!(Occupation::all().len(), 14);
    }

    #[test]
    fn test_age_range() {
        let bounds = AgeRange::default();
        assert!(bounds.contains(18));
        assert!(bounds.contains(75));
        assert!(!bounds.contains(76));
        assert!(bounds.covers(&AgeRange::new(25, 55)));
        assert!(!bounds.covers(&AgeRange::new(10, 30)));
    }

    #[test]
    fn test_age_bracket() {
        assert_eq!(age_bracket(18), "18-24");
        assert_eq!(age_bracket(25), "25-34");
        assert_eq!(age_bracket(64), "55-64");
        assert_eq!(age_bracket(75), "65+");
    }
}
