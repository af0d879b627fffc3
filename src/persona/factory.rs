//! Persona generation.
//!
//! All randomness flows through the injected RNG so a seeded factory always
//! produces the same personas in the same order.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{
    AgeRange, IncomeLevel, Occupation, PersonaRecord, ShoppingBehavior, TechSavviness,
    INTEREST_POOL, TRAIT_POOL,
};
use crate::error::{Error, Result};

const INTEREST_COUNT: (usize, usize) = (3, 6);
const TRAIT_COUNT: (usize, usize) = (2, 4);

// ─────────────────────────────────────────────────────────────────
// Demographic Filter
// ─────────────────────────────────────────────────────────────────

/// Constraints for targeted persona generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicFilter {
    /// Inclusive age range
    pub age_range: AgeRange,
    /// Allowed income levels; must not be empty
    pub income_levels: Vec<IncomeLevel>,
    /// Interests every generated persona must carry
    #[serde(default)]
    pub required_interests: Vec<String>,
}

impl DemographicFilter {
    /// Check the filter against the allowed age bounds.
    pub fn validate(&self, bounds: &AgeRange) -> Result<()> {
        if self.income_levels.is_empty() {
            return Err(Error::invalid_filter("income level set is empty"));
        }
        if self.age_range.min > self.age_range.max {
            return Err(Error::invalid_filter(format!(
                "age range {} is inverted",
                self.age_range
            )));
        }
        if !bounds.covers(&self.age_range) {
            return Err(Error::invalid_filter(format!(
                "age range {} lies outside the allowed bounds {}",
                self.age_range, bounds
            )));
        }
        if self.required_interests.iter().any(|i| i.trim().is_empty()) {
            return Err(Error::invalid_filter("required interests must not be blank"));
        }
        Ok(())
    }

    /// True when `persona` satisfies every constraint of this filter.
    pub fn matches(&self, persona: &PersonaRecord) -> bool {
        self.age_range.contains(persona.age)
            && self.income_levels.contains(&persona.income_level)
            && self
                .required_interests
                .iter()
                .all(|i| persona.has_interest(i.trim()))
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Factory
// ─────────────────────────────────────────────────────────────────

/// Builds [`PersonaRecord`]s from an injected random source.
pub struct PersonaFactory<R = ChaCha8Rng> {
    rng: R,
    bounds: AgeRange,
    next_id: usize,
}

impl PersonaFactory<ChaCha8Rng> {
    /// Factory with a fixed seed; identical seeds give identical personas.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Factory seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> PersonaFactory<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            bounds: AgeRange::default(),
            next_id: 1,
        }
    }

    /// Restrict generated ages to `bounds`.
    pub fn with_bounds(mut self, bounds: AgeRange) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn bounds(&self) -> AgeRange {
        self.bounds
    }

    /// Generate `count` personas with every attribute sampled uniformly.
    pub fn generate_random(&mut self, count: usize) -> Result<Vec<PersonaRecord>> {
        if count == 0 {
            return Err(Error::InvalidCount { count });
        }

        let bounds = self.bounds;
        let personas = (0..count)
            .map(|_| self.sample(bounds, IncomeLevel::all(), &[]))
            .collect();

        debug!(count, "Generated random personas");
        Ok(personas)
    }

    /// Generate `count` personas that all satisfy `filter`.
    pub fn generate_targeted(
        &mut self,
        filter: &DemographicFilter,
        count: usize,
    ) -> Result<Vec<PersonaRecord>> {
        filter.validate(&self.bounds)?;
        if count == 0 {
            return Err(Error::InvalidCount { count });
        }

        let required: Vec<String> = filter
            .required_interests
            .iter()
            .map(|i| canonical_interest(i))
            .collect();

        let personas = (0..count)
            .map(|_| self.sample(filter.age_range, &filter.income_levels, &required))
            .collect();

        debug!(
            count,
            ages = %filter.age_range,
            incomes = filter.income_levels.len(),
            required = required.len(),
            "Generated targeted personas"
        );
        Ok(personas)
    }

    fn sample(
        &mut self,
        ages: AgeRange,
        incomes: &[IncomeLevel],
        required_interests: &[String],
    ) -> PersonaRecord {
        let seq = self.next_id;
        self.next_id += 1;

        let age = self.rng.gen_range(ages.min..=ages.max);
        let occupation = pick(&mut self.rng, Occupation::all());
        let income_level = pick(&mut self.rng, incomes);

        let mut interests = self.sample_distinct(INTEREST_POOL, INTEREST_COUNT);
        for interest in required_interests {
            if !interests.iter().any(|i| i.eq_ignore_ascii_case(interest)) {
                interests.push(interest.clone());
            }
        }

        let personality_traits = self.sample_distinct(TRAIT_POOL, TRAIT_COUNT);
        let tech_savviness = pick(&mut self.rng, TechSavviness::all());
        let shopping_behavior = pick(&mut self.rng, ShoppingBehavior::all());

        PersonaRecord {
            id: format!("persona-{:04}", seq),
            name: format!("User_{:04}", seq),
            age,
            occupation,
            income_level,
            interests,
            personality_traits,
            tech_savviness,
            shopping_behavior,
        }
    }

    fn sample_distinct(&mut self, pool: &[&str], (min, max): (usize, usize)) -> Vec<String> {
        let amount = self.rng.gen_range(min..=max).min(pool.len());
        pool.choose_multiple(&mut self.rng, amount)
            .map(|s| s.to_string())
            .collect()
    }
}

fn pick<T: Copy, R: Rng>(rng: &mut R, options: &[T]) -> T {
    // Callers never pass an empty slice: pools are constant and filters are validated.
    options[rng.gen_range(0..options.len())]
}

/// Use the pool spelling when the interest is a known one.
fn canonical_interest(interest: &str) -> String {
    let trimmed = interest.trim();
    INTEREST_POOL
        .iter()
        .find(|known| known.eq_ignore_ascii_case(trimmed))
        .map(|known| known.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
