//! Fallback scoring: the rating used when the completion service is
//! disabled, failing, or vague.

use std::collections::HashSet;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::persona::{IncomeLevel, PersonaRecord};
use crate::rating::RatingScale;
use crate::types::ContentItem;

/// Words marking premium-priced content
const PREMIUM_WORDS: &[&str] = &["premium", "luxury", "elite", "exclusive"];

/// Words marking budget-priced content
const BUDGET_WORDS: &[&str] = &["budget", "affordable", "cheap", "discount", "bargain"];

/// Interest matches beyond this count add nothing
const MAX_INTEREST_MATCHES: usize = 3;

// ─────────────────────────────────────────────────────────────────
// Scorer Trait
// ─────────────────────────────────────────────────────────────────

/// Produces a fallback rating for one pair.
///
/// `rng` is seeded per pair, so a scorer that only draws from it is
/// independent of run order and concurrency.
pub trait FallbackScorer: Send + Sync {
    fn score(
        &self,
        persona: &PersonaRecord,
        content: &ContentItem,
        scale: RatingScale,
        rng: &mut dyn RngCore,
    ) -> u8;
}

/// Deterministic per-pair RNG: SHA-256 over the run seed and both ids.
pub fn pair_rng(seed: u64, persona_id: &str, content_id: &str) -> ChaCha8Rng {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(persona_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(content_id.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    ChaCha8Rng::from_seed(bytes)
}

// ─────────────────────────────────────────────────────────────────
// Default Scorer
// ─────────────────────────────────────────────────────────────────

/// Weights of the default fallback heuristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackWeights {
    /// Per tech-savviness step (low = -1, medium = 0, high = +1)
    pub tech: f64,
    /// Per persona interest mentioned in the content
    pub interest: f64,
    /// Income / price-tier affinity
    pub affinity: f64,
    /// Maximum absolute uniform jitter
    pub jitter: f64,
}

impl Default for FallbackWeights {
    fn default() -> Self {
        Self {
            tech: 0.5,
            interest: 0.75,
            affinity: 1.5,
            jitter: 1.0,
        }
    }
}

/// Midpoint of the scale, nudged by persona/content fit, plus bounded jitter.
#[derive(Debug, Clone, Default)]
pub struct DefaultFallbackScorer {
    weights: FallbackWeights,
}

impl DefaultFallbackScorer {
    pub fn new(weights: FallbackWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> FallbackWeights {
        self.weights
    }

    /// Score before jitter and rounding.
    pub fn base_score(
        &self,
        persona: &PersonaRecord,
        content: &ContentItem,
        scale: RatingScale,
    ) -> f64 {
        let words = content_words(content);

        let matches = persona
            .interests
            .iter()
            .filter(|interest| mentions(&words, interest))
            .count()
            .min(MAX_INTEREST_MATCHES);

        scale.midpoint()
            + self.weights.tech * persona.tech_savviness.step()
            + self.weights.interest * matches as f64
            + self.weights.affinity * price_affinity(persona.income_level, &words)
    }
}

impl FallbackScorer for DefaultFallbackScorer {
    fn score(
        &self,
        persona: &PersonaRecord,
        content: &ContentItem,
        scale: RatingScale,
        rng: &mut dyn RngCore,
    ) -> u8 {
        let jitter = if self.weights.jitter > 0.0 && self.weights.jitter.is_finite() {
            rng.gen_range(-self.weights.jitter..=self.weights.jitter)
        } else {
            0.0
        };

        let score = self.base_score(persona, content, scale) + jitter;
        let score = if score.is_finite() { score } else { scale.midpoint() };
        let (rating, _) = scale.clamp_round(score);
        rating
    }
}

/// +1 for a matching price tier, -1 for a clear mismatch, 0 otherwise.
fn price_affinity(income: IncomeLevel, words: &HashSet<String>) -> f64 {
    let premium = PREMIUM_WORDS.iter().any(|w| words.contains(*w));
    let budget = BUDGET_WORDS.iter().any(|w| words.contains(*w));

    match income {
        IncomeLevel::High if premium => 1.0,
        IncomeLevel::Low if budget => 1.0,
        IncomeLevel::Low if premium => -1.0,
        _ => 0.0,
    }
}

fn content_words(content: &ContentItem) -> HashSet<String> {
    content
        .title
        .split(|c: char| !c.is_alphanumeric())
        .chain(content.body.split(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Every word of a (possibly multi-word) interest appears in the content.
fn mentions(words: &HashSet<String>, interest: &str) -> bool {
    let mut parts = interest
        .split(|c: char| !c.is_alphanumeric())
        .filter(|p| !p.is_empty())
        .peekable();
    parts.peek().is_some() && parts.all(|p| words.contains(&p.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{Occupation, ShoppingBehavior, TechSavviness};

    fn persona(income: IncomeLevel, tech: TechSavviness, interests: &[&str]) -> PersonaRecord {
        PersonaRecord {
            id: "persona-0001".into(),
            name: "User_0001".into(),
            age: 40,
            occupation: Occupation::Teacher,
            income_level: income,
            interests: interests.iter().map(|s| s.to_string()).collect(),
            personality_traits: vec![],
            tech_savviness: tech,
            shopping_behavior: ShoppingBehavior::BrandLoyal,
        }
    }

    fn no_jitter() -> DefaultFallbackScorer {
        DefaultFallbackScorer::new(FallbackWeights {
            jitter: 0.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_neutral_pair_scores_midpoint() {
        let p = persona(IncomeLevel::Medium, TechSavviness::Medium, &["Gardening"]);
        let ad = ContentItem::new("A", "Shoes", "Comfortable running shoes.");
        let scale = RatingScale::default();
        assert_eq!(no_jitter().base_score(&p, &ad, scale), 5.5);
    }

    #[test]
    fn test_affinity_and_interests_raise_score() {
        let scale = RatingScale::default();
        let luxury = ContentItem::new("C", "Luxury Health Monitor", "Premium fitness tracking.");

        let rich_fan = persona(IncomeLevel::High, TechSavviness::High, &["Fitness", "Health"]);
        let poor_skeptic = persona(IncomeLevel::Low, TechSavviness::Low, &["Gardening"]);

        let scorer = no_jitter();
        let high = scorer.base_score(&rich_fan, &luxury, scale);
        let low = scorer.base_score(&poor_skeptic, &luxury, scale);
        // 5.5 + 0.5 + 2 * 0.75 + 1.5
        assert_eq!(high, 9.0);
        // 5.5 - 0.5 - 1.5
        assert_eq!(low, 3.5);
    }

    #[test]
    fn test_budget_affinity_for_low_income() {
        let scale = RatingScale::default();
        let budget = ContentItem::new("B", "Budget Fitness Watch", "Affordable health tracking.");
        let p = persona(IncomeLevel::Low, TechSavviness::Medium, &["Cars"]);
        assert_eq!(no_jitter().base_score(&p, &budget, scale), 7.0);
    }

    #[test]
    fn test_multi_word_interest_and_substrings() {
        let words = content_words(&ContentItem::new("X", "Smart watch", "Share on social media."));
        assert!(mentions(&words, "Social Media"));
        // "Art" must not match inside "Smart"
        assert!(!mentions(&words, "Art"));
    }

    #[test]
    fn test_score_stays_in_scale() {
        let scorer = DefaultFallbackScorer::new(FallbackWeights {
            jitter: 50.0,
            ..Default::default()
        });
        let p = persona(IncomeLevel::High, TechSavviness::High, &["Fitness"]);
        let ad = ContentItem::new("A", "Premium", "Fitness");
        let scale = RatingScale::default();
        for i in 0..100 {
            let mut rng = pair_rng(i, "p", "c");
            let r = scorer.score(&p, &ad, scale, &mut rng);
            assert!(scale.contains(r));
        }
    }

    #[test]
    fn test_non_finite_weights_fall_back_to_midpoint() {
        let scorer = DefaultFallbackScorer::new(FallbackWeights {
            tech: f64::NAN,
            jitter: f64::INFINITY,
            ..Default::default()
        });
        let p = persona(IncomeLevel::Medium, TechSavviness::High, &[]);
        let ad = ContentItem::new("A", "Shoes", "Running shoes.");
        let mut rng = pair_rng(1, "p", "c");
        assert_eq!(scorer.score(&p, &ad, RatingScale::default(), &mut rng), 6);
    }

    #[test]
    fn test_pair_rng_is_deterministic() {
        let a: u64 = pair_rng(42, "persona-0001", "Ad_A").gen();
        let b: u64 = pair_rng(42, "persona-0001", "Ad_A").gen();
        let c: u64 = pair_rng(42, "persona-0001", "Ad_B").gen();
        let d: u64 = pair_rng(43, "persona-0001", "Ad_A").gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
