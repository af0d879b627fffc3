//! Persona system: synthetic survey respondents.
//!
//! Personas are either sampled by a seeded [`PersonaFactory`] or loaded from
//! a JSON file previously written by `avatar-survey personas`.

pub mod factory;
pub mod store;
pub mod types;

pub use factory::{DemographicFilter, PersonaFactory};
pub use store::{load_personas, save_personas};
pub use types::{
    age_bracket, AgeRange, IncomeLevel, Occupation, PersonaRecord, ShoppingBehavior,
    TechSavviness, INTEREST_POOL, TRAIT_POOL,
};
