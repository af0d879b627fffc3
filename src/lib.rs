//! Avatar Survey - simulated advertisement surveys.
//!
//! Synthetic personas rate content items through a completion backend;
//! results are aggregated into per-item statistics and a winner.
//!
//! ```no_run
//! use std::sync::Arc;
//! use avatar_survey::backend::MockBackend;
//! use avatar_survey::evaluator::{Evaluator, EvaluatorOptions};
//! use avatar_survey::persona::PersonaFactory;
//! use avatar_survey::rating::RatingScale;
//! use avatar_survey::survey::SurveyRunner;
//! use avatar_survey::types::ContentSet;
//!
//! # async fn demo() -> avatar_survey::Result<()> {
//! let personas = PersonaFactory::seeded(42).generate_random(5)?;
//! let ads = ContentSet::samples()?;
//! let evaluator = Evaluator::new(
//!     Arc::new(MockBackend::new()),
//!     RatingScale::default(),
//!     EvaluatorOptions::default(),
//! )?;
//! let run = SurveyRunner::new(Arc::new(evaluator), 4)
//!     .run_comparison(&ads.items, &personas, ads.context.as_deref())
//!     .await?;
//! println!("{:?}", run.summary.winner);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod logging;
pub mod persona;
pub mod prompt;
pub mod rating;
pub mod survey;
pub mod types;
pub mod version;

pub use error::{Error, Result};
