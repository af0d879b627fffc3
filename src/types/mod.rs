//! Type definitions for avatar-survey
//!
//! Content items under test, per-pair evaluation results, and the
//! completion request/response types spoken by every backend.

mod completion;
mod content;
mod evaluation;

pub use completion::*;
pub use content::*;
pub use evaluation::*;
