//! Backend module for text completion
//!
//! This module provides the capability interface for the external
//! completion service and its implementations.

mod factory;
mod mock;
mod openai;
mod traits;

pub use factory::BackendFactory;
pub use mock::{MockBackend, MockConfig};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use traits::*;
