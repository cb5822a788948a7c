//! `herdbook-ai`
//!
//! **Responsibility:** AI classification boundary.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It reads reports but never mutates or persists them.
//! - Remote output is untrusted text until [`validate_response`] accepts it.
//! - The remote model is reached only through the [`TextGenerator`] contract.

pub mod classification;
pub mod generator;
pub mod prompt;
pub mod result;

pub use classification::{
    ClassificationOutcome, Coverage, PerformanceClassification, ValidatedSummary, strip_delimiters,
    validate_response,
};
pub use generator::{ChatCompletionsGenerator, TextGenerator};
pub use prompt::build_prompt;
pub use result::AiError;
