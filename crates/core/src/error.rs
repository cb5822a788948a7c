//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing records, naming conflicts, rejected upstream documents). Storage and
/// transport failures belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed dates, weights, ranges or missing identifiers.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The owner + identifier combination does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness rule was violated (e.g. rename collision).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A structured document from an external capability failed validation.
    #[error("invalid upstream response: {0}")]
    InvalidUpstreamResponse(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_upstream(msg: impl Into<String>) -> Self {
        Self::InvalidUpstreamResponse(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_and_detail() {
        let err = DomainError::not_found("animal 'A-17'");
        assert_eq!(err.to_string(), "not found: animal 'A-17'");

        let err = DomainError::invalid_upstream("missing field `insights`");
        assert!(err.to_string().starts_with("invalid upstream response"));
    }
}
