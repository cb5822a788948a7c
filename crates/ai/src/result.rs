use std::time::Duration;

use thiserror::Error;

/// Failure talking to, or trusting, the remote text-generation capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AiError {
    #[error("invalid classification input: {0}")]
    InvalidInput(String),

    #[error("text generation unavailable: {0}")]
    Unavailable(String),

    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid classification response: {0}")]
    InvalidResponse(String),
}
