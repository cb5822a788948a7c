use serde::{Deserialize, Serialize};
use thiserror::Error;

use herdbook_ai::AiError;
use herdbook_core::DomainError;

use crate::store::StoreError;

/// Stable failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    InvalidUpstreamResponse,
    UpstreamUnavailable,
    StorageFailure,
}

/// Error returned by every application service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(DomainError),

    #[error(transparent)]
    Storage(StoreError),

    #[error(transparent)]
    Upstream(AiError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Domain(DomainError::InvalidInput(_)) => ErrorKind::InvalidInput,
            ServiceError::Domain(DomainError::NotFound(_)) => ErrorKind::NotFound,
            ServiceError::Domain(DomainError::Conflict(_)) => ErrorKind::Conflict,
            ServiceError::Domain(DomainError::InvalidUpstreamResponse(_)) => {
                ErrorKind::InvalidUpstreamResponse
            }
            ServiceError::Storage(_) => ErrorKind::StorageFailure,
            ServiceError::Upstream(AiError::InvalidInput(_)) => ErrorKind::InvalidInput,
            ServiceError::Upstream(AiError::InvalidResponse(_)) => {
                ErrorKind::InvalidUpstreamResponse
            }
            ServiceError::Upstream(AiError::Unavailable(_) | AiError::Timeout(_)) => {
                ErrorKind::UpstreamUnavailable
            }
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        ServiceError::Domain(err)
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(domain) => ServiceError::Domain(domain),
            other => ServiceError::Storage(other),
        }
    }
}

impl From<AiError> for ServiceError {
    fn from(err: AiError) -> Self {
        ServiceError::Upstream(err)
    }
}
