//! Application services: input parsing, orchestration and logging on top of
//! the domain crates and a [`HerdStore`](crate::store::HerdStore).

pub mod classifier;
pub mod error;
pub mod reports;
pub mod weight_ledger;

pub use classifier::AiClassifier;
pub use error::{ErrorKind, ServiceError};
pub use reports::ReportService;
pub use weight_ledger::WeightLedger;

#[cfg(test)]
pub(crate) mod test_support;
