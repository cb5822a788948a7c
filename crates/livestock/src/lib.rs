//! Livestock domain module.
//!
//! This crate contains the business rules for weight tracking and growth
//! reporting, implemented purely as deterministic domain logic (no IO, no
//! storage, no remote calls).

pub mod animal;
pub mod growth;
pub mod lifecycle;
pub mod observation;
pub mod report;

pub use animal::AnimalRecord;
pub use growth::{DateRange, GrowthSummary, compute_growth};
pub use lifecycle::{CascadeOutcome, detach_animal_from_reports};
pub use observation::{RecordedWeight, WeightObservation, parse_date};
pub use report::{AnimalReportEntry, ReportRecord};
