//! Owner-isolated storage for animals and reports.
//!
//! Every operation that changes a document is a single atomic step in the
//! backing engine (native upsert, or a row-locked transaction). Nothing here
//! reads a document, lets the caller change it, and blindly writes it back.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use herdbook_core::{AnimalId, DomainError, OwnerId, ReportName};
use herdbook_livestock::{
    AnimalRecord, AnimalReportEntry, CascadeOutcome, ReportRecord, WeightObservation,
};

pub use in_memory::InMemoryHerdStore;
pub use postgres::PostgresHerdStore;

/// Storage operation error.
///
/// Domain rule violations detected inside an atomic update (missing record,
/// name collision, stale summary) come back as `Domain` so callers keep the
/// domain taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("stored document could not be decoded: {0}")]
    Serialization(String),
}

/// Per-owner animal weight ledgers.
#[async_trait]
pub trait AnimalStore: Send + Sync {
    async fn get_animal(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
    ) -> Result<Option<AnimalRecord>, StoreError>;

    async fn list_animals(&self, owner_id: OwnerId) -> Result<Vec<AnimalRecord>, StoreError>;

    /// Create the animal if absent, then append the observation.
    async fn append_observation(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
        observation: WeightObservation,
    ) -> Result<AnimalRecord, StoreError>;

    /// Remove every observation dated exactly `date`; returns the count.
    ///
    /// `NotFound` if the animal is absent or nothing matches.
    async fn remove_observations_at(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
        date: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    async fn exists(&self, owner_id: OwnerId, animal_id: &AnimalId) -> Result<bool, StoreError> {
        Ok(self.get_animal(owner_id, animal_id).await?.is_some())
    }
}

/// Named, per-owner growth reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn get_report(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
    ) -> Result<Option<ReportRecord>, StoreError>;

    /// All reports of an owner, sorted by name.
    async fn list_reports(&self, owner_id: OwnerId) -> Result<Vec<ReportRecord>, StoreError>;

    /// Create the report with this single entry, or insert-or-replace the
    /// entry in the existing report.
    ///
    /// `NotFound` if the entry's animal does not exist for the owner. The check
    /// is part of the same atomic unit as the merge, so a report can never
    /// pick up an animal whose deletion has already been committed.
    async fn merge_report_entry(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
        entry: AnimalReportEntry,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportRecord, StoreError>;

    /// `NotFound` if `old_name` is absent, `Conflict` if `new_name` is taken.
    async fn rename_report(
        &self,
        owner_id: OwnerId,
        old_name: &ReportName,
        new_name: &ReportName,
    ) -> Result<ReportRecord, StoreError>;

    async fn delete_report(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
    ) -> Result<(), StoreError>;

    /// Persist a classification computed from the report at `revision`.
    ///
    /// `Conflict` if the report's results have changed since.
    async fn store_summary(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
        revision: u64,
        summary: &str,
    ) -> Result<ReportRecord, StoreError>;
}

/// Combined store able to delete an animal and sweep its reports atomically.
#[async_trait]
pub trait HerdStore: AnimalStore + ReportStore {
    /// Delete the animal and detach it from the owner's reports in one unit.
    ///
    /// Either both happen or neither does. `NotFound` if the animal is absent.
    async fn delete_animal_cascade(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
    ) -> Result<CascadeOutcome, StoreError>;
}
