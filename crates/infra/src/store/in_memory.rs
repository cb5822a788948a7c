use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use herdbook_core::{AnimalId, DomainError, Entity, OwnerId, ReportName};
use herdbook_livestock::{
    AnimalRecord, AnimalReportEntry, CascadeOutcome, ReportRecord, WeightObservation,
    detach_animal_from_reports,
};

use super::{AnimalStore, HerdStore, ReportStore, StoreError};

#[derive(Debug, Default)]
struct HerdState {
    animals: HashMap<(OwnerId, AnimalId), AnimalRecord>,
    reports: HashMap<(OwnerId, ReportName), ReportRecord>,
}

/// In-memory owner-isolated store for tests/dev.
///
/// A single lock guards animals and reports together, so each operation
/// (including the deletion cascade) is applied atomically.
#[derive(Debug, Default)]
pub struct InMemoryHerdStore {
    inner: RwLock<HerdState>,
}

impl InMemoryHerdStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HerdState>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HerdState>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn key_of<E>(entity: &E) -> (OwnerId, E::Id)
where
    E: Entity,
    E::Id: Clone,
{
    (entity.owner(), entity.id().clone())
}

fn report_not_found(report_name: &ReportName) -> StoreError {
    DomainError::not_found(format!("report '{report_name}'")).into()
}

fn animal_not_found(animal_id: &AnimalId) -> StoreError {
    DomainError::not_found(format!("animal '{animal_id}'")).into()
}

#[async_trait]
impl AnimalStore for InMemoryHerdStore {
    async fn get_animal(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
    ) -> Result<Option<AnimalRecord>, StoreError> {
        let state = self.read()?;
        Ok(state.animals.get(&(owner_id, animal_id.clone())).cloned())
    }

    async fn list_animals(&self, owner_id: OwnerId) -> Result<Vec<AnimalRecord>, StoreError> {
        let state = self.read()?;
        let mut animals: Vec<AnimalRecord> = state
            .animals
            .iter()
            .filter_map(|((o, _), a)| if *o == owner_id { Some(a.clone()) } else { None })
            .collect();
        animals.sort_by(|a, b| a.animal_id.cmp(&b.animal_id));
        Ok(animals)
    }

    async fn append_observation(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
        observation: WeightObservation,
    ) -> Result<AnimalRecord, StoreError> {
        let mut state = self.write()?;
        let record = state
            .animals
            .entry((owner_id, animal_id.clone()))
            .or_insert_with(|| AnimalRecord::empty(owner_id, animal_id.clone()));
        record.record(observation);
        Ok(record.clone())
    }

    async fn remove_observations_at(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
        date: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut state = self.write()?;
        let record = state
            .animals
            .get_mut(&(owner_id, animal_id.clone()))
            .ok_or_else(|| animal_not_found(animal_id))?;
        Ok(record.remove_observations_at(date)?)
    }
}

#[async_trait]
impl ReportStore for InMemoryHerdStore {
    async fn get_report(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
    ) -> Result<Option<ReportRecord>, StoreError> {
        let state = self.read()?;
        Ok(state.reports.get(&(owner_id, report_name.clone())).cloned())
    }

    async fn list_reports(&self, owner_id: OwnerId) -> Result<Vec<ReportRecord>, StoreError> {
        let state = self.read()?;
        let mut reports: Vec<ReportRecord> = state
            .reports
            .iter()
            .filter_map(|((o, _), r)| if *o == owner_id { Some(r.clone()) } else { None })
            .collect();
        reports.sort_by(|a, b| a.report_name.cmp(&b.report_name));
        Ok(reports)
    }

    async fn merge_report_entry(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
        entry: AnimalReportEntry,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportRecord, StoreError> {
        let mut state = self.write()?;
        if !state.animals.contains_key(&(owner_id, entry.animal_id.clone())) {
            return Err(animal_not_found(&entry.animal_id));
        }

        let report = match state.reports.get_mut(&(owner_id, report_name.clone())) {
            Some(existing) => {
                existing.merge_entry(entry, generated_at);
                existing.clone()
            }
            None => {
                let created = ReportRecord::new(owner_id, report_name.clone(), entry, generated_at);
                state.reports.insert(key_of(&created), created.clone());
                created
            }
        };
        Ok(report)
    }

    async fn rename_report(
        &self,
        owner_id: OwnerId,
        old_name: &ReportName,
        new_name: &ReportName,
    ) -> Result<ReportRecord, StoreError> {
        let mut state = self.write()?;
        let old_key = (owner_id, old_name.clone());

        if !state.reports.contains_key(&old_key) {
            return Err(report_not_found(old_name));
        }
        if state.reports.contains_key(&(owner_id, new_name.clone())) {
            return Err(DomainError::conflict(format!("report '{new_name}' already exists")).into());
        }

        let mut report = state
            .reports
            .remove(&old_key)
            .ok_or_else(|| report_not_found(old_name))?;
        report.report_name = new_name.clone();
        state.reports.insert(key_of(&report), report.clone());
        Ok(report)
    }

    async fn delete_report(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state
            .reports
            .remove(&(owner_id, report_name.clone()))
            .map(|_| ())
            .ok_or_else(|| report_not_found(report_name))
    }

    async fn store_summary(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
        revision: u64,
        summary: &str,
    ) -> Result<ReportRecord, StoreError> {
        let mut state = self.write()?;
        let report = state
            .reports
            .get_mut(&(owner_id, report_name.clone()))
            .ok_or_else(|| report_not_found(report_name))?;
        report.store_summary(revision, summary)?;
        Ok(report.clone())
    }
}

#[async_trait]
impl HerdStore for InMemoryHerdStore {
    async fn delete_animal_cascade(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
    ) -> Result<CascadeOutcome, StoreError> {
        let mut state = self.write()?;

        if state.animals.remove(&(owner_id, animal_id.clone())).is_none() {
            return Err(animal_not_found(animal_id));
        }

        let outcome = detach_animal_from_reports(owner_id, animal_id, state.reports.values_mut());
        for name in &outcome.deleted_reports {
            state.reports.remove(&(owner_id, name.clone()));
        }

        Ok(outcome)
    }
}
