use std::sync::Arc;

use tracing::info;

use herdbook_core::{AnimalId, DomainError, OwnerId};
use herdbook_livestock::{AnimalRecord, CascadeOutcome, WeightObservation, parse_date};

use super::ServiceError;
use crate::store::HerdStore;

/// Per-owner weight observations for each animal.
pub struct WeightLedger<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for WeightLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: HerdStore + ?Sized> WeightLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Append an observation, creating the animal on its first weight.
    pub async fn record_observation(
        &self,
        owner_id: OwnerId,
        animal_id: &str,
        date: &str,
        weight: f64,
        notes: &str,
    ) -> Result<AnimalRecord, ServiceError> {
        let animal_id = AnimalId::parse(animal_id)?;
        let observation = WeightObservation::new(parse_date(date)?, weight, notes)?;
        let observed_on = observation.date;

        let record = self
            .store
            .append_observation(owner_id, &animal_id, observation)
            .await?;

        info!(
            owner_id = %owner_id,
            animal_id = %animal_id,
            date = %observed_on,
            weight,
            observation_count = record.weight_observations.len(),
            "weight observation recorded"
        );
        Ok(record)
    }

    /// Remove every observation dated exactly `date`.
    pub async fn remove_observation(
        &self,
        owner_id: OwnerId,
        animal_id: &str,
        date: &str,
    ) -> Result<usize, ServiceError> {
        let animal_id = AnimalId::parse(animal_id)?;
        let date = parse_date(date)?;

        let removed = self
            .store
            .remove_observations_at(owner_id, &animal_id, date)
            .await?;

        info!(
            owner_id = %owner_id,
            animal_id = %animal_id,
            date = %date,
            removed,
            "weight observations removed"
        );
        Ok(removed)
    }

    /// Delete the animal and detach it from every report of the owner.
    ///
    /// Returns only after the cascade has been committed together with the
    /// deletion.
    pub async fn delete_animal(
        &self,
        owner_id: OwnerId,
        animal_id: &str,
    ) -> Result<CascadeOutcome, ServiceError> {
        let animal_id = AnimalId::parse(animal_id)?;
        let outcome = self.store.delete_animal_cascade(owner_id, &animal_id).await?;

        info!(
            owner_id = %owner_id,
            animal_id = %animal_id,
            updated_reports = outcome.updated_reports.len(),
            deleted_reports = outcome.deleted_reports.len(),
            "animal deleted"
        );
        Ok(outcome)
    }

    /// Observations of an animal, oldest first.
    pub async fn observations(
        &self,
        owner_id: OwnerId,
        animal_id: &str,
    ) -> Result<Vec<WeightObservation>, ServiceError> {
        let animal_id = AnimalId::parse(animal_id)?;
        let record = self
            .store
            .get_animal(owner_id, &animal_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("animal '{animal_id}'")))?;
        Ok(record.observations_by_date())
    }

    pub async fn exists(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
    ) -> Result<bool, ServiceError> {
        Ok(self.store.exists(owner_id, animal_id).await?)
    }
}
