use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herdbook_core::{AnimalId, DomainError, DomainResult, Entity, OwnerId};

use crate::observation::WeightObservation;

/// Weight ledger of one animal within one owner's scope.
///
/// Storage order of `weight_observations` is insertion order; callers that
/// compute over the series must sort by date first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalRecord {
    pub owner_id: OwnerId,
    pub animal_id: AnimalId,
    pub weight_observations: Vec<WeightObservation>,
}

impl Entity for AnimalRecord {
    type Id = AnimalId;

    fn owner(&self) -> OwnerId {
        self.owner_id
    }

    fn id(&self) -> &Self::Id {
        &self.animal_id
    }
}

impl AnimalRecord {
    /// A record with no observations yet (first write creates it).
    pub fn empty(owner_id: OwnerId, animal_id: AnimalId) -> Self {
        Self {
            owner_id,
            animal_id,
            weight_observations: Vec::new(),
        }
    }

    pub fn record(&mut self, observation: WeightObservation) {
        self.weight_observations.push(observation);
    }

    /// Remove every observation whose date equals `date` exactly.
    ///
    /// Matching is on the full timestamp, not the calendar day, and all
    /// matches go regardless of weight or notes. Returns how many were removed.
    pub fn remove_observations_at(&mut self, date: DateTime<Utc>) -> DomainResult<usize> {
        let before = self.weight_observations.len();
        self.weight_observations.retain(|o| o.date != date);
        let removed = before - self.weight_observations.len();

        if removed == 0 {
            return Err(DomainError::not_found(format!(
                "no weight observation for animal '{}' at {}",
                self.animal_id,
                date.to_rfc3339()
            )));
        }
        Ok(removed)
    }

    /// Observations sorted ascending by date (stable for same-date entries).
    pub fn observations_by_date(&self) -> Vec<WeightObservation> {
        let mut sorted = self.weight_observations.clone();
        sorted.sort_by_key(|o| o.date);
        sorted
    }
}
