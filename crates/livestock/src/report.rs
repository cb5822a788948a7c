use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herdbook_core::{AnimalId, DomainError, DomainResult, Entity, OwnerId, ReportName};

use crate::growth::GrowthSummary;
use crate::observation::RecordedWeight;

/// One animal's growth figures inside a report.
///
/// Entries are replaced wholesale on every regeneration, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalReportEntry {
    pub animal_id: AnimalId,
    pub recorded_weights: Vec<RecordedWeight>,
    pub average_daily_gain: Option<f64>,
}

impl AnimalReportEntry {
    pub fn from_growth(animal_id: AnimalId, growth: GrowthSummary) -> Self {
        Self {
            animal_id,
            recorded_weights: growth.recorded_weights,
            average_daily_gain: growth.average_daily_gain,
        }
    }
}

/// Named, owner-scoped performance report.
///
/// Invariant: `target_animals` and the animal ids in `results` are the same
/// set. Every mutator below keeps them in lockstep.
///
/// `revision` increases on every change to the results and is what a pending
/// classification is checked against; `date_generated` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub owner_id: OwnerId,
    pub report_name: ReportName,
    pub date_generated: DateTime<Utc>,
    pub target_animals: BTreeSet<AnimalId>,
    pub results: Vec<AnimalReportEntry>,
    #[serde(default)]
    pub revision: u64,
    /// Cached classification document; empty until classification runs.
    #[serde(default)]
    pub ai_generated_summary: String,
}

impl Entity for ReportRecord {
    type Id = ReportName;

    fn owner(&self) -> OwnerId {
        self.owner_id
    }

    fn id(&self) -> &Self::Id {
        &self.report_name
    }
}

impl ReportRecord {
    /// First generation of a report: a single animal, no summary yet.
    pub fn new(
        owner_id: OwnerId,
        report_name: ReportName,
        entry: AnimalReportEntry,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut target_animals = BTreeSet::new();
        target_animals.insert(entry.animal_id.clone());
        Self {
            owner_id,
            report_name,
            date_generated: generated_at,
            target_animals,
            results: vec![entry],
            revision: 1,
            ai_generated_summary: String::new(),
        }
    }

    /// Insert-or-replace the entry for `entry.animal_id`.
    ///
    /// Other animals' entries are untouched. `date_generated` is stamped and the
    /// cached summary is cleared since it no longer describes the results.
    pub fn merge_entry(&mut self, entry: AnimalReportEntry, generated_at: DateTime<Utc>) {
        self.target_animals.insert(entry.animal_id.clone());
        match self.results.iter().position(|e| e.animal_id == entry.animal_id) {
            Some(idx) => self.results[idx] = entry,
            None => self.results.push(entry),
        }
        self.date_generated = generated_at;
        self.revision += 1;
        self.ai_generated_summary.clear();
    }

    /// Remove an animal from both the target set and the results.
    ///
    /// Returns `true` if the animal was part of the report.
    pub fn detach_animal(&mut self, animal_id: &AnimalId) -> bool {
        let was_target = self.target_animals.remove(animal_id);
        let before = self.results.len();
        self.results.retain(|e| &e.animal_id != animal_id);
        let touched = was_target || self.results.len() != before;
        if touched {
            self.revision += 1;
        }
        touched
    }

    pub fn is_empty(&self) -> bool {
        self.target_animals.is_empty() || self.results.is_empty()
    }

    pub fn entry(&self, animal_id: &AnimalId) -> Option<&AnimalReportEntry> {
        self.results.iter().find(|e| &e.animal_id == animal_id)
    }

    /// Whether `target_animals` equals the animal set of `results` with no
    /// duplicate entries.
    pub fn is_consistent(&self) -> bool {
        let result_ids: BTreeSet<&AnimalId> = self.results.iter().map(|e| &e.animal_id).collect();
        result_ids.len() == self.results.len()
            && result_ids.len() == self.target_animals.len()
            && self.target_animals.iter().all(|a| result_ids.contains(a))
    }

    pub fn has_summary(&self) -> bool {
        !self.ai_generated_summary.is_empty()
    }

    /// Store a classification computed from the report at `revision`.
    ///
    /// Fails with `Conflict` if the results changed since, so a summary never
    /// describes data it did not see.
    pub fn store_summary(&mut self, revision: u64, summary: impl Into<String>) -> DomainResult<()> {
        if self.revision != revision {
            return Err(DomainError::conflict(format!(
                "report '{}' was regenerated while it was being classified",
                self.report_name
            )));
        }
        self.ai_generated_summary = summary.into();
        Ok(())
    }
}
