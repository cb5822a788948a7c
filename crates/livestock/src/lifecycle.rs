//! Report cleanup after an animal is deleted.
//!
//! There is no referential-integrity engine between animals and reports, so
//! deleting an animal must sweep the owner's reports explicitly: detach the
//! animal from every report naming it, then drop reports left empty. Storage
//! implementations run this sweep in the same atomic unit as the deletion.

use serde::{Deserialize, Serialize};

use herdbook_core::{AnimalId, OwnerId, ReportName};

use crate::report::ReportRecord;

/// What the sweep did to an owner's reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeOutcome {
    /// Reports that lost the animal but still hold other animals.
    pub updated_reports: Vec<ReportName>,
    /// Reports that ended up empty and must be deleted.
    pub deleted_reports: Vec<ReportName>,
}

/// Detach `animal_id` from every report of `owner_id`.
///
/// Reports belonging to other owners are skipped. The caller must persist the
/// reports listed in `updated_reports` and delete those in `deleted_reports`.
pub fn detach_animal_from_reports<'a>(
    owner_id: OwnerId,
    animal_id: &AnimalId,
    reports: impl IntoIterator<Item = &'a mut ReportRecord>,
) -> CascadeOutcome {
    let mut outcome = CascadeOutcome::default();

    for report in reports {
        if report.owner_id != owner_id {
            continue;
        }
        let touched = report.detach_animal(animal_id);
        if report.is_empty() {
            outcome.deleted_reports.push(report.report_name.clone());
        } else if touched {
            outcome.updated_reports.push(report.report_name.clone());
        }
    }

    outcome.updated_reports.sort();
    outcome.deleted_reports.sort();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::AnimalReportEntry;
    use chrono::Utc;

    fn entry(id: &str) -> AnimalReportEntry {
        AnimalReportEntry {
            animal_id: AnimalId::parse(id).unwrap(),
            recorded_weights: vec![],
            average_daily_gain: None,
        }
    }

    fn report(owner: OwnerId, name: &str, animals: &[&str]) -> ReportRecord {
        let now = Utc::now();
        let name = ReportName::parse(name).unwrap();
        let mut r = ReportRecord::new(owner, name, entry(animals[0]), now);
        for a in &animals[1..] {
            r.merge_entry(entry(a), now);
        }
        r
    }

    #[test]
    fn detaches_and_flags_emptied_reports() {
        let owner = OwnerId::new();
        let mut reports = vec![
            report(owner, "solo", &["cow-1"]),
            report(owner, "pair", &["cow-1", "cow-2"]),
            report(owner, "other", &["cow-3"]),
        ];

        let cow = AnimalId::parse("cow-1").unwrap();
        let outcome = detach_animal_from_reports(owner, &cow, reports.iter_mut());

        assert_eq!(outcome.deleted_reports, vec![ReportName::parse("solo").unwrap()]);
        assert_eq!(outcome.updated_reports, vec![ReportName::parse("pair").unwrap()]);
        assert!(reports.iter().all(ReportRecord::is_consistent));
        assert_eq!(reports[1].results.len(), 1);
        assert_eq!(reports[2].results.len(), 1);
    }

    #[test]
    fn other_owners_are_untouched() {
        let owner = OwnerId::new();
        let stranger = OwnerId::new();
        let mut reports = vec![report(stranger, "theirs", &["cow-1"])];

        let cow = AnimalId::parse("cow-1").unwrap();
        let outcome = detach_animal_from_reports(owner, &cow, reports.iter_mut());

        assert_eq!(outcome, CascadeOutcome::default());
        assert_eq!(reports[0].target_animals.len(), 1);
    }
}
