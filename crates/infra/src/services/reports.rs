use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tracing::info;

use herdbook_core::{AnimalId, DomainError, OwnerId, ReportName};
use herdbook_livestock::{AnimalReportEntry, DateRange, ReportRecord, compute_growth, parse_date};

use super::ServiceError;
use crate::store::HerdStore;

/// Named growth reports: generation, rename, deletion and reads.
pub struct ReportService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ReportService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: HerdStore + ?Sized> ReportService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Compute one animal's growth over the range and merge it into the
    /// named report, creating the report on first use.
    pub async fn generate_report(
        &self,
        owner_id: OwnerId,
        animal_id: &str,
        range_start: &str,
        range_end: &str,
        report_name: &str,
    ) -> Result<ReportRecord, ServiceError> {
        let animal_id = AnimalId::parse(animal_id)?;
        let report_name = ReportName::parse(report_name)?;
        let range = DateRange::new(parse_date(range_start)?, parse_date(range_end)?)?;

        let animal = self
            .store
            .get_animal(owner_id, &animal_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("animal '{animal_id}'")))?;

        let growth = compute_growth(&animal.weight_observations, &range);
        let entry = AnimalReportEntry::from_growth(animal_id.clone(), growth);

        // Postgres keeps microseconds; stamp at that precision so reads agree.
        let generated_at = Utc::now().trunc_subsecs(6);
        let report = self
            .store
            .merge_report_entry(owner_id, &report_name, entry, generated_at)
            .await?;

        info!(
            owner_id = %owner_id,
            report_name = %report_name,
            animal_id = %animal_id,
            animal_count = report.target_animals.len(),
            "report generated"
        );
        Ok(report)
    }

    pub async fn rename_report(
        &self,
        owner_id: OwnerId,
        old_name: &str,
        new_name: &str,
    ) -> Result<ReportRecord, ServiceError> {
        let old_name = ReportName::parse(old_name)?;
        let new_name = ReportName::parse(new_name)?;
        if old_name == new_name {
            return Err(DomainError::invalid_input(format!(
                "report '{old_name}' cannot be renamed to itself"
            ))
            .into());
        }

        let report = self.store.rename_report(owner_id, &old_name, &new_name).await?;

        info!(owner_id = %owner_id, old_name = %old_name, new_name = %new_name, "report renamed");
        Ok(report)
    }

    pub async fn delete_report(
        &self,
        owner_id: OwnerId,
        report_name: &str,
    ) -> Result<(), ServiceError> {
        let report_name = ReportName::parse(report_name)?;
        self.store.delete_report(owner_id, &report_name).await?;

        info!(owner_id = %owner_id, report_name = %report_name, "report deleted");
        Ok(())
    }

    pub async fn get_report(
        &self,
        owner_id: OwnerId,
        report_name: &str,
    ) -> Result<ReportRecord, ServiceError> {
        let report_name = ReportName::parse(report_name)?;
        self.store
            .get_report(owner_id, &report_name)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("report '{report_name}'")).into())
    }

    pub async fn list_reports(&self, owner_id: OwnerId) -> Result<Vec<ReportRecord>, ServiceError> {
        Ok(self.store.list_reports(owner_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use herdbook_livestock::{AnimalRecord, CascadeOutcome, WeightObservation};

    use crate::services::test_support::{owner, store};
    use crate::services::{ErrorKind, WeightLedger};
    use crate::store::{AnimalStore, InMemoryHerdStore, ReportStore, StoreError};

    async fn seeded() -> (Arc<InMemoryHerdStore>, OwnerId) {
        let (store, owner) = (store(), owner());
        let ledger = WeightLedger::new(Arc::clone(&store));
        for (animal, day, weight) in [
            ("cow-1", "2024-01-01", 50.0),
            ("cow-1", "2024-01-10", 60.0),
            ("cow-1", "2024-01-20", 70.0),
            ("cow-2", "2024-01-01", 80.0),
        ] {
            ledger.record_observation(owner, animal, day, weight, "").await.unwrap();
        }
        (store, owner)
    }

    fn animal(id: &str) -> AnimalId {
        AnimalId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn two_animals_merge_then_replace() {
        let (store, owner) = seeded().await;
        let reports = ReportService::new(Arc::clone(&store));

        reports
            .generate_report(owner, "cow-1", "2024-01-01", "2024-01-20", "Q1")
            .await
            .unwrap();
        let report = reports
            .generate_report(owner, "cow-2", "2024-01-01", "2024-01-20", "Q1")
            .await
            .unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.target_animals.len(), 2);

        let first = report.entry(&animal("cow-1")).unwrap().clone();
        assert!((first.average_daily_gain.unwrap() - 20.0 / 19.0).abs() < 1e-9);
        let second = report.entry(&animal("cow-2")).unwrap().clone();
        assert_eq!(second.average_daily_gain, None);

        let report = reports
            .generate_report(owner, "cow-1", "2024-01-01", "2024-01-02", "Q1")
            .await
            .unwrap();
        assert_eq!(report.results.len(), 2);
        let replaced = report.entry(&animal("cow-1")).unwrap();
        assert_eq!(replaced.recorded_weights.len(), 1);
        assert_eq!(replaced.average_daily_gain, None);
        assert_eq!(report.entry(&animal("cow-2")), Some(&second));
        assert!(report.is_consistent());
    }

    #[tokio::test]
    async fn generation_rejects_bad_range_and_unknown_animal() {
        let (store, owner) = seeded().await;
        let reports = ReportService::new(store);

        let err = reports
            .generate_report(owner, "cow-1", "2024-02-01", "2024-01-01", "Q1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = reports
            .generate_report(owner, "cow-1", "yesterday", "2024-01-01", "Q1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = reports
            .generate_report(owner, "cow-9", "2024-01-01", "2024-01-20", "Q1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = reports
            .generate_report(OwnerId::new(), "cow-1", "2024-01-01", "2024-01-20", "Q1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert!(reports.list_reports(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_rules() {
        let (store, owner) = seeded().await;
        let reports = ReportService::new(store);
        reports
            .generate_report(owner, "cow-1", "2024-01-01", "2024-01-20", "a")
            .await
            .unwrap();
        reports
            .generate_report(owner, "cow-2", "2024-01-01", "2024-01-20", "b")
            .await
            .unwrap();
        let before = reports.list_reports(owner).await.unwrap();

        let err = reports.rename_report(owner, "a", "b").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = reports.rename_report(owner, "a", "a").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = reports.rename_report(owner, "zzz", "c").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(reports.list_reports(owner).await.unwrap(), before);

        let renamed = reports.rename_report(owner, "a", "c").await.unwrap();
        assert_eq!(renamed.results, before[0].results);
        let names: Vec<String> = reports
            .list_reports(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.report_name.to_string())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn delete_report_then_not_found() {
        let (store, owner) = seeded().await;
        let reports = ReportService::new(store);
        reports
            .generate_report(owner, "cow-1", "2024-01-01", "2024-01-20", "Q1")
            .await
            .unwrap();

        reports.delete_report(owner, "Q1").await.unwrap();
        assert_eq!(reports.get_report(owner, "Q1").await.unwrap_err().kind(), ErrorKind::NotFound);
        let err = reports.delete_report(owner, "Q1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn deleting_an_animal_sweeps_its_reports() {
        let (store, owner) = seeded().await;
        let reports = ReportService::new(Arc::clone(&store));
        let ledger = WeightLedger::new(Arc::clone(&store));
        reports
            .generate_report(owner, "cow-1", "2024-01-01", "2024-01-20", "solo")
            .await
            .unwrap();
        reports
            .generate_report(owner, "cow-1", "2024-01-01", "2024-01-20", "herd")
            .await
            .unwrap();
        reports
            .generate_report(owner, "cow-2", "2024-01-01", "2024-01-20", "herd")
            .await
            .unwrap();

        ledger.delete_animal(owner, "cow-1").await.unwrap();

        let err = reports.get_report(owner, "solo").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let herd = reports.get_report(owner, "herd").await.unwrap();
        assert_eq!(herd.target_animals.len(), 1);
        assert!(herd.entry(&animal("cow-1")).is_none());
        assert!(herd.entry(&animal("cow-2")).is_some());
        assert!(!ledger.exists(owner, &animal("cow-1")).await.unwrap());
    }

    /// Store that lets a deletion commit right after the animal has been read,
    /// the interleaving a concurrent `delete_animal` can produce.
    struct DeleteAfterRead {
        inner: InMemoryHerdStore,
    }

    #[async_trait]
    impl AnimalStore for DeleteAfterRead {
        async fn get_animal(
            &self,
            owner_id: OwnerId,
            animal_id: &AnimalId,
        ) -> Result<Option<AnimalRecord>, StoreError> {
            let record = self.inner.get_animal(owner_id, animal_id).await?;
            if record.is_some() {
                self.inner.delete_animal_cascade(owner_id, animal_id).await?;
            }
            Ok(record)
        }

        async fn list_animals(&self, owner_id: OwnerId) -> Result<Vec<AnimalRecord>, StoreError> {
            self.inner.list_animals(owner_id).await
        }

        async fn append_observation(
            &self,
            owner_id: OwnerId,
            animal_id: &AnimalId,
            observation: WeightObservation,
        ) -> Result<AnimalRecord, StoreError> {
            self.inner.append_observation(owner_id, animal_id, observation).await
        }

        async fn remove_observations_at(
            &self,
            owner_id: OwnerId,
            animal_id: &AnimalId,
            date: DateTime<Utc>,
        ) -> Result<usize, StoreError> {
            self.inner.remove_observations_at(owner_id, animal_id, date).await
        }
    }

    #[async_trait]
    impl ReportStore for DeleteAfterRead {
        async fn get_report(
            &self,
            owner_id: OwnerId,
            report_name: &ReportName,
        ) -> Result<Option<ReportRecord>, StoreError> {
            self.inner.get_report(owner_id, report_name).await
        }

        async fn list_reports(&self, owner_id: OwnerId) -> Result<Vec<ReportRecord>, StoreError> {
            self.inner.list_reports(owner_id).await
        }

        async fn merge_report_entry(
            &self,
            owner_id: OwnerId,
            report_name: &ReportName,
            entry: AnimalReportEntry,
            generated_at: DateTime<Utc>,
        ) -> Result<ReportRecord, StoreError> {
            self.inner
                .merge_report_entry(owner_id, report_name, entry, generated_at)
                .await
        }

        async fn rename_report(
            &self,
            owner_id: OwnerId,
            old_name: &ReportName,
            new_name: &ReportName,
        ) -> Result<ReportRecord, StoreError> {
            self.inner.rename_report(owner_id, old_name, new_name).await
        }

        async fn delete_report(
            &self,
            owner_id: OwnerId,
            report_name: &ReportName,
        ) -> Result<(), StoreError> {
            self.inner.delete_report(owner_id, report_name).await
        }

        async fn store_summary(
            &self,
            owner_id: OwnerId,
            report_name: &ReportName,
            revision: u64,
            summary: &str,
        ) -> Result<ReportRecord, StoreError> {
            self.inner
                .store_summary(owner_id, report_name, revision, summary)
                .await
        }
    }

    #[async_trait]
    impl HerdStore for DeleteAfterRead {
        async fn delete_animal_cascade(
            &self,
            owner_id: OwnerId,
            animal_id: &AnimalId,
        ) -> Result<CascadeOutcome, StoreError> {
            self.inner.delete_animal_cascade(owner_id, animal_id).await
        }
    }

    #[tokio::test]
    async fn deletion_between_read_and_merge_leaves_no_dangling_report() {
        let owner = owner();
        let store = Arc::new(DeleteAfterRead {
            inner: InMemoryHerdStore::new(),
        });
        WeightLedger::new(Arc::clone(&store))
            .record_observation(owner, "cow-1", "2024-01-01", 50.0, "")
            .await
            .unwrap();

        let reports = ReportService::new(Arc::clone(&store));
        let err = reports
            .generate_report(owner, "cow-1", "2024-01-01", "2024-01-31", "herd")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!store.inner.exists(owner, &animal("cow-1")).await.unwrap());
        assert_eq!(
            reports.get_report(owner, "herd").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_generation_loses_no_entries() {
        let (store, owner) = (store(), owner());
        let ledger = WeightLedger::new(Arc::clone(&store));
        for i in 0..24 {
            ledger
                .record_observation(owner, &format!("cow-{i}"), "2024-01-01", 50.0 + i as f64, "")
                .await
                .unwrap();
        }

        let reports = ReportService::new(Arc::clone(&store));
        let mut handles = Vec::new();
        for i in 0..24 {
            let reports = reports.clone();
            handles.push(tokio::spawn(async move {
                reports
                    .generate_report(owner, &format!("cow-{i}"), "2024-01-01", "2024-01-31", "herd")
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let report = reports.get_report(owner, "herd").await.unwrap();
        assert_eq!(report.results.len(), 24);
        assert!(report.is_consistent());
    }
}
