//! Action boundary.
//!
//! Every action is one request/response unit of work. Failures come back as
//! [`ActionResult::Error`] carrying a stable [`ErrorKind`], so callers branch on
//! the kind rather than on message text.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use herdbook_ai::TextGenerator;
use herdbook_core::OwnerId;
use herdbook_livestock::{AnimalRecord, CascadeOutcome, ReportRecord, WeightObservation};

use crate::services::{AiClassifier, ErrorKind, ReportService, ServiceError, WeightLedger};
use crate::store::HerdStore;

/// `{"ok": T}` or `{"error": {"kind": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionResult<T> {
    Ok(T),
    Error(ActionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl<T> ActionResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ActionResult::Ok(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ActionResult::Ok(_) => None,
            ActionResult::Error(err) => Some(err.kind),
        }
    }

    pub fn into_result(self) -> Result<T, ActionError> {
        match self {
            ActionResult::Ok(value) => Ok(value),
            ActionResult::Error(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, ServiceError>> for ActionResult<T> {
    fn from(result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(value) => ActionResult::Ok(value),
            Err(err) => ActionResult::Error(ActionError {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordWeightRequest {
    pub animal_id: String,
    pub date: String,
    pub weight: f64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveWeightRequest {
    pub animal_id: String,
    pub date: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub animal_id: String,
    pub range_start: String,
    pub range_end: String,
    pub report_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameReportRequest {
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemovedObservations {
    pub removed: usize,
}

/// Owner-scoped facade over the ledger, report and classifier services.
pub struct HerdActions<S: ?Sized, G: ?Sized> {
    ledger: WeightLedger<S>,
    reports: ReportService<S>,
    classifier: AiClassifier<S, G>,
}

impl<S: ?Sized, G: ?Sized> Clone for HerdActions<S, G> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            reports: self.reports.clone(),
            classifier: self.classifier.clone(),
        }
    }
}

impl<S, G> HerdActions<S, G>
where
    S: HerdStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    pub fn new(store: Arc<S>, classifier: AiClassifier<S, G>) -> Self {
        Self {
            ledger: WeightLedger::new(Arc::clone(&store)),
            reports: ReportService::new(store),
            classifier,
        }
    }

    pub async fn record_weight(
        &self,
        owner_id: OwnerId,
        request: RecordWeightRequest,
    ) -> ActionResult<AnimalRecord> {
        self.ledger
            .record_observation(
                owner_id,
                &request.animal_id,
                &request.date,
                request.weight,
                &request.notes,
            )
            .await
            .into()
    }

    pub async fn remove_weight(
        &self,
        owner_id: OwnerId,
        request: RemoveWeightRequest,
    ) -> ActionResult<RemovedObservations> {
        self.ledger
            .remove_observation(owner_id, &request.animal_id, &request.date)
            .await
            .map(|removed| RemovedObservations { removed })
            .into()
    }

    pub async fn list_weights(
        &self,
        owner_id: OwnerId,
        animal_id: &str,
    ) -> ActionResult<Vec<WeightObservation>> {
        self.ledger.observations(owner_id, animal_id).await.into()
    }

    pub async fn delete_animal(
        &self,
        owner_id: OwnerId,
        animal_id: &str,
    ) -> ActionResult<CascadeOutcome> {
        self.ledger.delete_animal(owner_id, animal_id).await.into()
    }

    pub async fn generate_report(
        &self,
        owner_id: OwnerId,
        request: GenerateReportRequest,
    ) -> ActionResult<ReportRecord> {
        self.reports
            .generate_report(
                owner_id,
                &request.animal_id,
                &request.range_start,
                &request.range_end,
                &request.report_name,
            )
            .await
            .into()
    }

    pub async fn rename_report(
        &self,
        owner_id: OwnerId,
        request: RenameReportRequest,
    ) -> ActionResult<ReportRecord> {
        self.reports
            .rename_report(owner_id, &request.old_name, &request.new_name)
            .await
            .into()
    }

    pub async fn delete_report(&self, owner_id: OwnerId, report_name: &str) -> ActionResult<()> {
        self.reports.delete_report(owner_id, report_name).await.into()
    }

    pub async fn get_report(
        &self,
        owner_id: OwnerId,
        report_name: &str,
    ) -> ActionResult<ReportRecord> {
        self.reports.get_report(owner_id, report_name).await.into()
    }

    pub async fn list_reports(&self, owner_id: OwnerId) -> ActionResult<Vec<ReportRecord>> {
        self.reports.list_reports(owner_id).await.into()
    }

    pub async fn classify_report(
        &self,
        owner_id: OwnerId,
        report_name: &str,
    ) -> ActionResult<String> {
        self.classifier.classify(owner_id, report_name).await.into()
    }

    pub async fn get_or_create_summary(
        &self,
        owner_id: OwnerId,
        report_name: &str,
    ) -> ActionResult<String> {
        self.classifier
            .get_or_create_summary(owner_id, report_name)
            .await
            .into()
    }
}
