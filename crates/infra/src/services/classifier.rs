use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use herdbook_ai::{AiError, ClassificationOutcome, TextGenerator, build_prompt, validate_response};
use herdbook_core::{DomainError, OwnerId, ReportName};
use herdbook_livestock::ReportRecord;

use super::ServiceError;
use crate::store::HerdStore;

pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(60);

/// Classifies a report's animals through a remote text generator and caches
/// the validated document on the report.
///
/// A failed or rejected call never touches the stored summary.
pub struct AiClassifier<S: ?Sized, G: ?Sized> {
    store: Arc<S>,
    generator: Arc<G>,
    timeout: Duration,
}

impl<S: ?Sized, G: ?Sized> Clone for AiClassifier<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            timeout: self.timeout,
        }
    }
}

impl<S, G> AiClassifier<S, G>
where
    S: HerdStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    pub fn new(store: Arc<S>, generator: Arc<G>) -> Self {
        Self {
            store,
            generator,
            timeout: DEFAULT_CLASSIFIER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a fresh classification and overwrite the cached summary.
    pub async fn classify(
        &self,
        owner_id: OwnerId,
        report_name: &str,
    ) -> Result<String, ServiceError> {
        let report = self.load(owner_id, report_name).await?;
        self.classify_report(report).await
    }

    /// Return the cached summary, classifying only when none is stored.
    pub async fn get_or_create_summary(
        &self,
        owner_id: OwnerId,
        report_name: &str,
    ) -> Result<String, ServiceError> {
        let report = self.load(owner_id, report_name).await?;
        if report.has_summary() {
            debug!(owner_id = %owner_id, report_name = %report.report_name, "summary cache hit");
            return Ok(report.ai_generated_summary);
        }
        self.classify_report(report).await
    }

    async fn load(
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

    async fn classify_report(&self, report: ReportRecord) -> Result<String, ServiceError> {
        let owner_id = report.owner_id;
        let report_name = report.report_name.clone();
        let prompt = build_prompt(&report);

        let raw = match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                warn!(
                    owner_id = %owner_id,
                    report_name = %report_name,
                    error = %err,
                    "classification call failed"
                );
                return Err(err.into());
            }
            Err(_) => {
                warn!(
                    owner_id = %owner_id,
                    report_name = %report_name,
                    timeout = ?self.timeout,
                    "classification call timed out"
                );
                return Err(AiError::Timeout(self.timeout).into());
            }
        };

        let summary = match validate_response(&raw) {
            ClassificationOutcome::Validated(summary) => summary,
            ClassificationOutcome::Rejected(reason) => {
                warn!(
                    owner_id = %owner_id,
                    report_name = %report_name,
                    reason = %reason,
                    "classification rejected"
                );
                return Err(DomainError::invalid_upstream(reason).into());
            }
        };

        let coverage = summary.classification.coverage(&report.target_animals);
        if !coverage.is_complete() {
            warn!(
                owner_id = %owner_id,
                report_name = %report_name,
                unclassified = ?coverage.unclassified,
                unknown = ?coverage.unknown,
                "classification does not cover the report exactly"
            );
        }

        self.store
            .store_summary(owner_id, &report_name, report.revision, &summary.raw)
            .await?;

        info!(owner_id = %owner_id, report_name = %report_name, "summary stored");
        Ok(summary.raw)
    }
}
