//! Strict validation of the remote classification document.
//!
//! Remote output is free text. It becomes a [`ValidatedSummary`] only after
//! every required field is present with the right shape; anything else is
//! [`ClassificationOutcome::Rejected`] and must not be stored.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use herdbook_core::AnimalId;

/// Category fields, all arrays of animal-id strings.
pub const CATEGORY_FIELDS: [&str; 6] = [
    "highPerformers",
    "lowPerformers",
    "concerningTrends",
    "averagePerformers",
    "potentialRecordErrors",
    "insufficientData",
];

/// Typed view of an accepted classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceClassification {
    pub high_performers: Vec<String>,
    pub low_performers: Vec<String>,
    pub concerning_trends: Vec<String>,
    pub average_performers: Vec<String>,
    pub potential_record_errors: Vec<String>,
    pub insufficient_data: Vec<String>,
    pub insights: String,
}

/// How well a classification lines up with the report it describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Report animals that appear in no category.
    pub unclassified: Vec<String>,
    /// Ids the classification mentions that are not in the report.
    pub unknown: Vec<String>,
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.unclassified.is_empty() && self.unknown.is_empty()
    }
}

impl PerformanceClassification {
    fn categories(&self) -> [&Vec<String>; 6] {
        [
            &self.high_performers,
            &self.low_performers,
            &self.concerning_trends,
            &self.average_performers,
            &self.potential_record_errors,
            &self.insufficient_data,
        ]
    }

    pub fn coverage(&self, animals: &BTreeSet<AnimalId>) -> Coverage {
        let mentioned: BTreeSet<&str> = self
            .categories()
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();

        Coverage {
            unclassified: animals
                .iter()
                .filter(|a| !mentioned.contains(a.as_str()))
                .map(|a| a.to_string())
                .collect(),
            unknown: mentioned
                .iter()
                .filter(|m| !animals.iter().any(|a| a.as_str() == **m))
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// An accepted response: the document text to persist plus its typed view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSummary {
    pub raw: String,
    pub classification: PerformanceClassification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationOutcome {
    Validated(ValidatedSummary),
    Rejected(String),
}

/// Remove markdown code fences or surrounding prose around a JSON object.
pub fn strip_delimiters(raw: &str) -> &str {
    let mut s = raw.trim();

    if let Some(rest) = s.strip_prefix("```") {
        // Drop the info string (e.g. "json") on the opening fence line.
        s = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest,
        };
        s = s.trim_end();
        s = s.strip_suffix("```").unwrap_or(s).trim();
    }

    if !s.starts_with('{') {
        if let (Some(open), Some(close)) = (s.find('{'), s.rfind('}')) {
            if open < close {
                s = &s[open..=close];
            }
        }
    }

    s
}

/// Parse and validate raw remote output.
pub fn validate_response(raw: &str) -> ClassificationOutcome {
    let body = strip_delimiters(raw);

    let value: JsonValue = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return ClassificationOutcome::Rejected(format!("response is not JSON: {e}")),
    };

    let Some(obj) = value.as_object() else {
        return ClassificationOutcome::Rejected("response is not a JSON object".to_string());
    };

    for field in CATEGORY_FIELDS {
        match obj.get(field) {
            None => return ClassificationOutcome::Rejected(format!("missing field `{field}`")),
            Some(JsonValue::Array(items)) if items.iter().all(JsonValue::is_string) => {}
            Some(_) => {
                return ClassificationOutcome::Rejected(format!(
                    "field `{field}` must be an array of strings"
                ));
            }
        }
    }

    match obj.get("insights") {
        None => return ClassificationOutcome::Rejected("missing field `insights`".to_string()),
        Some(JsonValue::String(_)) => {}
        Some(_) => {
            return ClassificationOutcome::Rejected("field `insights` must be a string".to_string());
        }
    }

    match serde_json::from_value::<PerformanceClassification>(value) {
        Ok(classification) => ClassificationOutcome::Validated(ValidatedSummary {
            raw: body.to_string(),
            classification,
        }),
        Err(e) => ClassificationOutcome::Rejected(e.to_string()),
    }
}
