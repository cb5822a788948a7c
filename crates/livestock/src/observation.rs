use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use herdbook_core::{DomainError, DomainResult};

/// One dated weight reading for an animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightObservation {
    pub date: DateTime<Utc>,
    pub weight: f64,
    #[serde(default)]
    pub notes: String,
}

impl WeightObservation {
    /// Build a validated observation. Weight must be a positive finite number.
    pub fn new(date: DateTime<Utc>, weight: f64, notes: impl Into<String>) -> DomainResult<Self> {
        validate_weight(weight)?;
        Ok(Self {
            date,
            weight,
            notes: notes.into(),
        })
    }

    pub fn recorded(&self) -> RecordedWeight {
        RecordedWeight {
            date: self.date,
            weight: self.weight,
        }
    }
}

/// Date/weight pair as it appears in report entries (notes are not carried).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedWeight {
    pub date: DateTime<Utc>,
    pub weight: f64,
}

pub fn validate_weight(weight: f64) -> DomainResult<()> {
    if !(weight.is_finite() && weight > 0.0) {
        return Err(DomainError::invalid_input(format!(
            "weight must be a positive finite number (got {weight})"
        )));
    }
    Ok(())
}

/// Parse a caller-supplied date.
///
/// Accepts RFC 3339 timestamps, zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` (read as
/// UTC) and plain `YYYY-MM-DD` calendar dates (midnight UTC).
pub fn parse_date(raw: &str) -> DomainResult<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(DomainError::invalid_input("date is required"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(DomainError::invalid_input(format!("'{s}' is not a valid date")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn plain_dates_parse_to_midnight_utc() {
        let d = parse_date("2024-03-01").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let d = parse_date("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());

        let naive = parse_date("2024-03-01T10:00:00").unwrap();
        assert_eq!(naive, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn impossible_calendar_dates_are_rejected() {
        for raw in ["2023-02-30", "2024-13-01", "yesterday", "", "  "] {
            assert!(
                matches!(parse_date(raw), Err(DomainError::InvalidInput(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn weight_must_be_positive_and_finite() {
        let date = Utc::now();
        assert!(WeightObservation::new(date, 412.5, "").is_ok());
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                WeightObservation::new(date, bad, ""),
                Err(DomainError::InvalidInput(_))
            ));
        }
    }
}
