//! Average daily gain (ADG) over a date range.
//!
//! Model:
//! - Keep observations whose date falls in `[start, end]` (inclusive), sorted by date.
//! - Walk consecutive pairs; each pair with a strictly positive time span adds
//!   its weight change to `total_gain` and its span (in days) to `total_days`.
//! - ADG = `total_gain / total_days`.
//!
//! This is a chained, duration-weighted average: irregular sampling intervals
//! each count for their own length instead of only the endpoints mattering.
//! Same-timestamp duplicates contribute to neither sum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herdbook_core::{DomainError, DomainResult};

use crate::observation::{RecordedWeight, WeightObservation};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Inclusive date range, validated so that `start <= end`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if start > end {
            return Err(DomainError::invalid_input(format!(
                "range start {} is after range end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Weights in range plus the computed ADG.
///
/// `average_daily_gain` is `None` when the range holds fewer than two
/// observations or no pair spans a positive amount of time; downstream
/// classification reads that as "insufficient data".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSummary {
    pub recorded_weights: Vec<RecordedWeight>,
    pub average_daily_gain: Option<f64>,
}

pub fn compute_growth(observations: &[WeightObservation], range: &DateRange) -> GrowthSummary {
    let mut recorded_weights: Vec<RecordedWeight> = observations
        .iter()
        .filter(|o| range.contains(o.date))
        .map(WeightObservation::recorded)
        .collect();
    recorded_weights.sort_by_key(|w| w.date);

    if recorded_weights.len() < 2 {
        return GrowthSummary {
            recorded_weights,
            average_daily_gain: None,
        };
    }

    let mut total_gain = 0.0;
    let mut total_days = 0.0;
    for pair in recorded_weights.windows(2) {
        let days = (pair[1].date - pair[0].date).num_milliseconds() as f64 / MILLIS_PER_DAY;
        if days > 0.0 {
            total_gain += pair[1].weight - pair[0].weight;
            total_days += days;
        }
    }

    let average_daily_gain = if total_days > 0.0 {
        Some(total_gain / total_days)
    } else {
        None
    };

    GrowthSummary {
        recorded_weights,
        average_daily_gain,
    }
}
