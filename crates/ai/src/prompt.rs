//! Prompt construction for report classification.
//!
//! The report data goes in as a JSON block so identifiers chosen by users are
//! escaped and cannot be read as instructions.

use serde::Serialize;
use serde_json::json;

use herdbook_livestock::{AnimalReportEntry, ReportRecord};

const INSTRUCTIONS: &str = r#"You are an experienced livestock performance analyst.
Classify every animal in the report data below by growth performance.

Respond with ONLY a JSON object (no prose, no markdown) with exactly these fields:
{
  "highPerformers": [string],
  "lowPerformers": [string],
  "concerningTrends": [string],
  "averagePerformers": [string],
  "potentialRecordErrors": [string],
  "insufficientData": [string],
  "insights": string
}

Rules:
- Every array holds animal ids copied exactly from the data.
- Every animal must appear in at least one category.
- "averagePerformers" only holds animals that are in no other category.
- "insufficientData" is only for animals with 0 or 1 recorded weights in the range.
- Populate "potentialRecordErrors" liberally: negative or impossible weights,
  implausible jumps between readings, outliers and likely typos.
- "insights" is a short plain-text summary (at most three sentences).

Average daily gain (ADG) is in weight units per day, weighted across sampling
intervals. "not enough data" means fewer than two usable readings.
"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptAnimal<'a> {
    animal_id: &'a str,
    recorded_weights: Vec<PromptWeight>,
    average_daily_gain: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct PromptWeight {
    date: String,
    weight: f64,
}

fn prompt_animal(entry: &AnimalReportEntry) -> PromptAnimal<'_> {
    PromptAnimal {
        animal_id: entry.animal_id.as_str(),
        recorded_weights: entry
            .recorded_weights
            .iter()
            .map(|w| PromptWeight {
                date: w.date.format("%Y-%m-%d").to_string(),
                weight: w.weight,
            })
            .collect(),
        average_daily_gain: match entry.average_daily_gain {
            Some(adg) => json!((adg * 1000.0).round() / 1000.0),
            None => json!("not enough data"),
        },
    }
}

/// Build the full classification prompt for a report.
pub fn build_prompt(report: &ReportRecord) -> String {
    let animals: Vec<PromptAnimal<'_>> = report.results.iter().map(prompt_animal).collect();
    let data = json!({
        "report": report.report_name.as_str(),
        "animals": animals,
    });
    let data = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());

    format!("{INSTRUCTIONS}\nReport data:\n{data}\n")
}
