//! Interaction records and response options.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// A cookie-consent choice the participant can report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOption {
    /// Stable identifier (e.g. `accept-all`).
    pub id: String,
    /// Label shown to the participant and stored in records.
    pub label: String,
}

impl ResponseOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// One completed site visit.
///
/// Field names match the stored document shape (`userId`, `timeSpent`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    #[serde(rename = "userId")]
    pub participant_id: String,
    /// When the response was submitted.
    pub timestamp: DateTime<Utc>,
    pub site_index: usize,
    pub website: String,
    /// Label of the selected option.
    pub selection: String,
    #[serde(rename = "timeSpent")]
    pub time_spent_seconds: u64,
}

/// Records-table columns that come before the per-option columns.
pub const LEADING_COLUMNS: [&str; 3] = ["User ID", "Timestamp", "Website"];

/// Column headers for a records table: one check column per option.
pub fn table_header(options: &[ResponseOption]) -> Vec<String> {
    let mut header: Vec<String> = LEADING_COLUMNS.iter().map(ToString::to_string).collect();
    header.extend(options.iter().map(|o| o.label.clone()));
    header.push("Time Spent".to_string());
    header
}

impl InteractionRecord {
    /// Returns true if this record's selection is `option`.
    pub fn selected(&self, option: &ResponseOption) -> bool {
        self.selection == option.label
    }

    /// Plain-text row matching [`table_header`]: id, local timestamp, site,
    /// a check per option, seconds.
    pub fn table_row(&self, options: &[ResponseOption]) -> Vec<String> {
        let mut row = vec![
            self.participant_id.clone(),
            self.timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            self.website.clone(),
        ];
        row.extend(options.iter().map(|option| {
            if self.selected(option) {
                "✓".to_string()
            } else {
                String::new()
            }
        }));
        row.push(format!("{}s", self.time_spent_seconds));
        row
    }
}

/// Whole seconds between opening a site and submitting the response.
///
/// Rounds half up; a zero or negative interval (clock skew) yields 0.
pub fn time_spent_seconds(opened_at: DateTime<Utc>, submitted_at: DateTime<Utc>) -> u64 {
    let millis = (submitted_at - opened_at).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis as u64 + 500) / 1000
}
