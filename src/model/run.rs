//! Run summaries: the result of one harvest check.

use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate result of one harvest check.
///
/// Returned to every caller of the engine and serialized as-is for
/// on-demand callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub run_date: Date,
    pub success: bool,
    pub lands_processed: u32,
    pub lands_skipped: u32,
    pub notifications_created: u32,
    pub notifications_updated: u32,
    pub farm_works_created: u32,

    /// Lands whose processing failed. The run continues past them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<LandError>,

    /// Set when the run aborted before processing any land.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    pub fn new(run_id: Uuid, run_date: Date) -> Self {
        Self {
            run_id,
            run_date,
            success: true,
            lands_processed: 0,
            lands_skipped: 0,
            notifications_created: 0,
            notifications_updated: 0,
            farm_works_created: 0,
            errors: Vec::new(),
            error: None,
        }
    }

    /// Marks the run as aborted.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// A land whose processing failed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandError {
    pub land_id: i64,
    pub land_name: String,
    pub message: String,
}

/// A run as recorded in the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub run_date: Date,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub success: bool,
    pub lands_processed: u32,
    pub lands_skipped: u32,
    pub notifications_created: u32,
    pub notifications_updated: u32,
    pub farm_works_created: u32,
    pub error_count: u32,
    pub error: Option<String>,
}

impl RunRecord {
    pub fn from_summary(summary: &RunSummary, started_at: Timestamp, finished_at: Timestamp) -> Self {
        Self {
            run_id: summary.run_id,
            run_date: summary.run_date,
            started_at,
            finished_at,
            success: summary.success,
            lands_processed: summary.lands_processed,
            lands_skipped: summary.lands_skipped,
            notifications_created: summary.notifications_created,
            notifications_updated: summary.notifications_updated,
            farm_works_created: summary.farm_works_created,
            error_count: u32::try_from(summary.errors.len()).unwrap_or(u32::MAX),
            error: summary.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;

    #[test]
    fn failed_summary_serializes_error() {
        let summary = RunSummary::new(Uuid::new_v4(), date(2025, 4, 28)).fail("no lands table");
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "no lands table");
        assert!(json.get("errors").is_none());
    }
}
