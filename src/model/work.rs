//! Farm work assignments: physical tasks to be performed on a land.

use std::fmt;

use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

use super::{Priority, string_enum};

/// The `created_from` tag on work raised by harvest notifications.
pub const HARVEST_NOTIFICATION_SOURCE: &str = "harvest_notification";

/// Where a work assignment stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Created,
    Assigned,
    InProgress,
    Completed,
    Canceled,
    Pending,
    Postponed,
}

string_enum!(WorkStatus, "work status", {
    Created => "created",
    Assigned => "assigned",
    InProgress => "in_progress",
    Completed => "completed",
    Canceled => "canceled",
    Pending => "pending",
    Postponed => "postponed",
});

/// Identity of one harvest cycle of one land: `"{land_id}:{harvest_date}"`.
///
/// Advancing the land's harvest date yields a new key, so each cycle
/// can own its own work assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleKey(String);

impl CycleKey {
    pub fn new(land_id: i64, harvest_date: Date) -> Self {
        Self(format!("{land_id}:{harvest_date}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CycleKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for CycleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A category of farm work (e.g. harvesting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkType {
    pub id: i64,
    pub name: String,
    pub category: String,
}

/// A persisted farm work assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmWork {
    pub id: i64,
    pub land_id: Option<i64>,
    pub work_type_id: Option<i64>,
    pub assigned_team_id: Option<i64>,
    pub assigned_user_id: Option<i64>,
    pub creator_user_id: i64,
    pub priority: Priority,
    pub status: WorkStatus,
    pub due_date: Date,
    pub cycle_key: Option<CycleKey>,
    pub metadata: WorkMetadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Structured metadata stored alongside a work assignment as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkMetadata {
    pub created_from: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub harvest_date: Option<Date>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_key: Option<CycleKey>,

    /// The notification whose trigger created this work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<i64>,
}

/// Fields for inserting a new work assignment.
#[derive(Debug, Clone)]
pub struct NewFarmWork {
    pub land_id: i64,
    pub work_type_id: Option<i64>,
    pub assigned_user_id: Option<i64>,
    pub creator_user_id: i64,
    pub priority: Priority,
    pub due_date: Date,
    pub cycle_key: CycleKey,
    pub metadata: WorkMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;

    #[test]
    fn cycle_key_changes_with_harvest_date() {
        let first = CycleKey::new(7, date(2025, 5, 1));
        let next = CycleKey::new(7, date(2025, 8, 29));

        assert_eq!(first.as_str(), "7:2025-05-01");
        assert_ne!(first, next);
    }
}
