//! Notification types: alerts raised for a user about a land.

use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

use super::string_enum;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    HarvestDue,
    HarvestOverdue,
    MaintenanceDue,
    Comment,
    Photo,
    Weather,
    System,
    Bulk,
}

string_enum!(NotificationKind, "notification type", {
    HarvestDue => "harvest_due",
    HarvestOverdue => "harvest_overdue",
    MaintenanceDue => "maintenance_due",
    Comment => "comment",
    Photo => "photo",
    Weather => "weather",
    System => "system",
    Bulk => "bulk",
});

/// Urgency of a notification or work assignment.
///
/// Ordered: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

string_enum!(Priority, "priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Where a notification stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    InProgress,
    Completed,
    Dismissed,
}

string_enum!(NotificationStatus, "notification status", {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Dismissed => "dismissed",
});

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub land_id: Option<i64>,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub is_active: bool,
    pub status: NotificationStatus,
    pub metadata: NotificationMetadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Structured metadata stored alongside a notification as JSON.
///
/// Every field defaults so rows written by other subsystems still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationMetadata {
    /// Which process raised the notification (e.g. `harvest_check`).
    pub created_from: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_code: Option<String>,

    /// Signed days until harvest at the time of the last update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_harvest: Option<i32>,

    /// The harvest date this notification refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harvest_date: Option<Date>,
}

/// Fields for inserting a new notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub land_id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub metadata: NotificationMetadata,
}
