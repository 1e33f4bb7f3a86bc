//! Notification decision policy.
//!
//! Maps days-until-harvest to a notification kind and priority:
//!
//! | days until harvest | notify | kind            | priority | create work |
//! |--------------------|--------|-----------------|----------|-------------|
//! | `< 0`              | yes    | harvest overdue | high     | no          |
//! | `0`, `1`           | yes    | harvest due     | high     | no          |
//! | `2`                | yes    | harvest due     | medium   | no          |
//! | `3`                | yes    | harvest due     | medium   | yes         |
//! | `> 3`              | no     |                 |          | no          |
//!
//! Work is raised at exactly one point per cycle, three days out.

use jiff::civil::Date;

use crate::model::{Land, Notification, NotificationKind, Priority};

/// Days before harvest at which the work assignment is created.
pub const WORK_TRIGGER_DAYS: i32 = 3;

/// What a harvest run should do for one land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub should_notify: bool,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub should_create_work: bool,
}

/// Applies the fixed thresholds to `days_until_harvest`.
pub fn decide(days_until_harvest: i32) -> Decision {
    let (should_notify, kind, priority) = match days_until_harvest {
        d if d < 0 => (true, NotificationKind::HarvestOverdue, Priority::High),
        0 | 1 => (true, NotificationKind::HarvestDue, Priority::High),
        2 | 3 => (true, NotificationKind::HarvestDue, Priority::Medium),
        _ => (false, NotificationKind::HarvestDue, Priority::Low),
    };
    Decision {
        should_notify,
        kind,
        priority,
        should_create_work: days_until_harvest == WORK_TRIGGER_DAYS,
    }
}

/// What to do with the ledger given a decision and any existing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAction {
    /// Nothing to raise.
    Skip,

    /// No live notification of this kind: create one.
    Create { priority: Priority },

    /// A live notification exists: update it in place.
    ///
    /// `priority` never falls below the stored one.
    Update { id: i64, priority: Priority },
}

/// Chooses between creating, updating, or skipping.
///
/// `existing` must be a non-dismissed notification of `decision.kind` for
/// the land; dismissed notifications never block a new one.
pub fn ledger_action(decision: &Decision, existing: Option<&Notification>) -> LedgerAction {
    if !decision.should_notify {
        return LedgerAction::Skip;
    }
    match existing {
        Some(n) if !n.is_dismissed => LedgerAction::Update {
            id: n.id,
            priority: n.priority.max(decision.priority),
        },
        _ => LedgerAction::Create {
            priority: decision.priority,
        },
    }
}

/// Renders the title and message for a harvest notification.
///
/// The text names the harvest date rather than a day count, so it stays
/// accurate while the notification is updated in place on later runs.
pub fn describe(land: &Land, kind: NotificationKind, harvest_date: Date) -> (String, String) {
    let (name, code) = (&land.name, &land.code);
    if kind == NotificationKind::HarvestOverdue {
        (
            format!("Harvest overdue: {name}"),
            format!("Harvest for {name} ({code}) was due on {harvest_date}."),
        )
    } else {
        (
            format!("Harvest due soon: {name}"),
            format!("Harvest for {name} ({code}) is due on {harvest_date}."),
        )
    }
}
