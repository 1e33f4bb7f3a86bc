//! Harvest check orchestration.
//!
//! One run walks every active land with harvest data:
//!
//! ```text
//! fetch lands → per land {
//!     days until harvest → decide → create | update | skip notification
//!                                 → create | skip work → sync status
//! } → summary
//! ```
//!
//! Each land is processed in its own transaction. A land that fails rolls
//! back alone and is recorded in the summary; the loop moves on. Only a
//! failure before the loop (no lands, no work type lookup) fails the run.
//!
//! Runs are idempotent for unchanged inputs: every create is preceded by a
//! fresh lookup, so repeating a run the same day writes nothing new.

use jiff::{Timestamp, civil::Date};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::harvest::{HarvestSchedule, ScheduleError};
use crate::model::{
    CycleKey, Land, LandError, NewNotification, NotificationMetadata, RunRecord, RunSummary,
    WorkType,
};
use crate::policy::{self, LedgerAction};
use crate::storage::{Storage, StorageError};
use crate::sync::{self, HarvestWork};

/// The `created_from` tag on notifications raised by harvest runs.
pub const HARVEST_CHECK_SOURCE: &str = "harvest_check";

/// Settings the engine is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name of the work type attached to harvest work.
    pub harvest_work_type: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            harvest_work_type: "harvesting".to_string(),
        }
    }
}

/// Why a single land could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum LandFailure {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What happened to a land's notification during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotificationOutcome {
    None,
    Created,
    Updated,
    Unchanged,
}

/// What happened to one land during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LandOutcome {
    /// No derivable schedule. `active_harvest_lands` filters these out, so
    /// this only fires if the query and `HarvestSchedule::for_land` disagree.
    Skipped,
    Processed {
        notification: NotificationOutcome,
        work_created: bool,
    },
}

/// The harvest notification and work-assignment engine.
pub struct Engine<'a> {
    storage: &'a Storage,
    config: EngineConfig,
}

impl<'a> Engine<'a> {
    pub fn new(storage: &'a Storage, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    /// Runs one harvest check as of `today` and records it in the run history.
    ///
    /// Never fails: fatal problems are reported through
    /// [`RunSummary::success`] and [`RunSummary::error`].
    pub fn run_harvest_check(&self, today: Date) -> RunSummary {
        let run_id = Uuid::new_v4();
        let span = info_span!("harvest_check", %run_id, %today);
        let _guard = span.enter();

        let started_at = Timestamp::now();
        let summary = self.check_lands(RunSummary::new(run_id, today));
        let record = RunRecord::from_summary(&summary, started_at, Timestamp::now());
        if let Err(e) = self.storage.record_run(&record) {
            warn!(error = %e, "failed to record run history");
        }

        if summary.success {
            info!(
                lands_processed = summary.lands_processed,
                lands_skipped = summary.lands_skipped,
                notifications_created = summary.notifications_created,
                notifications_updated = summary.notifications_updated,
                farm_works_created = summary.farm_works_created,
                errors = summary.errors.len(),
                "harvest check finished"
            );
        }
        summary
    }

    fn check_lands(&self, mut summary: RunSummary) -> RunSummary {
        let today = summary.run_date;

        let lands = match self.storage.active_harvest_lands() {
            Ok(lands) => lands,
            Err(e) => {
                error!(error = %e, "failed to fetch lands");
                return summary.fail(format!("failed to fetch lands: {e}"));
            }
        };

        let work_type = match self.storage.work_type_by_name(&self.config.harvest_work_type) {
            Ok(Some(work_type)) => Some(work_type),
            Ok(None) => {
                warn!(
                    work_type = %self.config.harvest_work_type,
                    "work type not found; harvest work will be untyped"
                );
                None
            }
            Err(e) => {
                error!(error = %e, "failed to look up work type");
                return summary.fail(format!("failed to look up work type: {e}"));
            }
        };

        debug!(lands = lands.len(), "checking lands");
        for entry in &lands {
            let land = match entry {
                Ok(land) => land,
                Err(invalid) => {
                    warn!(land_id = invalid.land_id, land = %invalid.land_name, error = %invalid, "failed to read land");
                    summary.lands_processed += 1;
                    summary.errors.push(LandError {
                        land_id: invalid.land_id,
                        land_name: invalid.land_name.clone(),
                        message: invalid.to_string(),
                    });
                    continue;
                }
            };
            let result = self
                .storage
                .in_transaction(|| self.process_land(land, today, work_type.as_ref()));
            match result {
                Ok(LandOutcome::Skipped) => summary.lands_skipped += 1,
                Ok(LandOutcome::Processed {
                    notification,
                    work_created,
                }) => {
                    summary.lands_processed += 1;
                    match notification {
                        NotificationOutcome::Created => summary.notifications_created += 1,
                        NotificationOutcome::Updated => summary.notifications_updated += 1,
                        NotificationOutcome::None | NotificationOutcome::Unchanged => {}
                    }
                    if work_created {
                        summary.farm_works_created += 1;
                    }
                }
                Err(e) => {
                    warn!(land_id = land.id, land = %land.name, error = %e, "failed to process land");
                    summary.lands_processed += 1;
                    summary.errors.push(LandError {
                        land_id: land.id,
                        land_name: land.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        summary
    }

    fn process_land(
        &self,
        land: &Land,
        today: Date,
        work_type: Option<&WorkType>,
    ) -> Result<LandOutcome, LandFailure> {
        let Some(schedule) = HarvestSchedule::for_land(land)? else {
            debug!(land_id = land.id, "land has no harvest schedule");
            return Ok(LandOutcome::Skipped);
        };
        if land.next_harvest_date != Some(schedule.next_harvest_date) {
            self.storage
                .set_next_harvest_date(land.id, schedule.next_harvest_date)?;
        }

        // Alerts for an earlier harvest date belong to a finished cycle.
        let closed = self
            .storage
            .close_stale_harvest_notifications(land.id, schedule.next_harvest_date)?;
        if closed > 0 {
            info!(
                land_id = land.id,
                closed,
                harvest_date = %schedule.next_harvest_date,
                "closed notifications from previous cycle"
            );
        }

        let days = schedule.days_until_harvest(today)?;
        let decision = policy::decide(days);
        let metadata = NotificationMetadata {
            created_from: HARVEST_CHECK_SOURCE.to_string(),
            land_name: Some(land.name.clone()),
            land_code: Some(land.code.clone()),
            days_until_harvest: Some(days),
            harvest_date: Some(schedule.next_harvest_date),
        };

        let existing = if decision.should_notify {
            self.storage
                .find_active_notification(land.id, decision.kind)?
        } else {
            None
        };

        let (notification_id, notification) =
            match policy::ledger_action(&decision, existing.as_ref()) {
                LedgerAction::Skip => {
                    debug!(land_id = land.id, days, "harvest not yet near");
                    return Ok(LandOutcome::Processed {
                        notification: NotificationOutcome::None,
                        work_created: false,
                    });
                }
                LedgerAction::Create { priority } => {
                    let (title, message) =
                        policy::describe(land, decision.kind, schedule.next_harvest_date);
                    let id = self.storage.create_notification(&NewNotification {
                        land_id: land.id,
                        user_id: land.creator_user_id,
                        kind: decision.kind,
                        title,
                        message,
                        priority,
                        metadata,
                    })?;
                    info!(
                        land_id = land.id,
                        notification_id = id,
                        kind = %decision.kind,
                        %priority,
                        days,
                        "created notification"
                    );
                    (id, NotificationOutcome::Created)
                }
                LedgerAction::Update { id, priority } => {
                    let unchanged = existing
                        .as_ref()
                        .is_some_and(|n| n.priority == priority && n.metadata == metadata);
                    if unchanged {
                        (id, NotificationOutcome::Unchanged)
                    } else {
                        self.storage
                            .update_notification_priority(id, priority, &metadata)?;
                        info!(
                            land_id = land.id,
                            notification_id = id,
                            %priority,
                            days,
                            "updated notification"
                        );
                        (id, NotificationOutcome::Updated)
                    }
                }
            };

        let mut work_created = false;
        if decision.should_create_work {
            let work = HarvestWork {
                land,
                schedule: &schedule,
                priority: decision.priority,
                notification_id,
                work_type_id: work_type.map(|wt| wt.id),
            };
            work_created = sync::create_harvest_work(self.storage, &work)?.is_some();
        }

        if !work_created {
            let cycle = CycleKey::new(land.id, schedule.next_harvest_date);
            if let Some(work) = sync::find_existing_work_for_cycle(self.storage, land.id, &cycle)? {
                let notification = self.storage.load_notification(notification_id)?;
                sync::sync_status(self.storage, &notification, &work)?;
            }
        }

        Ok(LandOutcome::Processed {
            notification,
            work_created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;

    use crate::model::{
        HARVEST_NOTIFICATION_SOURCE, NotificationKind, NotificationStatus, Priority, WorkStatus,
    };
    use crate::storage::testing::{sample_land, test_storage};
    use crate::storage::{NotificationFilter, WorkFilter};

    fn engine(storage: &Storage) -> Engine<'_> {
        Engine::new(storage, EngineConfig::default())
    }

    fn harvest_notifications(storage: &Storage, kind: NotificationKind) -> Vec<crate::model::Notification> {
        storage
            .list_notifications(&NotificationFilter {
                include_dismissed: true,
                ..NotificationFilter::default()
            })
            .unwrap()
            .into_iter()
            .filter(|n| n.kind == kind)
            .collect()
    }

    #[test]
    fn three_days_out_raises_notification_and_work() {
        let (_dir, storage) = test_storage();
        let land_id = storage.create_land(&sample_land()).unwrap();

        let summary = engine(&storage).run_harvest_check(date(2025, 4, 28));

        assert!(summary.success);
        assert_eq!(summary.lands_processed, 1);
        assert_eq!(summary.notifications_created, 1);
        assert_eq!(summary.farm_works_created, 1);

        let notification = storage
            .find_active_notification(land_id, NotificationKind::HarvestDue)
            .unwrap()
            .unwrap();
        assert_eq!(notification.priority, Priority::Medium);
        assert_eq!(notification.user_id, 10);
        assert_eq!(notification.metadata.created_from, HARVEST_CHECK_SOURCE);
        assert_eq!(notification.metadata.days_until_harvest, Some(3));
        assert_eq!(notification.metadata.land_code.as_deref(), Some("N-01"));

        let work = storage.list_work(&WorkFilter::default()).unwrap();
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].due_date, date(2025, 5, 1));
        assert_eq!(work[0].status, WorkStatus::Created);
        assert_eq!(work[0].metadata.created_from, HARVEST_NOTIFICATION_SOURCE);
        assert_eq!(work[0].metadata.notification_id, Some(notification.id));
        assert_eq!(work[0].work_type_id, Some(1));

        let land = storage.load_land(land_id).unwrap();
        assert_eq!(land.next_harvest_date, Some(date(2025, 5, 1)));
    }

    #[test]
    fn repeated_run_is_idempotent() {
        let (_dir, storage) = test_storage();
        storage.create_land(&sample_land()).unwrap();
        let engine = engine(&storage);

        engine.run_harvest_check(date(2025, 4, 28));
        let second = engine.run_harvest_check(date(2025, 4, 28));

        assert!(second.success);
        assert_eq!(second.notifications_created, 0);
        assert_eq!(second.notifications_updated, 0);
        assert_eq!(second.farm_works_created, 0);
        assert_eq!(storage.list_work(&WorkFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn overdue_day_raises_high_overdue_without_new_work() {
        let (_dir, storage) = test_storage();
        let land_id = storage.create_land(&sample_land()).unwrap();
        let engine = engine(&storage);

        engine.run_harvest_check(date(2025, 4, 28));
        let summary = engine.run_harvest_check(date(2025, 5, 2));

        assert_eq!(summary.notifications_created, 1);
        assert_eq!(summary.farm_works_created, 0);

        let overdue = storage
            .find_active_notification(land_id, NotificationKind::HarvestOverdue)
            .unwrap()
            .unwrap();
        assert_eq!(overdue.priority, Priority::High);
        assert_eq!(overdue.metadata.days_until_harvest, Some(-1));
        assert_eq!(storage.list_work(&WorkFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn priority_escalates_and_never_regresses() {
        let (_dir, storage) = test_storage();
        let land_id = storage.create_land(&sample_land()).unwrap();
        let engine = engine(&storage);

        engine.run_harvest_check(date(2025, 4, 28));
        let due = |storage: &Storage| {
            storage
                .find_active_notification(land_id, NotificationKind::HarvestDue)
                .unwrap()
                .unwrap()
        };
        assert_eq!(due(&storage).priority, Priority::Medium);

        let summary = engine.run_harvest_check(date(2025, 4, 30));
        assert_eq!(summary.notifications_updated, 1);
        assert_eq!(due(&storage).priority, Priority::High);

        engine.run_harvest_check(date(2025, 5, 1));
        assert_eq!(due(&storage).priority, Priority::High);

        // Winding the clock back to the two-day window keeps it high.
        engine.run_harvest_check(date(2025, 4, 29));
        assert_eq!(due(&storage).priority, Priority::High);
        assert_eq!(harvest_notifications(&storage, NotificationKind::HarvestDue).len(), 1);
    }

    #[test]
    fn far_harvest_writes_nothing() {
        let (_dir, storage) = test_storage();
        storage.create_land(&sample_land()).unwrap();

        let summary = engine(&storage).run_harvest_check(date(2025, 3, 1));

        assert!(summary.success);
        assert_eq!(summary.lands_processed, 1);
        assert_eq!(summary.notifications_created, 0);
        assert!(harvest_notifications(&storage, NotificationKind::HarvestDue).is_empty());
    }

    #[test]
    fn land_without_cycle_is_excluded() {
        let (_dir, storage) = test_storage();
        let mut land = sample_land();
        land.cycle_days = None;
        storage.create_land(&land).unwrap();

        let summary = engine(&storage).run_harvest_check(date(2025, 4, 28));

        assert!(summary.success);
        assert_eq!(summary.lands_processed, 0);
        assert_eq!(summary.notifications_created, 0);
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn dismissed_notification_is_raised_again() {
        let (_dir, storage) = test_storage();
        let land_id = storage.create_land(&sample_land()).unwrap();
        let engine = engine(&storage);

        engine.run_harvest_check(date(2025, 4, 28));
        let first = storage
            .find_active_notification(land_id, NotificationKind::HarvestDue)
            .unwrap()
            .unwrap();
        storage.dismiss_notification(first.id).unwrap();

        let summary = engine.run_harvest_check(date(2025, 4, 30));

        assert_eq!(summary.notifications_created, 1);
        let second = storage
            .find_active_notification(land_id, NotificationKind::HarvestDue)
            .unwrap()
            .unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.priority, Priority::High);

        // The work raised three days out is untouched by the dismissal.
        let work = storage.list_work(&WorkFilter::default()).unwrap();
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].status, WorkStatus::Created);
    }

    #[test]
    fn new_cycle_gets_new_work() {
        let (_dir, storage) = test_storage();
        let land_id = storage.create_land(&sample_land()).unwrap();
        let engine = engine(&storage);

        engine.run_harvest_check(date(2025, 4, 28));
        storage.record_harvest(land_id, date(2025, 5, 1)).unwrap();

        // Next harvest: 2025-05-01 + 120 days = 2025-08-29.
        let summary = engine.run_harvest_check(date(2025, 8, 26));

        assert_eq!(summary.farm_works_created, 1);
        assert_eq!(summary.notifications_created, 1);
        let work = storage
            .list_work(&WorkFilter {
                land_id: Some(land_id),
                ..WorkFilter::default()
            })
            .unwrap();
        assert_eq!(work.len(), 2);
        assert_eq!(work[1].due_date, date(2025, 8, 29));
    }

    #[test]
    fn harvest_date_moved_outside_cli_starts_fresh_notification() {
        let (_dir, storage) = test_storage();
        let land_id = storage.create_land(&sample_land()).unwrap();
        let engine = engine(&storage);

        engine.run_harvest_check(date(2025, 4, 30));
        let old = storage
            .find_active_notification(land_id, NotificationKind::HarvestDue)
            .unwrap()
            .unwrap();
        assert_eq!(old.priority, Priority::High);
        storage
            .conn()
            .execute(
                "UPDATE lands SET previous_harvest_date = '2025-05-01' WHERE id = ?1",
                [land_id],
            )
            .unwrap();

        let summary = engine.run_harvest_check(date(2025, 8, 26));

        assert_eq!(summary.notifications_created, 1);
        assert_eq!(summary.notifications_updated, 0);
        let current = storage
            .find_active_notification(land_id, NotificationKind::HarvestDue)
            .unwrap()
            .unwrap();
        assert_ne!(current.id, old.id);
        assert_eq!(current.priority, Priority::Medium);
        assert!(current.message.contains("2025-08-29"));
        assert_eq!(current.metadata.harvest_date, Some(date(2025, 8, 29)));

        let old = storage.load_notification(old.id).unwrap();
        assert!(old.is_dismissed);
        assert_eq!(old.status, NotificationStatus::Completed);
    }

    #[test]
    fn work_progress_is_reflected_on_next_run() {
        let (_dir, storage) = test_storage();
        let land_id = storage.create_land(&sample_land()).unwrap();
        let engine = engine(&storage);

        engine.run_harvest_check(date(2025, 4, 28));
        let work = storage.list_work(&WorkFilter::default()).unwrap().remove(0);
        storage
            .update_work_status(work.id, WorkStatus::InProgress)
            .unwrap();

        engine.run_harvest_check(date(2025, 4, 29));

        let notification = storage
            .find_active_notification(land_id, NotificationKind::HarvestDue)
            .unwrap()
            .unwrap();
        assert_eq!(notification.status, NotificationStatus::InProgress);
    }

    #[test]
    fn failing_land_does_not_stop_the_run() {
        let (_dir, storage) = test_storage();
        let broken = storage.create_land(&sample_land()).unwrap();
        let healthy = storage.create_land(&sample_land()).unwrap();
        storage
            .conn()
            .execute_batch(&format!(
                "CREATE TRIGGER reject_broken BEFORE INSERT ON notifications
                 WHEN NEW.land_id = {broken}
                 BEGIN SELECT RAISE(ABORT, 'notification store unavailable'); END;"
            ))
            .unwrap();

        let summary = engine(&storage).run_harvest_check(date(2025, 4, 28));

        assert!(summary.success);
        assert_eq!(summary.lands_processed, 2);
        assert_eq!(summary.notifications_created, 1);
        assert_eq!(summary.farm_works_created, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].land_id, broken);
        assert!(summary.errors[0].message.contains("notification store unavailable"));

        // The failed land rolled back entirely, including its date refresh.
        assert_eq!(storage.load_land(broken).unwrap().next_harvest_date, None);
        assert_eq!(
            storage.load_land(healthy).unwrap().next_harvest_date,
            Some(date(2025, 5, 1))
        );
    }

    #[test]
    fn unreadable_land_is_reported_and_others_continue() {
        let (_dir, storage) = test_storage();
        let broken = storage.create_land(&sample_land()).unwrap();
        storage.create_land(&sample_land()).unwrap();
        storage
            .conn()
            .execute(
                "UPDATE lands SET previous_harvest_date = 'last spring' WHERE id = ?1",
                [broken],
            )
            .unwrap();

        let summary = engine(&storage).run_harvest_check(date(2025, 4, 28));

        assert!(summary.success);
        assert_eq!(summary.lands_processed, 2);
        assert_eq!(summary.notifications_created, 1);
        assert_eq!(summary.farm_works_created, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].land_id, broken);
        assert_eq!(summary.errors[0].land_name, "North field");
        assert!(summary.errors[0].message.starts_with("invalid land record"));
    }

    #[test]
    fn land_without_schedule_is_skipped_when_reached() {
        let (_dir, storage) = test_storage();
        let mut land = sample_land();
        land.previous_harvest_date = None;
        let land_id = storage.create_land(&land).unwrap();
        let land = storage.load_land(land_id).unwrap();

        let outcome = engine(&storage)
            .process_land(&land, date(2025, 4, 28), None)
            .unwrap();

        assert_eq!(outcome, LandOutcome::Skipped);
        assert!(harvest_notifications(&storage, NotificationKind::HarvestDue).is_empty());
    }

    #[test]
    fn missing_lands_table_fails_the_run() {
        let (_dir, storage) = test_storage();
        storage
            .conn()
            .execute_batch("ALTER TABLE lands RENAME TO lands_archived;")
            .unwrap();

        let summary = engine(&storage).run_harvest_check(date(2025, 4, 28));

        assert!(!summary.success);
        assert!(summary.error.unwrap().starts_with("failed to fetch lands"));

        let runs = storage.list_runs(1).unwrap();
        assert!(!runs[0].success);
    }

    #[test]
    fn unknown_work_type_still_creates_untyped_work() {
        let (_dir, storage) = test_storage();
        storage.create_land(&sample_land()).unwrap();
        let engine = Engine::new(
            &storage,
            EngineConfig {
                harvest_work_type: "reaping".into(),
            },
        );

        let summary = engine.run_harvest_check(date(2025, 4, 28));

        assert_eq!(summary.farm_works_created, 1);
        let work = storage.list_work(&WorkFilter::default()).unwrap();
        assert_eq!(work[0].work_type_id, None);
    }

    #[test]
    fn every_run_is_recorded() {
        let (_dir, storage) = test_storage();
        storage.create_land(&sample_land()).unwrap();
        let engine = engine(&storage);

        let first = engine.run_harvest_check(date(2025, 4, 28));
        engine.run_harvest_check(date(2025, 4, 28));

        let runs = storage.list_runs(10).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().any(|r| r.run_id == first.run_id
            && r.notifications_created == 1
            && r.farm_works_created == 1));
    }
}
