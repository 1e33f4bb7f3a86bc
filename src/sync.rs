//! Work assignment synchronizer.
//!
//! Harvest runs create at most one work assignment per land per harvest
//! cycle. After that the two records are owned separately: work status is
//! driven by work management, and flows one way into the linked
//! notification. Reading or dismissing a notification never touches its
//! work, since the harvest still has to happen.

use tracing::{debug, info};

use crate::harvest::HarvestSchedule;
use crate::model::{
    CycleKey, FarmWork, HARVEST_NOTIFICATION_SOURCE, Land, NewFarmWork, Notification,
    NotificationStatus, Priority, WorkMetadata, WorkStatus,
};
use crate::storage::{Result, Storage};

/// Everything needed to raise the work for one harvest cycle.
#[derive(Debug, Clone, Copy)]
pub struct HarvestWork<'a> {
    pub land: &'a Land,
    pub schedule: &'a HarvestSchedule,
    pub priority: Priority,
    pub notification_id: i64,
    pub work_type_id: Option<i64>,
}

impl HarvestWork<'_> {
    pub fn cycle_key(&self) -> CycleKey {
        CycleKey::new(self.land.id, self.schedule.next_harvest_date)
    }
}

/// Finds the work already raised for a land's harvest cycle.
pub fn find_existing_work_for_cycle(
    storage: &Storage,
    land_id: i64,
    cycle: &CycleKey,
) -> Result<Option<FarmWork>> {
    storage.find_work_for_cycle(land_id, cycle)
}

/// Creates the cycle's work assignment unless one already exists.
///
/// Returns the new work, or `None` if the cycle already had one.
pub fn create_harvest_work(storage: &Storage, work: &HarvestWork<'_>) -> Result<Option<FarmWork>> {
    let cycle_key = work.cycle_key();
    if let Some(existing) = find_existing_work_for_cycle(storage, work.land.id, &cycle_key)? {
        debug!(
            land_id = work.land.id,
            work_id = existing.id,
            cycle = %cycle_key,
            "work already exists for cycle"
        );
        return Ok(None);
    }

    let harvest_date = work.schedule.next_harvest_date;
    let id = storage.create_work(&NewFarmWork {
        land_id: work.land.id,
        work_type_id: work.work_type_id,
        assigned_user_id: Some(work.land.creator_user_id),
        creator_user_id: work.land.creator_user_id,
        priority: work.priority,
        due_date: harvest_date,
        cycle_key: cycle_key.clone(),
        metadata: WorkMetadata {
            created_from: HARVEST_NOTIFICATION_SOURCE.to_string(),
            land_name: Some(work.land.name.clone()),
            land_code: Some(work.land.code.clone()),
            harvest_date: Some(harvest_date),
            cycle_key: Some(cycle_key.clone()),
            notification_id: Some(work.notification_id),
        },
    })?;
    info!(
        land_id = work.land.id,
        work_id = id,
        due = %harvest_date,
        cycle = %cycle_key,
        "created harvest work"
    );
    storage.load_work(id).map(Some)
}

/// The notification status implied by a work status, if any.
///
/// Only progress on the work is mirrored. Assignment bookkeeping and
/// cancellation leave the notification alone.
pub fn notification_status_for(work: WorkStatus) -> Option<NotificationStatus> {
    match work {
        WorkStatus::InProgress => Some(NotificationStatus::InProgress),
        WorkStatus::Completed => Some(NotificationStatus::Completed),
        WorkStatus::Created
        | WorkStatus::Assigned
        | WorkStatus::Pending
        | WorkStatus::Postponed
        | WorkStatus::Canceled => None,
    }
}

/// Brings a notification's status in line with its work.
///
/// Dismissed notifications are left as they are. Returns whether the
/// notification changed.
pub fn sync_status(storage: &Storage, notification: &Notification, work: &FarmWork) -> Result<bool> {
    if notification.is_dismissed {
        return Ok(false);
    }
    let Some(status) = notification_status_for(work.status) else {
        return Ok(false);
    };
    if notification.status == status {
        return Ok(false);
    }
    storage.set_notification_status(notification.id, status)?;
    debug!(
        notification_id = notification.id,
        work_id = work.id,
        status = %status,
        "synced notification status from work"
    );
    Ok(true)
}

/// Applies a work-management status change and syncs the linked notification.
pub fn set_work_status(storage: &Storage, work_id: i64, status: WorkStatus) -> Result<FarmWork> {
    storage.in_transaction(|| {
        storage.update_work_status(work_id, status)?;
        let work = storage.load_work(work_id)?;
        if let Some(notification_id) = work.metadata.notification_id {
            // The notification may have been cleaned up; the work stands alone then.
            match storage.load_notification(notification_id) {
                Ok(notification) => {
                    sync_status(storage, &notification, &work)?;
                }
                Err(crate::storage::StorageError::NotificationNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(work)
    })
}
