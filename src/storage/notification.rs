//! Notification ledger: the persistence gateway for notifications.
//!
//! Harvest runs go through `find_active_notification` before creating
//! anything, so a land never carries two live notifications of one kind.
//! The partial unique index in the schema backs the same rule.

use jiff::{Timestamp, civil::Date};
use rusqlite::{OptionalExtension, Row};

use crate::model::{
    NewNotification, Notification, NotificationKind, NotificationMetadata, NotificationStatus,
    Priority,
};

use super::{Result, Storage, StorageError, json_column, now, parse_column, timestamp_text};

const NOTIFICATION_COLUMNS: &str = "id, land_id, user_id, type, title, message, priority, \
     is_read, is_dismissed, is_active, status, metadata, created_at, updated_at";

const CLOSE_HARVEST: &str =
    "UPDATE notifications SET is_dismissed = 1, status = ?1, updated_at = ?2";

const LIVE_HARVEST: &str =
    "is_dismissed = 0 AND type IN ('harvest_due', 'harvest_overdue')";

/// Narrows `list_notifications`. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub user_id: Option<i64>,
    pub land_id: Option<i64>,

    /// Include dismissed notifications.
    pub include_dismissed: bool,
}

impl Storage {
    /// Finds the non-dismissed notification of `kind` for a land, if any.
    pub fn find_active_notification(
        &self,
        land_id: i64,
        kind: NotificationKind,
    ) -> Result<Option<Notification>> {
        let notification = self
            .conn
            .query_row(
                &format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                     WHERE land_id = ?1 AND type = ?2 AND is_dismissed = 0
                     ORDER BY id DESC
                     LIMIT 1"
                ),
                rusqlite::params![land_id, kind.as_str()],
                notification_from_row,
            )
            .optional()?;
        Ok(notification)
    }

    /// Inserts a notification in the `pending` state and returns its ID.
    pub fn create_notification(&self, notification: &NewNotification) -> Result<i64> {
        let metadata = serde_json::to_string(&notification.metadata)?;
        let now = now();
        self.conn.execute(
            "INSERT INTO notifications
                 (land_id, user_id, type, title, message, priority, status, metadata,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            rusqlite::params![
                notification.land_id,
                notification.user_id,
                notification.kind.as_str(),
                &notification.title,
                &notification.message,
                notification.priority.as_str(),
                NotificationStatus::Pending.as_str(),
                metadata,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Updates priority and metadata in place.
    ///
    /// Read and dismissed state are left untouched.
    pub fn update_notification_priority(
        &self,
        id: i64,
        priority: Priority,
        metadata: &NotificationMetadata,
    ) -> Result<()> {
        let metadata = serde_json::to_string(metadata)?;
        let rows = self.conn.execute(
            "UPDATE notifications SET priority = ?1, metadata = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![priority.as_str(), metadata, now(), id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotificationNotFound(id));
        }
        Ok(())
    }

    /// Loads a single notification.
    pub fn load_notification(&self, id: i64) -> Result<Notification> {
        self.conn
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                [id],
                notification_from_row,
            )
            .optional()?
            .ok_or(StorageError::NotificationNotFound(id))
    }

    /// Lists active notifications, newest first.
    pub fn list_notifications(&self, filter: &NotificationFilter) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE is_active = 1
               AND (?1 IS NULL OR user_id = ?1)
               AND (?2 IS NULL OR land_id = ?2)
               AND (?3 OR is_dismissed = 0)
             ORDER BY created_at DESC, id DESC"
        ))?;
        let notifications = stmt
            .query_map(
                rusqlite::params![filter.user_id, filter.land_id, filter.include_dismissed],
                notification_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    /// Marks a notification as read.
    pub fn mark_notification_read(&self, id: i64) -> Result<()> {
        self.update_notification(id, "is_read = 1", &[])
    }

    /// Dismisses a notification.
    ///
    /// A dismissed notification no longer blocks a new one of the same kind.
    pub fn dismiss_notification(&self, id: i64) -> Result<()> {
        self.update_notification(
            id,
            "is_dismissed = 1, status = ?",
            &[NotificationStatus::Dismissed.as_str()],
        )
    }

    /// Sets a notification's lifecycle status.
    ///
    /// Use [`Storage::dismiss_notification`] to dismiss; it also sets the
    /// dismissed flag.
    pub fn set_notification_status(&self, id: i64, status: NotificationStatus) -> Result<()> {
        self.update_notification(id, "status = ?", &[status.as_str()])
    }

    /// Closes a land's live harvest notifications (status `completed`,
    /// dismissed). Returns the number closed.
    pub fn close_harvest_notifications(&self, land_id: i64) -> Result<usize> {
        let rows = self.conn.execute(
            &format!("{CLOSE_HARVEST} WHERE land_id = ?3 AND {LIVE_HARVEST}"),
            rusqlite::params![NotificationStatus::Completed.as_str(), now(), land_id],
        )?;
        Ok(rows)
    }

    /// Closes a land's live harvest notifications raised for a harvest date
    /// other than `current`. Rows without a harvest date are left alone.
    pub fn close_stale_harvest_notifications(&self, land_id: i64, current: Date) -> Result<usize> {
        let rows = self.conn.execute(
            &format!(
                "{CLOSE_HARVEST}
                 WHERE land_id = ?3 AND {LIVE_HARVEST}
                   AND json_extract(metadata, '$.harvest_date') IS NOT NULL
                   AND json_extract(metadata, '$.harvest_date') != ?4"
            ),
            rusqlite::params![
                NotificationStatus::Completed.as_str(),
                now(),
                land_id,
                current.to_string(),
            ],
        )?;
        Ok(rows)
    }

    /// Deletes dismissed notifications last touched before `cutoff`.
    ///
    /// Returns the number of rows removed.
    pub fn cleanup_notifications(&self, cutoff: Timestamp) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM notifications WHERE is_dismissed = 1 AND updated_at < ?1",
            [timestamp_text(cutoff)],
        )?;
        Ok(rows)
    }

    /// Applies `assignments` (with `?` placeholders for `values`) and bumps
    /// `updated_at`.
    fn update_notification(&self, id: i64, assignments: &str, values: &[&str]) -> Result<()> {
        let sql = format!("UPDATE notifications SET {assignments}, updated_at = ? WHERE id = ?");
        let now = now();
        let mut params: Vec<&dyn rusqlite::ToSql> =
            values.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
        params.push(&now);
        params.push(&id);
        let rows = self.conn.execute(&sql, params.as_slice())?;
        if rows == 0 {
            return Err(StorageError::NotificationNotFound(id));
        }
        Ok(())
    }
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        land_id: row.get(1)?,
        user_id: row.get(2)?,
        kind: parse_column(row, 3)?,
        title: row.get(4)?,
        message: row.get(5)?,
        priority: parse_column(row, 6)?,
        is_read: row.get(7)?,
        is_dismissed: row.get(8)?,
        is_active: row.get(9)?,
        status: parse_column(row, 10)?,
        metadata: json_column::<NotificationMetadata>(row, 11)?,
        created_at: parse_column(row, 12)?,
        updated_at: parse_column(row, 13)?,
    })
}
