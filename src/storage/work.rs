//! Farm work storage: work assignments and work types.

use rusqlite::{OptionalExtension, Row};

use crate::model::{CycleKey, FarmWork, NewFarmWork, WorkMetadata, WorkStatus, WorkType};

use super::{Result, Storage, StorageError, json_column, now, parse_column};

const WORK_COLUMNS: &str = "id, land_id, work_type_id, assigned_team_id, assigned_user_id, \
     creator_user_id, priority, status, due_date, cycle_key, metadata, created_at, updated_at";

/// Narrows `list_work`. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct WorkFilter {
    pub land_id: Option<i64>,
    pub status: Option<WorkStatus>,
}

impl Storage {
    /// Finds the work assignment for one land's harvest cycle, if any.
    pub fn find_work_for_cycle(&self, land_id: i64, cycle: &CycleKey) -> Result<Option<FarmWork>> {
        let work = self
            .conn
            .query_row(
                &format!(
                    "SELECT {WORK_COLUMNS} FROM farm_works
                     WHERE land_id = ?1 AND cycle_key = ?2
                     LIMIT 1"
                ),
                rusqlite::params![land_id, cycle.as_str()],
                work_from_row,
            )
            .optional()?;
        Ok(work)
    }

    /// Inserts a work assignment in the `created` state and returns its ID.
    pub fn create_work(&self, work: &NewFarmWork) -> Result<i64> {
        let metadata = serde_json::to_string(&work.metadata)?;
        let now = now();
        self.conn.execute(
            "INSERT INTO farm_works
                 (land_id, work_type_id, assigned_user_id, creator_user_id, priority, status,
                  due_date, cycle_key, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            rusqlite::params![
                work.land_id,
                work.work_type_id,
                work.assigned_user_id,
                work.creator_user_id,
                work.priority.as_str(),
                WorkStatus::Created.as_str(),
                work.due_date.to_string(),
                work.cycle_key.as_str(),
                metadata,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a single work assignment.
    pub fn load_work(&self, id: i64) -> Result<FarmWork> {
        self.conn
            .query_row(
                &format!("SELECT {WORK_COLUMNS} FROM farm_works WHERE id = ?1"),
                [id],
                work_from_row,
            )
            .optional()?
            .ok_or(StorageError::WorkNotFound(id))
    }

    /// Lists work assignments by due date.
    pub fn list_work(&self, filter: &WorkFilter) -> Result<Vec<FarmWork>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WORK_COLUMNS} FROM farm_works
             WHERE (?1 IS NULL OR land_id = ?1)
               AND (?2 IS NULL OR status = ?2)
             ORDER BY due_date, id"
        ))?;
        let work = stmt
            .query_map(
                rusqlite::params![filter.land_id, filter.status.map(WorkStatus::as_str)],
                work_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(work)
    }

    /// Sets a work assignment's status.
    pub fn update_work_status(&self, id: i64, status: WorkStatus) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE farm_works SET status = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![status.as_str(), now(), id],
        )?;
        if rows == 0 {
            return Err(StorageError::WorkNotFound(id));
        }
        Ok(())
    }

    /// Looks up a work type by name.
    pub fn work_type_by_name(&self, name: &str) -> Result<Option<WorkType>> {
        let work_type = self
            .conn
            .query_row(
                "SELECT id, name, category FROM work_types WHERE name = ?1",
                [name],
                |row| {
                    Ok(WorkType {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        category: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(work_type)
    }
}

fn work_from_row(row: &Row<'_>) -> rusqlite::Result<FarmWork> {
    Ok(FarmWork {
        id: row.get(0)?,
        land_id: row.get(1)?,
        work_type_id: row.get(2)?,
        assigned_team_id: row.get(3)?,
        assigned_user_id: row.get(4)?,
        creator_user_id: row.get(5)?,
        priority: parse_column(row, 6)?,
        status: parse_column(row, 7)?,
        due_date: parse_column(row, 8)?,
        cycle_key: row.get::<_, Option<String>>(9)?.map(CycleKey::from),
        metadata: json_column::<WorkMetadata>(row, 10)?,
        created_at: parse_column(row, 11)?,
        updated_at: parse_column(row, 12)?,
    })
}
