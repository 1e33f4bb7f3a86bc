//! Land storage: the data source harvest runs read from.

use jiff::civil::Date;
use rusqlite::{OptionalExtension, Row};

use crate::model::{Land, NewLand};

use super::{Result, Storage, StorageError, now, parse_optional_column};

/// A land row whose stored values could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid land record: {reason}")]
pub struct InvalidLand {
    pub land_id: i64,
    pub land_name: String,
    pub reason: String,
}

const LAND_COLUMNS: &str = "id, name, code, active, previous_harvest_date, cycle_days, \
     next_harvest_date, creator_user_id";

impl Storage {
    /// Inserts a land and returns its ID.
    pub fn create_land(&self, land: &NewLand) -> Result<i64> {
        let now = now();
        self.conn.execute(
            "INSERT INTO lands (name, code, active, previous_harvest_date, cycle_days,
                                creator_user_id, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![
                &land.name,
                &land.code,
                land.previous_harvest_date.map(|d| d.to_string()),
                land.cycle_days,
                land.creator_user_id,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a single land.
    pub fn load_land(&self, id: i64) -> Result<Land> {
        self.conn
            .query_row(
                &format!("SELECT {LAND_COLUMNS} FROM lands WHERE id = ?1"),
                [id],
                land_from_row,
            )
            .optional()?
            .ok_or(StorageError::LandNotFound(id))
    }

    /// Lists all lands, active or not, by ID.
    pub fn list_lands(&self) -> Result<Vec<Land>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {LAND_COLUMNS} FROM lands ORDER BY id"))?;
        let lands = stmt
            .query_map([], land_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lands)
    }

    /// Active lands with a previous harvest date and a positive cycle length.
    ///
    /// Rows are decoded one at a time: a row with malformed values comes
    /// back as an [`InvalidLand`] in its place instead of failing the query.
    pub fn active_harvest_lands(&self) -> Result<Vec<core::result::Result<Land, InvalidLand>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LAND_COLUMNS} FROM lands
             WHERE active = 1
               AND previous_harvest_date IS NOT NULL
               AND cycle_days > 0
             ORDER BY id"
        ))?;
        let lands = stmt
            .query_map([], harvest_land_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lands)
    }

    /// Stores the precomputed next harvest date for a land.
    pub fn set_next_harvest_date(&self, id: i64, date: Date) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE lands SET next_harvest_date = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![date.to_string(), now(), id],
        )?;
        if rows == 0 {
            return Err(StorageError::LandNotFound(id));
        }
        Ok(())
    }

    /// Records a completed harvest, starting the land's next cycle.
    ///
    /// The precomputed next harvest date is cleared; the next run
    /// recomputes it from the new previous date. Live harvest notifications
    /// for the land are closed so the new cycle raises its own.
    pub fn record_harvest(&self, id: i64, harvested_on: Date) -> Result<()> {
        self.in_transaction(|| {
            let rows = self.conn.execute(
                "UPDATE lands
                 SET previous_harvest_date = ?1, next_harvest_date = NULL, updated_at = ?2
                 WHERE id = ?3",
                rusqlite::params![harvested_on.to_string(), now(), id],
            )?;
            if rows == 0 {
                return Err(StorageError::LandNotFound(id));
            }
            self.close_harvest_notifications(id)?;
            Ok(())
        })
    }

    /// Activates or deactivates a land. Inactive lands are never scheduled.
    pub fn set_land_active(&self, id: i64, active: bool) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE lands SET active = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![active, now(), id],
        )?;
        if rows == 0 {
            return Err(StorageError::LandNotFound(id));
        }
        Ok(())
    }
}

/// Decodes a land, turning value errors into [`InvalidLand`].
///
/// Only a row without a readable ID fails outright.
fn harvest_land_from_row(row: &Row<'_>) -> rusqlite::Result<core::result::Result<Land, InvalidLand>> {
    let land_id: i64 = row.get(0)?;
    match land_from_row(row) {
        Ok(land) => Ok(Ok(land)),
        Err(
            e @ (rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)),
        ) => Ok(Err(InvalidLand {
            land_id,
            land_name: row.get::<_, String>(1).unwrap_or_default(),
            reason: e.to_string(),
        })),
        Err(e) => Err(e),
    }
}

fn land_from_row(row: &Row<'_>) -> rusqlite::Result<Land> {
    Ok(Land {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        active: row.get(3)?,
        previous_harvest_date: parse_optional_column(row, 4)?,
        cycle_days: row.get(5)?,
        next_harvest_date: parse_optional_column(row, 6)?,
        creator_user_id: row.get(7)?,
    })
}
