//! Local persistence for lands, notifications, and farm work.
//!
//! Everything lives in a single `SQLite` database:
//!
//! ```text
//! lands          # Land parcels and their harvest schedule
//! work_types     # Work categories (seeded with `harvesting`)
//! notifications  # Alerts raised for land owners
//! farm_works     # Work assignments, at most one per land per cycle
//! harvest_runs   # One row per harvest check
//! ```
//!
//! Enum columns hold their snake-case string encoding; metadata columns
//! hold JSON.

mod land;
mod notification;
mod run;
mod work;

use std::{fs, io, path::Path, path::PathBuf, str::FromStr};

use jiff::{Timestamp, fmt::temporal::DateTimePrinter};
use rusqlite::{Connection, Row, types::Type};
use serde::de::DeserializeOwned;

pub use land::InvalidLand;
pub use notification::NotificationFilter;
pub use work::WorkFilter;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("land not found: {0}")]
    LandNotFound(i64),

    #[error("notification not found: {0}")]
    NotificationNotFound(i64),

    #[error("work assignment not found: {0}")]
    WorkNotFound(i64),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS lands (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    name                  TEXT NOT NULL,
    code                  TEXT NOT NULL,
    active                INTEGER NOT NULL DEFAULT 1,
    previous_harvest_date TEXT,
    cycle_days            INTEGER,
    next_harvest_date     TEXT,
    creator_user_id       INTEGER NOT NULL,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS work_types (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name     TEXT NOT NULL UNIQUE,
    category TEXT NOT NULL
);

INSERT OR IGNORE INTO work_types (name, category) VALUES ('harvesting', 'harvest');

CREATE TABLE IF NOT EXISTS notifications (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    land_id      INTEGER,
    user_id      INTEGER NOT NULL,
    type         TEXT NOT NULL,
    title        TEXT NOT NULL,
    message      TEXT NOT NULL,
    priority     TEXT NOT NULL,
    is_read      INTEGER NOT NULL DEFAULT 0,
    is_dismissed INTEGER NOT NULL DEFAULT 0,
    is_active    INTEGER NOT NULL DEFAULT 1,
    status       TEXT NOT NULL DEFAULT 'pending',
    metadata     TEXT NOT NULL DEFAULT '{}',
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- At most one live harvest notification per land and type.
CREATE UNIQUE INDEX IF NOT EXISTS notifications_live_harvest
    ON notifications (land_id, type)
    WHERE is_dismissed = 0 AND type IN ('harvest_due', 'harvest_overdue');

CREATE TABLE IF NOT EXISTS farm_works (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    land_id          INTEGER,
    work_type_id     INTEGER,
    assigned_team_id INTEGER,
    assigned_user_id INTEGER,
    creator_user_id  INTEGER NOT NULL,
    priority         TEXT NOT NULL,
    status           TEXT NOT NULL,
    due_date         TEXT NOT NULL,
    cycle_key        TEXT,
    metadata         TEXT NOT NULL DEFAULT '{}',
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

-- At most one work assignment per land per harvest cycle.
CREATE UNIQUE INDEX IF NOT EXISTS farm_works_cycle
    ON farm_works (land_id, cycle_key)
    WHERE cycle_key IS NOT NULL;

CREATE TABLE IF NOT EXISTS harvest_runs (
    id                    TEXT PRIMARY KEY,
    run_date              TEXT NOT NULL,
    started_at            TEXT NOT NULL,
    finished_at           TEXT NOT NULL,
    success               INTEGER NOT NULL,
    lands_processed       INTEGER NOT NULL,
    lands_skipped         INTEGER NOT NULL,
    notifications_created INTEGER NOT NULL,
    notifications_updated INTEGER NOT NULL,
    farm_works_created    INTEGER NOT NULL,
    error_count           INTEGER NOT NULL,
    error                 TEXT
);
";

/// `SQLite`-backed storage for the harvest engine.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (or creates) the database at `path` and applies the schema.
    ///
    /// The parent directory is created if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Returns the default database path: `~/.harvest/harvest.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".harvest").join("harvest.sqlite"))
    }

    /// Runs `f` inside a transaction, committing only if it succeeds.
    ///
    /// Any error from `f` rolls back every write it made.
    pub fn in_transaction<T, E>(
        &self,
        f: impl FnOnce() -> core::result::Result<T, E>,
    ) -> core::result::Result<T, E>
    where
        E: From<StorageError>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| E::from(StorageError::from(e)))?;
        let value = f()?;
        tx.commit().map_err(|e| E::from(StorageError::from(e)))?;
        Ok(value)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Timestamp columns always carry nine fractional digits, so text order
/// is time order.
static TIMESTAMP_PRINTER: DateTimePrinter = DateTimePrinter::new().precision(Some(9));

/// Encodes a timestamp for a timestamp column.
fn timestamp_text(ts: Timestamp) -> String {
    TIMESTAMP_PRINTER.timestamp_to_string(&ts)
}

/// Current time as stored in timestamp columns.
fn now() -> String {
    timestamp_text(Timestamp::now())
}

/// Reads a text column and parses it with `FromStr`.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Like [`parse_column`], for nullable columns.
fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Reads a JSON text column.
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
pub(crate) mod testing {
    use tempfile::TempDir;

    use super::Storage;
    use crate::model::NewLand;

    pub(crate) fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path().join("harvest.sqlite")).unwrap();
        (dir, storage)
    }

    pub(crate) fn sample_land() -> NewLand {
        NewLand {
            name: "North field".into(),
            code: "N-01".into(),
            previous_harvest_date: Some(jiff::civil::date(2025, 1, 1)),
            cycle_days: Some(120),
            creator_user_id: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use testing::test_storage;

    #[test]
    fn open_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("harvest.sqlite");

        Storage::open(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn reopening_keeps_schema_and_seed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("harvest.sqlite");

        Storage::open(&path).unwrap();
        let storage = Storage::open(&path).unwrap();

        let count: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM work_types", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn timestamp_text_sorts_in_time_order() {
        let whole = Timestamp::new(1_700_000_000, 0).unwrap();
        let half = Timestamp::new(1_700_000_000, 500_000_000).unwrap();
        let next = Timestamp::new(1_700_000_001, 0).unwrap();

        assert_eq!(timestamp_text(whole), "2023-11-14T22:13:20.000000000Z");
        assert!(timestamp_text(whole) < timestamp_text(half));
        assert!(timestamp_text(half) < timestamp_text(next));
        assert_eq!(timestamp_text(half).parse::<Timestamp>().unwrap(), half);
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let (_dir, storage) = test_storage();

        let result: core::result::Result<(), StorageError> = storage.in_transaction(|| {
            storage.create_land(&testing::sample_land())?;
            Err(StorageError::LandNotFound(99))
        });

        assert!(matches!(result, Err(StorageError::LandNotFound(99))));
        assert!(storage.list_lands().unwrap().is_empty());
    }
}
