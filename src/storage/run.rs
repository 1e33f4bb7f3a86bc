//! Run history: one row per harvest check.

use rusqlite::Row;

use crate::model::RunRecord;

use super::{Result, Storage, parse_column, timestamp_text};

impl Storage {
    /// Records a finished run.
    pub fn record_run(&self, run: &RunRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO harvest_runs
                 (id, run_date, started_at, finished_at, success, lands_processed, lands_skipped,
                  notifications_created, notifications_updated, farm_works_created,
                  error_count, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                run.run_id.to_string(),
                run.run_date.to_string(),
                timestamp_text(run.started_at),
                timestamp_text(run.finished_at),
                run.success,
                run.lands_processed,
                run.lands_skipped,
                run.notifications_created,
                run.notifications_updated,
                run.farm_works_created,
                run.error_count,
                &run.error,
            ],
        )?;
        Ok(())
    }

    /// Lists the most recent runs, newest first.
    pub fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_date, started_at, finished_at, success, lands_processed,
                    lands_skipped, notifications_created, notifications_updated,
                    farm_works_created, error_count, error
             FROM harvest_runs
             ORDER BY started_at DESC
             LIMIT ?1",
        )?;
        let runs = stmt
            .query_map([limit], run_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        run_id: parse_column(row, 0)?,
        run_date: parse_column(row, 1)?,
        started_at: parse_column(row, 2)?,
        finished_at: parse_column(row, 3)?,
        success: row.get(4)?,
        lands_processed: row.get(5)?,
        lands_skipped: row.get(6)?,
        notifications_created: row.get(7)?,
        notifications_updated: row.get(8)?,
        farm_works_created: row.get(9)?,
        error_count: row.get(10)?,
        error: row.get(11)?,
    })
}
