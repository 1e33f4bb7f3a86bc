//! Harvest date arithmetic.
//!
//! All dates are calendar dates with no time-of-day component, so
//! "days until harvest" never suffers partial-day truncation.

use jiff::{Span, civil::Date};

use crate::model::Land;

/// Errors from harvest date arithmetic.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("harvest date out of range: {previous} + {cycle_days} days")]
    OutOfRange {
        previous: Date,
        cycle_days: i64,
        #[source]
        source: jiff::Error,
    },

    #[error("cannot count days from {today} to {harvest}: {source}")]
    Difference {
        today: Date,
        harvest: Date,
        #[source]
        source: jiff::Error,
    },
}

/// A land's current harvest cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestSchedule {
    pub previous_harvest_date: Date,
    pub cycle_days: i64,
    pub next_harvest_date: Date,
}

impl HarvestSchedule {
    /// Derives the schedule for a land.
    ///
    /// Returns `Ok(None)` when the land cannot be scheduled: no previous
    /// harvest date, or a missing, zero, or negative cycle length.
    pub fn for_land(land: &Land) -> Result<Option<Self>, ScheduleError> {
        let (Some(previous), Some(cycle_days)) = (land.previous_harvest_date, land.cycle_days)
        else {
            return Ok(None);
        };
        if cycle_days <= 0 {
            return Ok(None);
        }
        let next = next_harvest_date(previous, cycle_days)?;
        Ok(Some(Self {
            previous_harvest_date: previous,
            cycle_days,
            next_harvest_date: next,
        }))
    }

    /// Signed days from `today` until this cycle's harvest.
    pub fn days_until_harvest(&self, today: Date) -> Result<i32, ScheduleError> {
        days_until_harvest(self.next_harvest_date, today)
    }
}

/// `previous + cycle_days`, in whole calendar days.
pub fn next_harvest_date(previous: Date, cycle_days: i64) -> Result<Date, ScheduleError> {
    Span::new()
        .try_days(cycle_days)
        .and_then(|span| previous.checked_add(span))
        .map_err(|source| ScheduleError::OutOfRange {
            previous,
            cycle_days,
            source,
        })
}

/// Signed day count from `today` to `harvest`.
///
/// Positive: days remaining. Zero: due today. Negative: days overdue.
pub fn days_until_harvest(harvest: Date, today: Date) -> Result<i32, ScheduleError> {
    today
        .until(harvest)
        .map(|span| span.get_days())
        .map_err(|source| ScheduleError::Difference {
            today,
            harvest,
            source,
        })
}
