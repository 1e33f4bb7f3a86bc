//! Resolution of "today" for harvest runs.
//!
//! Due dates are calendar dates, so a run needs one civil date to measure
//! against. It is resolved through a chain:
//!
//! 1. `--today <YYYY-MM-DD>`: explicit per-run override
//! 2. `HARVEST_TODAY` env var: pinned date for replays and staging
//! 3. the current date in the configured time zone (system zone if unset)

use std::env;

use jiff::{Timestamp, civil::Date, tz::TimeZone};

/// Environment variable that pins the run date.
pub const TODAY_ENV: &str = "HARVEST_TODAY";

/// Resolve the run date from the tiered resolution chain.
pub fn resolve_today(explicit: Option<Date>, timezone: Option<&str>) -> Result<Date, String> {
    let pinned = env::var(TODAY_ENV).ok();
    resolve(explicit, pinned.as_deref(), timezone, Timestamp::now())
}

fn resolve(
    explicit: Option<Date>,
    pinned: Option<&str>,
    timezone: Option<&str>,
    now: Timestamp,
) -> Result<Date, String> {
    // 1. Explicit --today flag.
    if let Some(date) = explicit {
        return Ok(date);
    }

    // 2. HARVEST_TODAY environment variable.
    if let Some(value) = pinned.map(str::trim).filter(|v| !v.is_empty()) {
        return value
            .parse()
            .map_err(|e| format!("invalid {TODAY_ENV} '{value}': {e}"));
    }

    // 3. The clock, in the configured zone.
    let tz = match timezone {
        Some(name) => {
            TimeZone::get(name).map_err(|e| format!("unknown time zone '{name}': {e}"))?
        }
        None => TimeZone::system(),
    };
    Ok(now.to_zoned(tz).date())
}
