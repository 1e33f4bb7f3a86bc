//! Land commands: add, list, harvested, activate, deactivate.

use clap::Subcommand;
use jiff::civil::Date;

use crate::{
    clock,
    config::Config,
    harvest::HarvestSchedule,
    model::{Land, NewLand},
    storage::Storage,
};

use super::format::format_land;

#[derive(Debug, Subcommand)]
pub enum LandCommand {
    /// Register a land parcel. Prints the land ID.
    Add {
        /// Display name (e.g. "North field").
        name: String,

        /// Short land code (e.g. "N-01").
        #[arg(long)]
        code: String,

        /// Date of the last harvest (YYYY-MM-DD).
        #[arg(long)]
        previous_harvest: Option<Date>,

        /// Days from one harvest to the next.
        #[arg(long)]
        cycle_days: Option<i64>,

        /// User ID of the land's owner. Receives notifications and work.
        #[arg(long)]
        owner: i64,
    },

    /// List all lands.
    List,

    /// Record a harvest, starting the land's next cycle.
    ///
    /// Closes the land's live harvest notifications.
    Harvested {
        /// Land ID.
        id: i64,

        /// Harvest date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        on: Option<Date>,
    },

    /// Include a land in harvest checks again.
    Activate {
        /// Land ID.
        id: i64,
    },

    /// Exclude a land from harvest checks.
    Deactivate {
        /// Land ID.
        id: i64,
    },
}

pub(super) fn run(config: &Config, storage: &Storage, command: LandCommand) -> Result<(), String> {
    match command {
        LandCommand::Add {
            name,
            code,
            previous_harvest,
            cycle_days,
            owner,
        } => cmd_add(
            storage,
            &NewLand {
                name,
                code,
                previous_harvest_date: previous_harvest,
                cycle_days,
                creator_user_id: owner,
            },
        ),
        LandCommand::List => cmd_list(storage),
        LandCommand::Harvested { id, on } => {
            let on = clock::resolve_today(on, config.timezone.as_deref())?;
            cmd_harvested(storage, id, on)
        }
        LandCommand::Activate { id } => cmd_set_active(storage, id, true),
        LandCommand::Deactivate { id } => cmd_set_active(storage, id, false),
    }
}

fn cmd_add(storage: &Storage, land: &NewLand) -> Result<(), String> {
    if land.name.trim().is_empty() {
        return Err("land name must not be empty".to_string());
    }
    if let Some(cycle) = land.cycle_days
        && cycle <= 0
    {
        return Err(format!("--cycle-days must be positive, got {cycle}"));
    }

    let id = storage
        .create_land(land)
        .map_err(|e| format!("failed to create land: {e}"))?;

    println!("{id}");
    Ok(())
}

fn cmd_list(storage: &Storage) -> Result<(), String> {
    let lands = storage
        .list_lands()
        .map_err(|e| format!("failed to list lands: {e}"))?;

    if lands.is_empty() {
        println!("No lands");
        return Ok(());
    }

    for land in &lands {
        println!("{}", format_land(land));
    }
    Ok(())
}

fn cmd_harvested(storage: &Storage, id: i64, on: Date) -> Result<(), String> {
    storage
        .record_harvest(id, on)
        .map_err(|e| format!("failed to record harvest: {e}"))?;
    let land = storage
        .load_land(id)
        .map_err(|e| format!("failed to load land: {e}"))?;

    eprintln!("{} harvested on {on}", land.name);
    if let Some(line) = next_harvest_line(&land)? {
        eprintln!("{line}");
    }
    Ok(())
}

/// The "next harvest" line for a land, or `None` when it has no schedule.
fn next_harvest_line(land: &Land) -> Result<Option<String>, String> {
    let schedule = HarvestSchedule::for_land(land)
        .map_err(|e| format!("failed to compute next harvest for land {}: {e}", land.id))?;
    Ok(schedule.map(|s| format!("Next harvest due {}", s.next_harvest_date)))
}

fn cmd_set_active(storage: &Storage, id: i64, active: bool) -> Result<(), String> {
    storage
        .set_land_active(id, active)
        .map_err(|e| format!("failed to update land: {e}"))?;

    let state = if active { "activated" } else { "deactivated" };
    eprintln!("Land {id} {state}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;

    fn land(previous: Option<Date>, cycle_days: Option<i64>) -> Land {
        Land {
            id: 7,
            name: "North field".to_string(),
            code: "N-01".to_string(),
            active: true,
            previous_harvest_date: previous,
            cycle_days,
            next_harvest_date: None,
            creator_user_id: 10,
        }
    }

    #[test]
    fn next_harvest_line_names_the_date() {
        let line = next_harvest_line(&land(Some(date(2025, 5, 1)), Some(120))).unwrap();
        assert_eq!(line.as_deref(), Some("Next harvest due 2025-08-29"));
    }

    #[test]
    fn next_harvest_line_is_empty_without_cycle() {
        assert_eq!(next_harvest_line(&land(Some(date(2025, 5, 1)), None)).unwrap(), None);
    }

    #[test]
    fn next_harvest_line_reports_out_of_range_date() {
        let err = next_harvest_line(&land(Some(date(9999, 12, 1)), Some(365))).unwrap_err();
        assert!(err.starts_with("failed to compute next harvest for land 7"));
    }
}
