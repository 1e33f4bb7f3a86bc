//! CLI interface for Harvest.
//!
//! Every subcommand is non-interactive: arguments in, text or JSON out.
//! Logs go to stderr; stdout carries only command output.
//!
//! - `harvest run`: one harvest check, meant to be run daily from cron.
//! - `harvest land|notification|work`: inspect and act on stored records.
//! - `harvest runs|cleanup`: run history and housekeeping.

mod format;
mod land;
mod notification;
mod work;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use jiff::{SignedDuration, Timestamp, civil::Date};

use crate::{
    clock,
    config::Config,
    engine::Engine,
    logging,
    storage::Storage,
};

use format::{format_run, format_summary};
use land::LandCommand;
use notification::NotificationCommand;
use work::WorkCommand;

/// Harvest reminders and work assignments for farm land.
#[derive(Debug, Parser)]
#[command(name = "harvest", version, after_long_help = SCHEDULING_HELP)]
pub struct Cli {
    /// Config file. Defaults to `~/.harvest/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file. Overrides the configured one.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const SCHEDULING_HELP: &str = r"Scheduling:
  Run once a day, e.g. from cron:
    0 6 * * *  harvest run --json >> /var/log/harvest.jsonl

  Replay a past day:
    harvest run --today 2025-04-28
    HARVEST_TODAY=2025-04-28 harvest run";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one harvest check over every active land.
    ///
    /// Creates or escalates harvest notifications and raises the work
    /// assignment three days before harvest. Safe to repeat: an unchanged
    /// land produces no new records. Exits non-zero when the run fails.
    Run {
        /// Date to check against (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<Date>,

        /// Print the run summary as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Manage lands and their harvest schedule.
    Land {
        #[command(subcommand)]
        command: LandCommand,
    },

    /// List and act on notifications.
    Notification {
        #[command(subcommand)]
        command: NotificationCommand,
    },

    /// List and update work assignments.
    Work {
        #[command(subcommand)]
        command: WorkCommand,
    },

    /// Show recent harvest checks, newest first.
    Runs {
        /// Number of runs to show.
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Delete dismissed notifications that have not changed in a while.
    Cleanup {
        /// Minimum age in days since the notification last changed.
        #[arg(long, default_value_t = 30)]
        older_than_days: u32,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    logging::init_logging(&config.log_level, config.log_format)?;

    let path = cli
        .database
        .or_else(|| config.database_path())
        .ok_or("could not determine home directory")?;
    let storage = open_storage(&path)?;

    match cli.command {
        Command::Run { today, json } => cmd_run(&config, &storage, today, json),
        Command::Land { command } => land::run(&config, &storage, command),
        Command::Notification { command } => notification::run(&storage, command),
        Command::Work { command } => work::run(&storage, command),
        Command::Runs { limit } => cmd_runs(&storage, limit),
        Command::Cleanup { older_than_days } => cmd_cleanup(&storage, older_than_days),
    }
}

fn open_storage(path: &Path) -> Result<Storage, String> {
    Storage::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))
}

fn cmd_run(
    config: &Config,
    storage: &Storage,
    today: Option<Date>,
    json: bool,
) -> Result<(), String> {
    let today = clock::resolve_today(today, config.timezone.as_deref())?;

    let summary = Engine::new(storage, config.engine()).run_harvest_check(today);

    if json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| format!("failed to serialize run summary: {e}"))?;
        println!("{json}");
    } else {
        eprintln!("{}", format_summary(&summary));
    }

    if summary.success {
        Ok(())
    } else {
        Err(format!(
            "harvest check failed: {}",
            summary.error.as_deref().unwrap_or("unknown error")
        ))
    }
}

fn cmd_runs(storage: &Storage, limit: u32) -> Result<(), String> {
    let runs = storage
        .list_runs(limit)
        .map_err(|e| format!("failed to list runs: {e}"))?;

    if runs.is_empty() {
        println!("No runs");
        return Ok(());
    }

    for r in &runs {
        println!("{}", format_run(r));
    }
    Ok(())
}

fn cmd_cleanup(storage: &Storage, older_than_days: u32) -> Result<(), String> {
    let age = SignedDuration::from_hours(i64::from(older_than_days) * 24);
    let cutoff = Timestamp::now()
        .checked_sub(age)
        .map_err(|e| format!("invalid age of {older_than_days} days: {e}"))?;

    let removed = storage
        .cleanup_notifications(cutoff)
        .map_err(|e| format!("failed to clean up notifications: {e}"))?;

    eprintln!("Removed {removed} dismissed notification(s)");
    Ok(())
}
