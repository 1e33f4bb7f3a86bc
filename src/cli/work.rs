//! Work assignment commands: list, status.

use clap::{Subcommand, ValueEnum};

use crate::{
    model::WorkStatus,
    storage::{Storage, WorkFilter},
    sync,
};

use super::format::format_work;

#[derive(Debug, Subcommand)]
pub enum WorkCommand {
    /// List work assignments by due date.
    List {
        /// Only work on this land.
        #[arg(long)]
        land: Option<i64>,

        /// Only work in this status.
        #[arg(long, value_enum)]
        status: Option<WorkStatusArg>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Change a work assignment's status.
    ///
    /// Progress and completion are mirrored into the linked notification.
    Status {
        /// Work assignment ID.
        id: i64,

        /// New status.
        #[arg(value_enum)]
        status: WorkStatusArg,
    },
}

/// CLI-facing work status, mapped to the domain `WorkStatus`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WorkStatusArg {
    Created,
    Assigned,
    InProgress,
    Completed,
    Canceled,
    Pending,
    Postponed,
}

impl WorkStatusArg {
    fn to_domain(self) -> WorkStatus {
        match self {
            Self::Created => WorkStatus::Created,
            Self::Assigned => WorkStatus::Assigned,
            Self::InProgress => WorkStatus::InProgress,
            Self::Completed => WorkStatus::Completed,
            Self::Canceled => WorkStatus::Canceled,
            Self::Pending => WorkStatus::Pending,
            Self::Postponed => WorkStatus::Postponed,
        }
    }
}

pub(super) fn run(storage: &Storage, command: WorkCommand) -> Result<(), String> {
    match command {
        WorkCommand::List { land, status, json } => cmd_list(
            storage,
            &WorkFilter {
                land_id: land,
                status: status.map(WorkStatusArg::to_domain),
            },
            json,
        ),
        WorkCommand::Status { id, status } => cmd_status(storage, id, status.to_domain()),
    }
}

fn cmd_list(storage: &Storage, filter: &WorkFilter, json: bool) -> Result<(), String> {
    let work = storage
        .list_work(filter)
        .map_err(|e| format!("failed to list work: {e}"))?;

    if json {
        let json = serde_json::to_string_pretty(&work)
            .map_err(|e| format!("failed to serialize work: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    if work.is_empty() {
        println!("No work assignments");
        return Ok(());
    }

    for w in &work {
        println!("{}", format_work(w));
    }
    Ok(())
}

fn cmd_status(storage: &Storage, id: i64, status: WorkStatus) -> Result<(), String> {
    let work = sync::set_work_status(storage, id, status)
        .map_err(|e| format!("failed to update work: {e}"))?;

    eprintln!("Work {} is now {}", work.id, work.status);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_an_argument() {
        let mapped: Vec<WorkStatus> = WorkStatusArg::value_variants()
            .iter()
            .map(|arg| arg.to_domain())
            .collect();
        assert_eq!(mapped, WorkStatus::ALL);
    }

    #[test]
    fn argument_names_match_stored_names() {
        for arg in WorkStatusArg::value_variants() {
            let name = arg.to_possible_value().unwrap().get_name().replace('-', "_");
            assert_eq!(name, arg.to_domain().as_str());
        }
    }
}
