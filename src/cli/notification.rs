//! Notification commands: list, read, dismiss, complete.

use clap::Subcommand;

use crate::{
    model::NotificationStatus,
    storage::{NotificationFilter, Storage},
};

use super::format::format_notification;

#[derive(Debug, Subcommand)]
pub enum NotificationCommand {
    /// List notifications, newest first.
    List {
        /// Only notifications for this user.
        #[arg(long)]
        user: Option<i64>,

        /// Only notifications about this land.
        #[arg(long)]
        land: Option<i64>,

        /// Include dismissed notifications.
        #[arg(long)]
        all: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Mark a notification as read.
    Read {
        /// Notification ID.
        id: i64,
    },

    /// Dismiss a notification. A later, more urgent alert is still raised.
    Dismiss {
        /// Notification ID.
        id: i64,
    },

    /// Mark a notification as completed.
    Complete {
        /// Notification ID.
        id: i64,
    },
}

pub(super) fn run(storage: &Storage, command: NotificationCommand) -> Result<(), String> {
    match command {
        NotificationCommand::List {
            user,
            land,
            all,
            json,
        } => cmd_list(
            storage,
            &NotificationFilter {
                user_id: user,
                land_id: land,
                include_dismissed: all,
            },
            json,
        ),
        NotificationCommand::Read { id } => {
            storage
                .mark_notification_read(id)
                .map_err(|e| format!("failed to mark notification read: {e}"))?;
            eprintln!("Notification {id} marked read");
            Ok(())
        }
        NotificationCommand::Dismiss { id } => {
            storage
                .dismiss_notification(id)
                .map_err(|e| format!("failed to dismiss notification: {e}"))?;
            eprintln!("Notification {id} dismissed");
            Ok(())
        }
        NotificationCommand::Complete { id } => {
            storage
                .set_notification_status(id, NotificationStatus::Completed)
                .map_err(|e| format!("failed to complete notification: {e}"))?;
            eprintln!("Notification {id} completed");
            Ok(())
        }
    }
}

fn cmd_list(storage: &Storage, filter: &NotificationFilter, json: bool) -> Result<(), String> {
    let notifications = storage
        .list_notifications(filter)
        .map_err(|e| format!("failed to list notifications: {e}"))?;

    if json {
        let json = serde_json::to_string_pretty(&notifications)
            .map_err(|e| format!("failed to serialize notifications: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    if notifications.is_empty() {
        println!("No notifications");
        return Ok(());
    }

    for n in &notifications {
        println!("{}", format_notification(n));
    }
    Ok(())
}
