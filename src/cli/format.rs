//! Output formatting for CLI display.

use crate::model::{FarmWork, Land, Notification, RunRecord, RunSummary};

pub(super) fn format_land(land: &Land) -> String {
    let mut line = format!("{:>4}  {:<8} {}", land.id, land.code, land.name);
    match (land.previous_harvest_date, land.cycle_days) {
        (Some(previous), Some(cycle)) => {
            line.push_str(&format!("  last {previous}, every {cycle}d"));
        }
        _ => line.push_str("  no schedule"),
    }
    if let Some(next) = land.next_harvest_date {
        line.push_str(&format!(", next {next}"));
    }
    if !land.active {
        line.push_str("  [inactive]");
    }
    line
}

pub(super) fn format_notification(n: &Notification) -> String {
    let mut flags = vec![n.priority.as_str(), n.status.as_str()];
    if n.is_read {
        flags.push("read");
    }
    format!("{:>4}  [{}]  {}", n.id, flags.join(", "), n.title)
}

pub(super) fn format_work(w: &FarmWork) -> String {
    let land = w
        .metadata
        .land_name
        .clone()
        .or_else(|| w.land_id.map(|id| format!("land {id}")))
        .unwrap_or_else(|| "no land".to_string());
    format!(
        "{:>4}  due {}  [{}, {}]  {land}",
        w.id,
        w.due_date,
        w.priority.as_str(),
        w.status.as_str()
    )
}

pub(super) fn format_run(r: &RunRecord) -> String {
    let short_id = &r.run_id.to_string()[..8];
    let outcome = if r.success { "ok" } else { "failed" };
    let mut line = format!(
        "{short_id}  {}  {outcome}  {}",
        r.run_date,
        format_counts(
            r.lands_processed,
            r.notifications_created,
            r.notifications_updated,
            r.farm_works_created,
        )
    );
    if r.error_count > 0 {
        line.push_str(&format!(", {} land error(s)", r.error_count));
    }
    if let Some(error) = &r.error {
        line.push_str(&format!("  ({error})"));
    }
    line
}

/// Multi-line human summary of a harvest check, for stderr.
pub(super) fn format_summary(s: &RunSummary) -> String {
    let mut out = if s.success {
        format!(
            "Harvest check for {}: {}",
            s.run_date,
            format_counts(
                s.lands_processed,
                s.notifications_created,
                s.notifications_updated,
                s.farm_works_created,
            )
        )
    } else {
        format!(
            "Harvest check for {} failed: {}",
            s.run_date,
            s.error.as_deref().unwrap_or("unknown error")
        )
    };
    for e in &s.errors {
        out.push_str(&format!("\n  land {} ({}): {}", e.land_id, e.land_name, e.message));
    }
    out
}

fn format_counts(processed: u32, created: u32, updated: u32, works: u32) -> String {
    format!(
        "{processed} land(s), {created} notification(s) created, {updated} updated, \
         {works} work assignment(s) created"
    )
}
