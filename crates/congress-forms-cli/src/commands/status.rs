use anyhow::{Result, bail};
use chrono::{DateTime, Duration, Utc};
use comfy_table::{Cell, Table};
use congress_forms_core::{FillOutcome, FormsCore, RecentFillStatus};
use serde_json::json;
use std::collections::BTreeMap;

use crate::cli::StatusArgs;
use crate::commands::utils::{format_timestamp, preview_text};
use crate::output::{OutputFormat, json::print_json, table::print_table};

pub fn run(core: &FormsCore, args: StatusArgs, format: OutputFormat) -> Result<()> {
    let now = Utc::now();
    let since = window_start(now, args.days)?;

    match args.bioguide_id {
        Some(bioguide_id) => legislator_status(core, &bioguide_id, since, format),
        None => {
            let outcomes = core
                .store
                .fill_statuses
                .list_between(since, now.timestamp_millis() + 1)?;
            summary(outcomes, format)
        }
    }
}

/// Start of the `days`-long window ending at `now`, in epoch millis.
fn window_start(now: DateTime<Utc>, days: i64) -> Result<i64> {
    if days < 0 {
        bail!("--days must not be negative (got {days})");
    }
    match Duration::try_days(days).and_then(|window| now.checked_sub_signed(window)) {
        Some(start) => Ok(start.timestamp_millis()),
        None => bail!("--days {days} reaches past the earliest representable date"),
    }
}

fn legislator_status(core: &FormsCore, bioguide_id: &str, since: i64, format: OutputFormat) -> Result<()> {
    let outcomes = core.store.fill_statuses.list_since(bioguide_id, since)?;
    let counts = RecentFillStatus::from_outcomes(&outcomes);

    if format.is_json() {
        return print_json(&json!({
            "bioguide_id": bioguide_id,
            "counts": counts,
            "badge_url": counts.badge_url(),
            "outcomes": outcomes,
        }));
    }

    let mut table = Table::new();
    table.set_header(vec!["Created", "Status", "Campaign", "Fault"]);
    for outcome in &outcomes {
        table.add_row(vec![
            Cell::new(format_timestamp(Some(outcome.created_at_ms))),
            Cell::new(outcome.status),
            Cell::new(outcome.campaign_tag.as_deref().unwrap_or("-")),
            Cell::new(preview_text(outcome.extra.fault.as_deref().unwrap_or("-"), 60)),
        ]);
    }
    print_table(table)?;
    println!(
        "{} successes, {} failures, {} errors",
        counts.successes, counts.failures, counts.errors
    );
    Ok(())
}

fn summary(outcomes: Vec<FillOutcome>, format: OutputFormat) -> Result<()> {
    let mut grouped: BTreeMap<String, Vec<FillOutcome>> = BTreeMap::new();
    for outcome in outcomes {
        grouped.entry(outcome.bioguide_id.clone()).or_default().push(outcome);
    }
    let counts: BTreeMap<String, RecentFillStatus> = grouped
        .iter()
        .map(|(id, outcomes)| (id.clone(), RecentFillStatus::from_outcomes(outcomes)))
        .collect();

    if format.is_json() {
        return print_json(&counts);
    }

    let mut table = Table::new();
    table.set_header(vec!["Bioguide", "Success", "Failure", "Error", "Rate"]);
    for (bioguide_id, status) in &counts {
        table.add_row(vec![
            Cell::new(bioguide_id),
            Cell::new(status.successes),
            Cell::new(status.failures),
            Cell::new(status.errors),
            Cell::new(
                status
                    .success_rate()
                    .map(|rate| format!("{rate}%"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    print_table(table)
}
