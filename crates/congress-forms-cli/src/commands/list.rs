use anyhow::Result;
use comfy_table::{Cell, Table};
use congress_forms_core::FormsCore;
use serde_json::json;

use crate::commands::utils::{find_profile, format_timestamp, preview_text};
use crate::output::{OutputFormat, json::print_json, table::print_table};

pub fn list(core: &FormsCore, format: OutputFormat) -> Result<()> {
    let profiles = core.store.legislators.list()?;

    if format.is_json() {
        return print_json(&profiles);
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Bioguide", "Chamber", "State", "Office", "Steps", "Recent", "Updated",
    ]);

    for profile in profiles {
        let recent = core.store.fill_statuses.recent_fill_status(&profile)?;
        table.add_row(vec![
            Cell::new(&profile.bioguide_id),
            Cell::new(profile.chamber.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(&profile.state),
            Cell::new(
                profile
                    .office_code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(profile.steps.len()),
            Cell::new(match recent.success_rate() {
                Some(rate) => format!("{rate}% of {}", recent.total()),
                None => "-".to_string(),
            }),
            Cell::new(format_timestamp(Some(profile.updated_at_ms))),
        ]);
    }

    print_table(table)
}

pub fn show(core: &FormsCore, bioguide_id: &str, format: OutputFormat) -> Result<()> {
    let profile = find_profile(core, bioguide_id)?;

    if format.is_json() {
        let recent = core.store.fill_statuses.recent_fill_status(&profile)?;
        return print_json(&json!({
            "profile": profile,
            "recent_fill_status": recent,
            "badge_url": recent.badge_url(),
        }));
    }

    println!("Bioguide:  {}", profile.bioguide_id);
    println!("State:     {}", profile.state);
    if let Some(code) = profile.office_code() {
        println!("Office:    {code}");
    }
    println!();

    let mut table = Table::new();
    table.set_header(vec!["Id", "Step", "Action", "Selector", "Value", "Required"]);
    for step in profile.ordered_steps() {
        table.add_row(vec![
            Cell::new(step.id),
            Cell::new(step.step),
            Cell::new(step.action),
            Cell::new(preview_text(step.selector.as_deref().unwrap_or("-"), 40)),
            Cell::new(preview_text(step.value.as_deref().unwrap_or("-"), 40)),
            Cell::new(if step.required { "yes" } else { "" }),
        ]);
    }
    print_table(table)
}
