use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use congress_forms_core::{FormsCore, ProfileDocument};
use serde_json::json;
use std::path::PathBuf;

use crate::output::{OutputFormat, json::print_json, table::print_table};

pub fn run(core: &FormsCore, files: &[PathBuf], format: OutputFormat) -> Result<()> {
    let mut imported = Vec::new();

    for path in files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        let profile = ProfileDocument::from_yaml(&content)
            .and_then(|doc| doc.into_profile().map_err(Into::into))
            .with_context(|| format!("Invalid profile {}", path.display()))?;
        let profile = core.store.legislators.import(profile)?;
        imported.push(profile);
    }

    if format.is_json() {
        let rows: Vec<_> = imported
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "bioguide_id": p.bioguide_id,
                    "steps": p.steps.len(),
                    "office_code": p.office_code().map(|c| c.to_string()),
                })
            })
            .collect();
        return print_json(&rows);
    }

    let mut table = Table::new();
    table.set_header(vec!["Bioguide", "Steps", "Office", "Captcha"]);
    for profile in &imported {
        table.add_row(vec![
            Cell::new(&profile.bioguide_id),
            Cell::new(profile.steps.len()),
            Cell::new(
                profile
                    .office_code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(if profile.has_captcha() { "yes" } else { "no" }),
        ]);
    }
    print_table(table)
}
