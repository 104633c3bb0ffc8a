use anyhow::{Result, bail};
use comfy_table::{Cell, Table};
use congress_forms_core::Choices;
use congress_forms_core::FormsCore;
use congress_forms_core::required::{RequiredField, cwc_required_fields, required_fields};

use crate::commands::utils::{find_profile, preview_text};
use crate::output::{OutputFormat, json::print_json, table::print_table};

pub fn run(core: &FormsCore, bioguide_id: Option<&str>, cwc: bool, format: OutputFormat) -> Result<()> {
    let fields = match (bioguide_id, cwc) {
        (_, true) => cwc_required_fields(),
        (Some(id), false) => required_fields(&find_profile(core, id)?),
        (None, false) => bail!("Pass a bioguide id or --cwc"),
    };

    if format.is_json() {
        return print_json(&fields);
    }

    let mut table = Table::new();
    table.set_header(vec!["Field", "Max length", "Options"]);
    for field in &fields {
        table.add_row(vec![
            Cell::new(&field.value),
            Cell::new(
                field
                    .max_length
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(options_preview(field)),
        ]);
    }
    print_table(table)
}

fn options_preview(field: &RequiredField) -> String {
    let joined = match &field.options {
        None => return "-".to_string(),
        Some(Choices::List(values)) => values.join(", "),
        Some(Choices::Map(map)) => map.keys().cloned().collect::<Vec<_>>().join(", "),
    };
    preview_text(&joined, 60)
}
