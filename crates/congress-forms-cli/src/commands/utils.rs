use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local, TimeZone};
use congress_forms_core::FormsCore;
use congress_forms_core::LegislatorProfile;
use congress_forms_core::engine::FieldMap;
use std::collections::BTreeMap;

use crate::cli::FieldArgs;

pub fn format_timestamp(timestamp: Option<i64>) -> String {
    let Some(ts) = timestamp else {
        return "-".to_string();
    };

    let datetime: DateTime<Local> = match Local.timestamp_millis_opt(ts).single() {
        Some(dt) => dt,
        None => return "-".to_string(),
    };

    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn preview_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

pub fn find_profile(core: &FormsCore, bioguide_id: &str) -> Result<LegislatorProfile> {
    core.store
        .legislators
        .by_bioguide(bioguide_id)?
        .ok_or_else(|| anyhow!("Legislator not found: {bioguide_id}"))
}

/// `NAME_FIRST` and `$NAME_FIRST` name the same field.
pub fn placeholder_key(key: &str) -> String {
    let key = key.trim();
    if key.starts_with('$') {
        key.to_string()
    } else {
        format!("${key}")
    }
}

/// Merge the `--fields` file with `-f KEY=VALUE` pairs; pairs win.
pub fn load_fields(args: &FieldArgs) -> Result<FieldMap> {
    let mut fields = FieldMap::new();

    if let Some(path) = &args.fields {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fields file {}", path.display()))?;
        // YAML parsing also accepts JSON documents
        let map: BTreeMap<String, String> = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid fields file {}", path.display()))?;
        for (key, value) in map {
            fields.insert(placeholder_key(&key), value);
        }
    }

    for pair in &args.field {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid field {pair:?}, expected KEY=VALUE"))?;
        fields.insert(placeholder_key(key), value);
    }

    Ok(fields)
}
