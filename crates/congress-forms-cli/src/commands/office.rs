use anyhow::Result;
use congress_forms_core::FormsCore;
use congress_forms_core::office::OfficeCode;
use serde_json::json;

use crate::commands::utils::find_profile;
use crate::output::{OutputFormat, json::print_json};

pub fn office_code(core: &FormsCore, bioguide_id: &str, format: OutputFormat) -> Result<()> {
    let profile = find_profile(core, bioguide_id)?;
    let code = profile.office_code().map(|c| c.to_string());

    if format.is_json() {
        return print_json(&json!({ "bioguide_id": bioguide_id, "office_code": code }));
    }

    match code {
        Some(code) => println!("{code}"),
        None => println!("{bioguide_id} has no office code (chamber or seat unknown)"),
    }
    Ok(())
}

pub fn office_lookup(core: &FormsCore, code: &str, format: OutputFormat) -> Result<()> {
    let office: OfficeCode = code.trim().to_ascii_uppercase().parse()?;
    let profile = core.store.legislators.find_by_office_code(&office)?;

    if format.is_json() {
        return print_json(&json!({
            "office_code": office.to_string(),
            "bioguide_id": profile.as_ref().map(|p| p.bioguide_id.clone()),
        }));
    }

    match profile {
        Some(profile) => println!("{}", profile.bioguide_id),
        None => println!("No legislator holds {office}"),
    }
    Ok(())
}
