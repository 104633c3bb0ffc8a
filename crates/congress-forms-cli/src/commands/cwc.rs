use anyhow::Result;
use colored::Colorize;
use congress_forms_core::FormsCore;
use congress_forms_core::cwc::{CwcDelivery, CwcRequest, Organization};
use serde_json::json;

use crate::cli::CwcArgs;
use crate::commands::fill::print_outcome;
use crate::commands::utils::{find_profile, load_fields};
use crate::output::{OutputFormat, json::print_json};

pub async fn run(core: &FormsCore, args: CwcArgs, format: OutputFormat) -> Result<()> {
    let profile = find_profile(core, &args.bioguide_id)?;
    let fields = load_fields(&args.fields)?;

    let mut request = CwcRequest::default();
    if let Some(tag) = args.fields.campaign_tag {
        request = request.with_campaign_tag(tag);
    }
    if let Some(name) = args.organization {
        request = request.with_organization(Organization::named(name));
    }
    if args.validate_only {
        request = request.validate_only();
    }

    let submitter = core.cwc_submitter()?;
    let delivery = submitter.message_via_cwc(&profile, &fields, request).await?;

    match delivery {
        CwcDelivery::Validated => {
            if format.is_json() {
                return print_json(&json!({ "status": "validated" }));
            }
            println!("{} message for {} is valid", "CWC".bold(), profile.bioguide_id);
        }
        CwcDelivery::Delivered(outcome) => {
            if format.is_json() {
                return print_json(&outcome);
            }
            print_outcome(&outcome);
        }
        CwcDelivery::Unroutable => {
            if format.is_json() {
                return print_json(&json!({ "status": "unroutable" }));
            }
            println!(
                "{} has no CWC office code. Use the web form instead:",
                profile.bioguide_id
            );
            println!("  {} congress-forms fill {}", "$".dimmed(), profile.bioguide_id);
        }
    }
    Ok(())
}
