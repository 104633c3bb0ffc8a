use anyhow::Result;
use colored::Colorize;
use congress_forms_core::engine::FillRequest;
use congress_forms_core::{FillOutcome, FormsCore, OutcomeStatus};

use crate::cli::FillArgs;
use crate::commands::utils::{find_profile, load_fields};
use crate::output::{OutputFormat, json::print_json};
use crate::solver::StdinSolver;

pub async fn run(core: &FormsCore, args: FillArgs, format: OutputFormat) -> Result<()> {
    let profile = find_profile(core, &args.bioguide_id)?;
    let fields = load_fields(&args.fields)?;

    let mut request = FillRequest::new(fields);
    if let Some(tag) = args.fields.campaign_tag {
        request = request.with_campaign_tag(tag);
    }
    if let Some(step_id) = args.start_at {
        request = request.starting_at(step_id);
    }

    let filler = core.form_filler()?;
    let report = filler.fill_out_form(&profile, request, &StdinSolver).await?;

    if format.is_json() {
        return print_json(&report.outcome);
    }
    print_outcome(&report.outcome);
    Ok(())
}

pub fn print_outcome(outcome: &FillOutcome) {
    let status = match outcome.status {
        OutcomeStatus::Success => "success".green().bold(),
        OutcomeStatus::Failure => "failure".yellow().bold(),
        OutcomeStatus::Error => "error".red().bold(),
    };
    println!("{} {}: {}", "Fill".bold(), outcome.bioguide_id, status);

    if let Some(fault) = &outcome.extra.fault {
        println!("  Fault:      {fault}");
    }
    if let Some(screenshot) = &outcome.extra.screenshot {
        println!("  Screenshot: {screenshot}");
    }
    if !outcome.is_success() && !outcome.extra.fill_log.is_empty() {
        println!("  Log:");
        for line in &outcome.extra.fill_log {
            println!("    {}", line.dimmed());
        }
    }
}
