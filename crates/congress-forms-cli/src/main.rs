mod cli;
mod commands;
mod completions;
mod error;
mod output;
mod setup;
mod solver;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use congress_forms_core::paths;
use setup::prepare_core;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs always go to a file so they never interleave with command output
    let _guard = match init_logging(cli.verbose) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: file logging disabled: {err:#}");
            None
        }
    };

    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = paths::logs_dir()?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "congress-forms.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    Ok(guard)
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.format;

    if let Commands::Completions { shell } = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    let mut core = prepare_core(&cli)?;

    match cli.command {
        Commands::Completions { .. } => Ok(()),
        Commands::Import { files } => commands::import::run(&core, &files, format),
        Commands::List => commands::list::list(&core, format),
        Commands::Show { bioguide_id } => commands::list::show(&core, &bioguide_id, format),
        Commands::Fill(args) => {
            if args.headed {
                core.config.browser.headless = false;
            }
            commands::fill::run(&core, args, format).await
        }
        Commands::Cwc(args) => commands::cwc::run(&core, args, format).await,
        Commands::OfficeCode { bioguide_id } => {
            commands::office::office_code(&core, &bioguide_id, format)
        }
        Commands::OfficeLookup { code } => commands::office::office_lookup(&core, &code, format),
        Commands::Status(args) => commands::status::run(&core, args, format),
        Commands::Required { bioguide_id, cwc } => {
            commands::required::run(&core, bioguide_id.as_deref(), cwc, format)
        }
    }
}
