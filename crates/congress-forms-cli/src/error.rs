use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{err:#}").to_lowercase();

    if msg.contains("legislator not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Import the legislator's profile with:");
        eprintln!("  {} congress-forms import <profile.yaml>", "$".dimmed());
    }

    if msg.contains("cwc.base_url") || msg.contains("cwc.api_key") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Add a [cwc] section with base_url and api_key to config.toml,");
        eprintln!("  or fill the web form instead:");
        eprintln!("  {} congress-forms fill <BIOGUIDE_ID>", "$".dimmed());
    }

    if msg.contains("missing required field") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  List the fields this form needs with:");
        eprintln!("  {} congress-forms required <BIOGUIDE_ID>", "$".dimmed());
    }

    if msg.contains("connection refused") || msg.contains("webdriver") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Make sure a WebDriver server (chromedriver or geckodriver) is running");
        eprintln!("  at the [browser] webdriver_url in config.toml.");
    }

    std::process::exit(1);
}
