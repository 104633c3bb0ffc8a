use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

pub use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "congress-forms")]
#[command(version, about = "Congress Forms - fill congressional contact forms")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to ~/.congress-forms/congress-forms.db)
    #[arg(long, global = true, env = "CONGRESS_FORMS_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Config file (defaults to ~/.congress-forms/config.toml)
    #[arg(long, global = true, env = "CONGRESS_FORMS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Import legislator profiles from YAML files
    Import {
        /// Profile documents
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List stored legislator profiles
    List,

    /// Show one profile's steps
    Show {
        bioguide_id: String,
    },

    /// Fill out a legislator's contact form
    Fill(FillArgs),

    /// Send a message through the CWC API
    Cwc(CwcArgs),

    /// Print a legislator's CWC office code
    OfficeCode {
        bioguide_id: String,
    },

    /// Find the legislator holding a CWC office code
    OfficeLookup {
        /// e.g. SCA02 or HTX36
        code: String,
    },

    /// Recent fill results
    Status(StatusArgs),

    /// Fields a caller must supply
    Required {
        /// Legislator; omit with --cwc for the CWC field set
        bioguide_id: Option<String>,

        /// List the fields the CWC path needs
        #[arg(long, conflicts_with = "bioguide_id")]
        cwc: bool,
    },
}

#[derive(Args, Clone, Debug, Default)]
pub struct FieldArgs {
    /// JSON or YAML file mapping placeholders to values
    #[arg(long)]
    pub fields: Option<PathBuf>,

    /// Single field, e.g. -f NAME_FIRST=Jane (repeatable)
    #[arg(short = 'f', long = "field", value_name = "KEY=VALUE")]
    pub field: Vec<String>,

    /// Campaign tag recorded with the outcome
    #[arg(long)]
    pub campaign_tag: Option<String>,
}

#[derive(Args)]
pub struct FillArgs {
    pub bioguide_id: String,

    #[command(flatten)]
    pub fields: FieldArgs,

    /// Resume at this step id
    #[arg(long)]
    pub start_at: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

#[derive(Args)]
pub struct CwcArgs {
    pub bioguide_id: String,

    #[command(flatten)]
    pub fields: FieldArgs,

    /// Sending organization
    #[arg(long)]
    pub organization: Option<String>,

    /// Validate without delivering
    #[arg(long)]
    pub validate_only: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Legislator; omit for all legislators
    pub bioguide_id: Option<String>,

    /// Only outcomes from the last N days
    #[arg(long, default_value = "7")]
    pub days: i64,
}
