use anyhow::Result;
use congress_forms_core::FormsCore;
use congress_forms_core::config::FormsConfig;
use congress_forms_core::paths;
use tracing::debug;

use crate::cli::Cli;

/// Open storage and load configuration, honouring the global overrides.
pub fn prepare_core(cli: &Cli) -> Result<FormsCore> {
    let config = match &cli.config {
        Some(path) => FormsConfig::load_from_path(path)?,
        None => FormsConfig::load()?,
    };

    let db_path = match &cli.db_path {
        Some(path) => path.clone(),
        None => paths::ensure_database_path()?,
    };

    debug!(db = %db_path.display(), "Preparing core");
    FormsCore::new(db_path, config)
}
