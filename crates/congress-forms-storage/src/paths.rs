//! Path utilities for congress-forms directory resolution.
//!
//! This is the canonical source for shared path functions. Re-exported by
//! congress-forms-core for convenience.

use anyhow::Result;
use std::path::PathBuf;

const FORMS_DIR: &str = ".congress-forms";
const DB_FILE: &str = "congress-forms.db";
const CONFIG_FILE: &str = "config.toml";
const LOGS_DIR: &str = "logs";
const IMAGES_DIR: &str = "images";

/// Environment variable to override the congress-forms directory.
const FORMS_DIR_ENV: &str = "CONGRESS_FORMS_DIR";

/// Resolve the congress-forms directory.
/// Priority: CONGRESS_FORMS_DIR env var > ~/.congress-forms/
pub fn resolve_forms_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(FORMS_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(FORMS_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the congress-forms directory exists and return its path.
pub fn ensure_forms_dir() -> Result<PathBuf> {
    let dir = resolve_forms_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the database path: ~/.congress-forms/congress-forms.db
pub fn ensure_database_path() -> Result<PathBuf> {
    Ok(ensure_forms_dir()?.join(DB_FILE))
}

/// Get the config file path: ~/.congress-forms/config.toml
pub fn config_path() -> Result<PathBuf> {
    Ok(resolve_forms_dir()?.join(CONFIG_FILE))
}

/// Get the logs directory: ~/.congress-forms/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = resolve_forms_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Default image store directory: ~/.congress-forms/images/
pub fn images_dir() -> Result<PathBuf> {
    let dir = resolve_forms_dir()?.join(IMAGES_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
