//! Congress Forms Storage - low-level persistence layer
//!
//! This crate provides the persistence layer for congress-forms, using redb as
//! the embedded database. It exposes byte-level APIs; typed wrappers live in
//! congress-forms-core next to the models they serialize.
//!
//! # Tables
//!
//! - `fill_statuses:data/by_legislator/by_time` - Append-only fill outcome log
//! - `legislators:data/by_bioguide/by_seat` - Legislator profiles

pub mod fill_status;
pub mod legislator;
pub mod paths;
pub mod range_utils;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub use fill_status::FillStatusStorage;
pub use legislator::{LegislatorKeys, LegislatorStorage};

/// Central storage manager that initializes all storage subsystems
pub struct Storage {
    pub fill_statuses: FillStatusStorage,
    pub legislators: LegislatorStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening storage");
        let db = Arc::new(Database::create(path)?);

        Ok(Self {
            fill_statuses: FillStatusStorage::new(db.clone())?,
            legislators: LegislatorStorage::new(db)?,
        })
    }
}
