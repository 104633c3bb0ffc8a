pub mod captcha;
pub mod config;
pub mod cwc;
pub mod engine;
pub mod error;
pub mod images;
pub mod models;
pub mod office;
pub mod required;
pub mod selector;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod testkit;

pub use congress_forms_storage::paths;
pub use models::*;

use anyhow::Result;
use config::FormsConfig;
use congress_forms_browser::{SessionFactory, WebDriverFactory};
use cwc::{CwcHttpClient, CwcSubmitter};
use engine::{FillSettings, FormFiller};
use error::CwcError;
use images::{DirectoryImageStore, ImageStore};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;
use store::FormsStore;
use tracing::info;

/// Application state shared by CLI commands: storage plus configuration,
/// and factories for the two delivery paths.
pub struct FormsCore {
    pub store: Arc<FormsStore>,
    pub config: FormsConfig,
    cwc_client: OnceCell<Arc<CwcHttpClient>>,
}

impl FormsCore {
    pub fn new(db_path: impl AsRef<Path>, config: FormsConfig) -> Result<Self> {
        let store = Arc::new(FormsStore::new(db_path.as_ref())?);
        info!(db = %db_path.as_ref().display(), "Initializing congress-forms");
        Ok(Self {
            store,
            config,
            cwc_client: OnceCell::new(),
        })
    }

    /// Open the default database with the configuration file's settings.
    pub fn open_default() -> Result<Self> {
        let config = FormsConfig::load()?;
        Self::new(paths::ensure_database_path()?, config)
    }

    pub fn image_store(&self) -> Result<Arc<dyn ImageStore>> {
        let root = match &self.config.images.dir {
            Some(dir) => dir.clone(),
            None => paths::images_dir()?,
        };
        let mut images = DirectoryImageStore::new(root);
        if let Some(base) = &self.config.images.public_base_url {
            images = images.with_public_base_url(base.clone());
        }
        Ok(Arc::new(images))
    }

    /// Filler backed by the configured WebDriver endpoint.
    pub fn form_filler(&self) -> Result<FormFiller> {
        let sessions: Arc<dyn SessionFactory> =
            Arc::new(WebDriverFactory::new(self.config.browser.webdriver_url.clone()));
        self.form_filler_with(sessions, self.image_store()?)
    }

    pub fn form_filler_with(
        &self,
        sessions: Arc<dyn SessionFactory>,
        images: Arc<dyn ImageStore>,
    ) -> Result<FormFiller> {
        let sink = Arc::new(self.store.fill_statuses.clone());
        Ok(FormFiller::new(sessions, images)
            .with_sink(sink)
            .with_settings(FillSettings::from_config(&self.config)))
    }

    fn cwc_client(&self) -> Result<Arc<CwcHttpClient>, CwcError> {
        self.cwc_client
            .get_or_try_init(|| CwcHttpClient::from_config(&self.config.cwc).map(Arc::new))
            .cloned()
    }

    pub fn cwc_submitter(&self) -> Result<CwcSubmitter, CwcError> {
        Ok(CwcSubmitter::new(self.cwc_client()?)
            .with_sink(Arc::new(self.store.fill_statuses.clone()))
            .record_fill_statuses(self.config.fill.record_fill_statuses))
    }
}
