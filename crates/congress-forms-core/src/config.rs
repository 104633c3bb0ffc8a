//! Configuration file support
//!
//! Loads configuration from `$CONGRESS_FORMS_DIR/config.toml`
//! (default `~/.congress-forms/config.toml`).

use crate::captcha::CaptchaRegion;
use anyhow::{Context, Result, bail};
use congress_forms_browser::{BrowserKind, SessionRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";
const DEFAULT_BROWSER_WAIT_SECS: u64 = 2;
const DEFAULT_FIND_WAIT_SECS: u64 = 5;
const MIN_WAIT_SECS: u64 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormsConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub fill: FillConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub captcha: CaptchaConfig,
    #[serde(default)]
    pub cwc: CwcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    /// Implicit wait for element lookups.
    pub find_wait_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            browser: BrowserKind::default(),
            headless: true,
            find_wait_secs: DEFAULT_BROWSER_WAIT_SECS,
        }
    }
}

impl BrowserConfig {
    pub fn session_request(&self) -> SessionRequest {
        SessionRequest {
            browser: self.browser,
            headless: self.headless,
            user_agent: None,
            page_load_timeout_secs: None,
            find_wait_secs: self.find_wait_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Persist every outcome to the fill status log.
    pub record_fill_statuses: bool,
    /// Wait used by `find` steps that don't set their own.
    pub default_find_wait_secs: u64,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            record_fill_statuses: true,
            default_find_wait_secs: DEFAULT_FIND_WAIT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Defaults to `<forms dir>/images`.
    pub dir: Option<PathBuf>,
    /// Base URL the images directory is served from. Without it, stored
    /// images are reported as `file://` URLs.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// Fixed captcha regions by bioguide id.
    pub overrides: BTreeMap<String, CaptchaRegion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CwcConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub delivery_agent: DeliveryAgent,
}

/// Identifies the sender of CWC deliveries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryAgent {
    pub name: String,
    pub ack_email: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
}

impl FormsConfig {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&crate::paths::config_path()?)
    }

    /// Missing files yield defaults; unreadable or invalid files are errors.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.browser.webdriver_url)
            .with_context(|| format!("Invalid webdriver_url {}", self.browser.webdriver_url))?;

        if self.browser.find_wait_secs < MIN_WAIT_SECS {
            bail!("Browser find wait must be at least {MIN_WAIT_SECS} second");
        }

        if self.fill.default_find_wait_secs < MIN_WAIT_SECS {
            bail!("Default find wait must be at least {MIN_WAIT_SECS} second");
        }

        if let Some(base) = &self.images.public_base_url {
            url::Url::parse(base).with_context(|| format!("Invalid public_base_url {base}"))?;
        }

        for (bioguide_id, region) in &self.captcha.overrides {
            if region.width <= 0.0 || region.height <= 0.0 {
                bail!("Captcha override for {bioguide_id} must have a positive width and height");
            }
        }

        if let Some(base) = &self.cwc.base_url {
            url::Url::parse(base).with_context(|| format!("Invalid CWC base_url {base}"))?;
            if self.cwc.api_key.as_deref().is_none_or(str::is_empty) {
                bail!("CWC api_key is required when base_url is set");
            }
        }

        Ok(())
    }
}
