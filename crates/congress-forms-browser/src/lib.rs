//! Browser session boundary for congress-forms.
//!
//! The form engine never talks to a concrete browser. It drives a
//! [`BrowserDriver`], which exposes exactly the operations a recorded contact
//! form script needs:
//! - Navigation and page text extraction
//! - Element lookup by CSS selector, optionally scoped, text-matched and timed
//! - Value setting, clicking, checkbox and option selection
//! - Script evaluation and screenshots
//!
//! Sessions are opened through a [`SessionFactory`]. The WebDriver-backed
//! implementation lives in [`webdriver`].

pub mod webdriver;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};

pub use webdriver::{WebDriverFactory, WebDriverSession};

const DEFAULT_FIND_WAIT_SECS: u64 = 2;
const FIND_POLL_INTERVAL_MS: u64 = 100;
/// Upper bound for either window dimension during a full-page capture.
const MAX_FULL_PAGE_PX: u32 = 16_384;

/// Document and viewport dimensions, as `[scrollWidth, scrollHeight,
/// innerWidth, innerHeight]`.
pub const PAGE_EXTENT_SCRIPT: &str = "return [document.documentElement.scrollWidth, \
document.documentElement.scrollHeight, window.innerWidth, window.innerHeight];";

/// Faults reported by a browser driver.
///
/// `NotFound` and `Ambiguous` are the lookup faults; callers branch on them
/// to implement fallback chains.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Unable to find element matching {0}")]
    NotFound(String),

    #[error("Ambiguous match, found {count} elements matching {selector}")]
    Ambiguous { selector: String, count: usize },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// True for element-not-found and element-ambiguous faults.
    pub fn is_lookup(&self) -> bool {
        matches!(self, DriverError::NotFound(_) | DriverError::Ambiguous { .. })
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opaque handle to an element found in the current session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Element lookup request.
#[derive(Debug, Clone)]
pub struct FindQuery {
    pub selector: String,
    pub within: Option<ElementRef>,
    pub text: Option<Regex>,
    pub wait: Option<Duration>,
}

impl FindQuery {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            within: None,
            text: None,
            wait: None,
        }
    }

    /// Restrict the lookup to descendants of `scope`.
    pub fn within(mut self, scope: &ElementRef) -> Self {
        self.within = Some(scope.clone());
        self
    }

    /// Only keep elements whose visible text matches `pattern`.
    pub fn matching_text(mut self, pattern: Regex) -> Self {
        self.text = Some(pattern);
        self
    }

    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn describe(&self) -> String {
        match &self.text {
            Some(pattern) => format!("{} with text /{}/", self.selector, pattern.as_str()),
            None => self.selector.clone(),
        }
    }
}

/// Quote a value for use inside a double-quoted CSS attribute selector.
pub fn quote_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Scroll size of the document against the size of the viewport showing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageExtent {
    pub scroll_width: u32,
    pub scroll_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

impl PageExtent {
    /// Parse the result of [`PAGE_EXTENT_SCRIPT`].
    pub fn from_value(value: &Value) -> Option<Self> {
        let dims = value.as_array()?;
        let dim = |index: usize| {
            dims.get(index)?
                .as_f64()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.min(f64::from(u32::MAX)) as u32)
        };
        Some(Self {
            scroll_width: dim(0)?,
            scroll_height: dim(1)?,
            inner_width: dim(2)?,
            inner_height: dim(3)?,
        })
    }

    /// Window size that shows the whole document, given the current window
    /// size. Window chrome is kept; the window only ever grows.
    pub fn window_size_for(&self, window: (u32, u32)) -> (u32, u32) {
        let grow = |scroll: u32, inner: u32, outer: u32| {
            outer
                .saturating_add(scroll.saturating_sub(inner))
                .min(MAX_FULL_PAGE_PX.max(outer))
        };
        (
            grow(self.scroll_width, self.inner_width, window.0),
            grow(self.scroll_height, self.inner_height, window.1),
        )
    }
}

/// One live browser session.
///
/// Implementors provide single-attempt primitives; [`BrowserDriver::find`]
/// layers the waiting and exactly-one semantics on top of
/// [`BrowserDriver::find_all`].
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    fn session_id(&self) -> &str;

    /// Wait applied to lookups that don't carry their own.
    fn default_wait(&self) -> Duration {
        Duration::from_secs(DEFAULT_FIND_WAIT_SECS)
    }

    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// Single lookup attempt; an empty result is not an error.
    async fn find_all(&self, query: &FindQuery) -> DriverResult<Vec<ElementRef>>;

    /// Find exactly one element, polling until the query's wait elapses.
    async fn find(&self, query: &FindQuery) -> DriverResult<ElementRef> {
        let wait = query.wait.unwrap_or_else(|| self.default_wait());
        let deadline = Instant::now() + wait;
        loop {
            let mut found = self.find_all(query).await?;
            match found.len() {
                1 => return Ok(found.remove(0)),
                0 if Instant::now() < deadline => {
                    sleep(Duration::from_millis(FIND_POLL_INTERVAL_MS)).await;
                }
                0 => return Err(DriverError::NotFound(query.describe())),
                count => {
                    return Err(DriverError::Ambiguous {
                        selector: query.describe(),
                        count,
                    });
                }
            }
        }
    }

    /// First matching element, without the ambiguity check.
    async fn first(&self, query: &FindQuery) -> DriverResult<ElementRef> {
        self.find_all(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(query.describe()))
    }

    async fn set_value(&self, element: &ElementRef, value: &str) -> DriverResult<()>;

    async fn set_checked(&self, element: &ElementRef, checked: bool) -> DriverResult<()>;

    async fn select_option(&self, element: &ElementRef) -> DriverResult<()>;

    async fn click(&self, element: &ElementRef) -> DriverResult<()>;

    async fn evaluate(&self, script: &str) -> DriverResult<Value>;

    async fn page_text(&self) -> DriverResult<String>;

    /// Write a PNG screenshot of the viewport to `path`.
    async fn screenshot(&self, path: &Path) -> DriverResult<()>;

    /// Outer window size in CSS pixels.
    async fn window_size(&self) -> DriverResult<(u32, u32)>;

    async fn set_window_size(&self, width: u32, height: u32) -> DriverResult<()>;

    /// Write a PNG screenshot of the whole document to `path`.
    ///
    /// The window is grown to the document's scroll size for the capture and
    /// restored afterwards. Pages that don't report their extent get a
    /// viewport screenshot.
    async fn full_page_screenshot(&self, path: &Path) -> DriverResult<()> {
        let original = self.window_size().await?;
        let Some(extent) = PageExtent::from_value(&self.evaluate(PAGE_EXTENT_SCRIPT).await?) else {
            return self.screenshot(path).await;
        };
        let (width, height) = extent.window_size_for(original);
        if (width, height) == original {
            return self.screenshot(path).await;
        }

        self.set_window_size(width, height).await?;
        let captured = self.screenshot(path).await;
        let restored = self.set_window_size(original.0, original.1).await;
        captured.and(restored)
    }

    async fn quit(&self) -> DriverResult<()>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
}

/// Parameters for opening a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub browser: BrowserKind,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub page_load_timeout_secs: Option<u64>,
    #[serde(default = "default_find_wait_secs")]
    pub find_wait_secs: u64,
}

impl Default for SessionRequest {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            user_agent: None,
            page_load_timeout_secs: None,
            find_wait_secs: DEFAULT_FIND_WAIT_SECS,
        }
    }
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, request: &SessionRequest) -> DriverResult<Box<dyn BrowserDriver>>;
}

fn default_headless() -> bool {
    true
}

fn default_find_wait_secs() -> u64 {
    DEFAULT_FIND_WAIT_SECS
}
