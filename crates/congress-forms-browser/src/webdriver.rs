//! WebDriver-backed sessions (chromedriver / geckodriver) via `fantoccini`.

use crate::{
    BrowserDriver, BrowserKind, DriverError, DriverResult, ElementRef, FindQuery, SessionFactory,
    SessionRequest,
};
use async_trait::async_trait;
use chrono::Utc;
use fantoccini::elements::Element;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Opens sessions against a running WebDriver server.
pub struct WebDriverFactory {
    webdriver_url: String,
}

impl WebDriverFactory {
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
        }
    }

    fn capabilities(request: &SessionRequest) -> Map<String, Value> {
        let mut caps = Map::new();
        match request.browser {
            BrowserKind::Chromium => {
                let mut args = vec![
                    "--disable-gpu".to_string(),
                    "--disable-dev-shm-usage".to_string(),
                ];
                if request.headless {
                    args.push("--headless=new".to_string());
                }
                if let Some(user_agent) = &request.user_agent {
                    args.push(format!("--user-agent={user_agent}"));
                }
                caps.insert("browserName".to_string(), json!("chrome"));
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
            BrowserKind::Firefox => {
                let mut options = Map::new();
                if request.headless {
                    options.insert("args".to_string(), json!(["-headless"]));
                }
                if let Some(user_agent) = &request.user_agent {
                    options.insert(
                        "prefs".to_string(),
                        json!({ "general.useragent.override": user_agent }),
                    );
                }
                caps.insert("browserName".to_string(), json!("firefox"));
                caps.insert("moz:firefoxOptions".to_string(), Value::Object(options));
            }
        }
        caps
    }
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn open(&self, request: &SessionRequest) -> DriverResult<Box<dyn BrowserDriver>> {
        debug!(url = %self.webdriver_url, browser = ?request.browser, "Connecting to WebDriver");

        let client = ClientBuilder::native()
            .capabilities(Self::capabilities(request))
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                DriverError::Session(format!(
                    "Failed to connect to WebDriver at {}: {e}",
                    self.webdriver_url
                ))
            })?;

        if let Some(secs) = request.page_load_timeout_secs {
            let timeouts = TimeoutConfiguration::new(None, Some(Duration::from_secs(secs)), None);
            client
                .update_timeouts(timeouts)
                .await
                .map_err(|e| DriverError::Session(format!("Failed to set timeouts: {e}")))?;
        }

        let session = WebDriverSession::new(client, Duration::from_secs(request.find_wait_secs));
        info!(session_id = %session.id, "Browser session opened");
        Ok(Box::new(session))
    }
}

/// A single WebDriver session.
///
/// WebDriver element handles are kept in a registry so callers only ever see
/// [`ElementRef`] tokens.
pub struct WebDriverSession {
    id: String,
    opened_at_ms: i64,
    client: Client,
    elements: Mutex<HashMap<String, Element>>,
    find_wait: Duration,
}

impl WebDriverSession {
    pub fn new(client: Client, find_wait: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            opened_at_ms: Utc::now().timestamp_millis(),
            client,
            elements: Mutex::new(HashMap::new()),
            find_wait,
        }
    }

    fn register(&self, element: Element) -> ElementRef {
        let key = Uuid::new_v4().to_string();
        self.elements.lock().insert(key.clone(), element);
        ElementRef(key)
    }

    fn element(&self, element: &ElementRef) -> DriverResult<Element> {
        self.elements
            .lock()
            .get(element.as_str())
            .cloned()
            .ok_or_else(|| DriverError::NotFound(format!("stale element {}", element.as_str())))
    }
}

fn command_error(action: &str, err: fantoccini::error::CmdError) -> DriverError {
    DriverError::Session(format!("{action} failed: {err}"))
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    fn session_id(&self) -> &str {
        &self.id
    }

    fn default_wait(&self) -> Duration {
        self.find_wait
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        debug!(session_id = %self.id, url, "Navigating");
        self.client
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(format!("{url}: {e}")))?;
        // Handles from the previous document are dead after navigation.
        self.elements.lock().clear();
        Ok(())
    }

    async fn find_all(&self, query: &FindQuery) -> DriverResult<Vec<ElementRef>> {
        let locator = Locator::Css(&query.selector);
        let candidates = match &query.within {
            Some(scope) => self.element(scope)?.find_all(locator).await,
            None => self.client.find_all(locator).await,
        }
        .map_err(|e| command_error("find", e))?;

        let mut matches = Vec::with_capacity(candidates.len());
        for element in candidates {
            if let Some(pattern) = &query.text {
                let text = element
                    .text()
                    .await
                    .map_err(|e| command_error("read text", e))?;
                if !pattern.is_match(text.trim()) {
                    continue;
                }
            }
            matches.push(self.register(element));
        }
        Ok(matches)
    }

    async fn set_value(&self, element: &ElementRef, value: &str) -> DriverResult<()> {
        let element = self.element(element)?;
        element
            .clear()
            .await
            .map_err(|e| command_error("clear", e))?;
        element
            .send_keys(value)
            .await
            .map_err(|e| command_error("send keys", e))
    }

    async fn set_checked(&self, element: &ElementRef, checked: bool) -> DriverResult<()> {
        let element = self.element(element)?;
        let selected = element
            .is_selected()
            .await
            .map_err(|e| command_error("read selection", e))?;
        if selected != checked {
            element.click().await.map_err(|e| command_error("click", e))?;
        }
        Ok(())
    }

    async fn select_option(&self, element: &ElementRef) -> DriverResult<()> {
        self.set_checked(element, true).await
    }

    async fn click(&self, element: &ElementRef) -> DriverResult<()> {
        self.element(element)?
            .click()
            .await
            .map_err(|e| command_error("click", e))
    }

    async fn evaluate(&self, script: &str) -> DriverResult<Value> {
        self.client
            .execute(script, Vec::new())
            .await
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    async fn page_text(&self) -> DriverResult<String> {
        let body = self
            .client
            .find(Locator::Css("body"))
            .await
            .map_err(|e| command_error("find body", e))?;
        body.text().await.map_err(|e| command_error("read text", e))
    }

    async fn screenshot(&self, path: &Path) -> DriverResult<()> {
        let png = self
            .client
            .screenshot()
            .await
            .map_err(|e| command_error("screenshot", e))?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }

    async fn window_size(&self) -> DriverResult<(u32, u32)> {
        let (width, height) = self
            .client
            .get_window_size()
            .await
            .map_err(|e| command_error("read window size", e))?;
        let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
        Ok((clamp(width), clamp(height)))
    }

    async fn set_window_size(&self, width: u32, height: u32) -> DriverResult<()> {
        debug!(session_id = %self.id, width, height, "Resizing window");
        self.client
            .set_window_size(width, height)
            .await
            .map_err(|e| command_error("resize window", e))
    }

    async fn quit(&self) -> DriverResult<()> {
        let lifetime_ms = Utc::now().timestamp_millis() - self.opened_at_ms;
        info!(session_id = %self.id, lifetime_ms, "Closing browser session");
        self.elements.lock().clear();
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| command_error("close", e))
    }
}
