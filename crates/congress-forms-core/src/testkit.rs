//! In-memory collaborators for exercising the engine without a browser.
//!
//! [`FixtureBrowser`] serves hand-built pages: each page has visible text and
//! a flat list of nodes that answer to one or more CSS selectors. Lookups are
//! single-attempt, so tests never sleep on a missing element.

use crate::captcha::{CaptchaChallenge, CaptchaReply, CaptchaSolver};
use crate::cwc::{CwcMessage, CwcMessageParams, MessagingApi, xml};
use crate::config::DeliveryAgent;
use crate::error::CwcError;
use crate::images::{ImageKind, ImageStore};
use crate::models::FillOutcome;
use crate::store::FillStatusSink;
use async_trait::async_trait;
use chrono::Utc;
use congress_forms_browser::{
    BrowserDriver, DriverError, DriverResult, ElementRef, FindQuery, SessionFactory, SessionRequest,
    quote_attr,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Something the engine did to the fixture browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    Navigate(String),
    SetValue { element: String, value: String },
    SetChecked { element: String, checked: bool },
    Select { scope: Option<String>, option: String },
    Click(String),
    Evaluate(String),
    Screenshot,
    Resize { width: u32, height: u32 },
    Quit,
}

#[derive(Debug, Clone)]
pub struct FixtureNode {
    /// Name used in events: the first selector, or an option's value.
    pub name: String,
    pub selectors: Vec<String>,
    pub parent: Option<String>,
    pub text: String,
    /// Clicking the node loads this page.
    pub navigates_to: Option<String>,
}

impl FixtureNode {
    pub fn new(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        Self {
            name: selector.clone(),
            selectors: vec![selector],
            parent: None,
            text: String::new(),
            navigates_to: None,
        }
    }

    /// An `<option>` answering to `option` and `option[value="..."]`.
    pub fn option(value: &str, text: &str) -> Self {
        Self {
            name: value.to_string(),
            selectors: vec![
                "option".to_string(),
                format!("option[value=\"{}\"]", quote_attr(value)),
            ],
            parent: None,
            text: text.to_string(),
            navigates_to: None,
        }
    }

    pub fn also(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.navigates_to = Some(url.into());
        self
    }

    fn matches(&self, query: &FindQuery) -> bool {
        self.selectors.iter().any(|s| s == &query.selector)
            && query
                .text
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(&self.text))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixturePage {
    pub text: String,
    pub nodes: Vec<FixtureNode>,
}

impl FixturePage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            nodes: Vec::new(),
        }
    }

    pub fn node(mut self, node: FixtureNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// A `<select>` answering to `selector` with `(value, label)` options.
    pub fn select(mut self, selector: &str, options: &[(&str, &str)]) -> Self {
        self.nodes.push(FixtureNode::new(selector));
        for (value, label) in options {
            let mut option = FixtureNode::option(value, label);
            option.parent = Some(selector.to_string());
            self.nodes.push(option);
        }
        self
    }
}

#[derive(Debug, Default)]
struct FixtureState {
    pages: HashMap<String, FixturePage>,
    current: Option<String>,
    events: Vec<BrowserEvent>,
    script_results: Vec<(String, Value)>,
    last_find_wait: Option<Duration>,
    screenshot_size: (u32, u32),
    window_size: (u32, u32),
    quit: bool,
}

impl FixtureState {
    fn page(&self) -> DriverResult<&FixturePage> {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .ok_or_else(|| DriverError::Session("no page loaded".to_string()))
    }

    fn element_ref(url: &str, index: usize) -> ElementRef {
        ElementRef(format!("{url}#{index}"))
    }

    fn node(&self, element: &ElementRef) -> DriverResult<&FixtureNode> {
        let url = self
            .current
            .as_deref()
            .ok_or_else(|| DriverError::Session("no page loaded".to_string()))?;
        let index = element
            .as_str()
            .strip_prefix(url)
            .and_then(|rest| rest.strip_prefix('#'))
            .and_then(|index| index.parse::<usize>().ok())
            .ok_or_else(|| DriverError::Session(format!("stale element {}", element.as_str())))?;
        self.page()?
            .nodes
            .get(index)
            .ok_or_else(|| DriverError::Session(format!("stale element {}", element.as_str())))
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.quit {
            return Err(DriverError::Session("session has quit".to_string()));
        }
        Ok(())
    }
}

/// Scripted browser session. Clones share state, so a test can keep a handle
/// while the engine owns another.
#[derive(Debug, Clone)]
pub struct FixtureBrowser {
    id: String,
    state: Arc<Mutex<FixtureState>>,
}

impl Default for FixtureBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self {
            id: format!("fixture-{}", uuid::Uuid::new_v4().simple()),
            state: Arc::new(Mutex::new(FixtureState {
                screenshot_size: (200, 100),
                window_size: (1024, 768),
                ..FixtureState::default()
            })),
        }
    }

    pub fn with_page(self, url: impl Into<String>, page: FixturePage) -> Self {
        self.state.lock().pages.insert(url.into(), page);
        self
    }

    /// `evaluate` returns `result` for any script containing `fragment`.
    pub fn with_script_result(self, fragment: impl Into<String>, result: Value) -> Self {
        self.state.lock().script_results.push((fragment.into(), result));
        self
    }

    pub fn with_screenshot_size(self, width: u32, height: u32) -> Self {
        self.state.lock().screenshot_size = (width, height);
        self
    }

    pub fn events(&self) -> Vec<BrowserEvent> {
        self.state.lock().events.clone()
    }

    pub fn values_set(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                BrowserEvent::SetValue { element, value } => Some((element, value)),
                _ => None,
            })
            .collect()
    }

    pub fn selected_options(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                BrowserEvent::Select { option, .. } => Some(option),
                _ => None,
            })
            .collect()
    }

    pub fn current_url(&self) -> Option<String> {
        self.state.lock().current.clone()
    }

    pub fn last_find_wait(&self) -> Option<Duration> {
        self.state.lock().last_find_wait
    }

    pub fn current_window_size(&self) -> (u32, u32) {
        self.state.lock().window_size
    }

    pub fn has_quit(&self) -> bool {
        self.state.lock().quit
    }
}

#[async_trait]
impl BrowserDriver for FixtureBrowser {
    fn session_id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        if !state.pages.contains_key(url) {
            return Err(DriverError::Navigation(format!("no fixture page at {url}")));
        }
        state.current = Some(url.to_string());
        state.events.push(BrowserEvent::Navigate(url.to_string()));
        Ok(())
    }

    async fn find_all(&self, query: &FindQuery) -> DriverResult<Vec<ElementRef>> {
        let state = self.state.lock();
        state.ensure_open()?;
        let url = state.current.clone().unwrap_or_default();
        let scope = match &query.within {
            Some(scope) => Some(state.node(scope)?.name.clone()),
            None => None,
        };
        Ok(state
            .page()?
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.matches(query))
            .filter(|(_, node)| scope.is_none() || node.parent == scope)
            .map(|(index, _)| FixtureState::element_ref(&url, index))
            .collect())
    }

    /// Single attempt; records the wait the caller asked for.
    async fn find(&self, query: &FindQuery) -> DriverResult<ElementRef> {
        self.state.lock().last_find_wait = query.wait;
        let mut found = self.find_all(query).await?;
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(DriverError::NotFound(query.describe())),
            count => Err(DriverError::Ambiguous {
                selector: query.describe(),
                count,
            }),
        }
    }

    async fn set_value(&self, element: &ElementRef, value: &str) -> DriverResult<()> {
        let mut state = self.state.lock();
        let name = state.node(element)?.name.clone();
        state.events.push(BrowserEvent::SetValue {
            element: name,
            value: value.to_string(),
        });
        Ok(())
    }

    async fn set_checked(&self, element: &ElementRef, checked: bool) -> DriverResult<()> {
        let mut state = self.state.lock();
        let name = state.node(element)?.name.clone();
        state.events.push(BrowserEvent::SetChecked {
            element: name,
            checked,
        });
        Ok(())
    }

    async fn select_option(&self, element: &ElementRef) -> DriverResult<()> {
        let mut state = self.state.lock();
        let node = state.node(element)?;
        let event = BrowserEvent::Select {
            scope: node.parent.clone(),
            option: node.name.clone(),
        };
        state.events.push(event);
        Ok(())
    }

    async fn click(&self, element: &ElementRef) -> DriverResult<()> {
        let mut state = self.state.lock();
        let node = state.node(element)?;
        let name = node.name.clone();
        let target = node.navigates_to.clone();
        state.events.push(BrowserEvent::Click(name));
        if let Some(url) = target {
            state.current = Some(url);
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> DriverResult<Value> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.events.push(BrowserEvent::Evaluate(script.to_string()));
        Ok(state
            .script_results
            .iter()
            .find(|(fragment, _)| script.contains(fragment.as_str()))
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Null))
    }

    async fn page_text(&self) -> DriverResult<String> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.page().map(|page| page.text.clone()).unwrap_or_default())
    }

    async fn screenshot(&self, path: &Path) -> DriverResult<()> {
        let (width, height) = {
            let mut state = self.state.lock();
            state.ensure_open()?;
            state.events.push(BrowserEvent::Screenshot);
            state.screenshot_size
        };
        image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]))
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| DriverError::Session(format!("screenshot failed: {e}")))
    }

    async fn window_size(&self) -> DriverResult<(u32, u32)> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.window_size)
    }

    async fn set_window_size(&self, width: u32, height: u32) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.window_size = (width, height);
        state.events.push(BrowserEvent::Resize { width, height });
        Ok(())
    }

    async fn quit(&self) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.quit = true;
        state.events.push(BrowserEvent::Quit);
        Ok(())
    }
}

/// Hands out clones of one fixture browser and records session requests.
#[derive(Debug, Clone)]
pub struct FixtureSessions {
    browser: FixtureBrowser,
    requests: Arc<Mutex<Vec<SessionRequest>>>,
    fail_with: Option<String>,
}

impl FixtureSessions {
    pub fn new(browser: FixtureBrowser) -> Self {
        Self {
            browser,
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new(FixtureBrowser::new())
        }
    }

    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SessionFactory for FixtureSessions {
    async fn open(&self, request: &SessionRequest) -> DriverResult<Box<dyn BrowserDriver>> {
        self.requests.lock().push(request.clone());
        if let Some(message) = &self.fail_with {
            return Err(DriverError::Session(message.clone()));
        }
        Ok(Box::new(self.browser.clone()))
    }
}

/// Image store that keeps nothing but a record of what it was given.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    stored: Mutex<Vec<(ImageKind, PathBuf)>>,
    fail: bool,
    counter: AtomicUsize,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Source paths handed to `store`, including failed attempts.
    pub fn stored(&self) -> Vec<(ImageKind, PathBuf)> {
        self.stored.lock().clone()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store(&self, file: &Path, kind: ImageKind) -> anyhow::Result<String> {
        self.stored.lock().push((kind, file.to_path_buf()));
        if self.fail {
            anyhow::bail!("image upload refused");
        }
        if !file.exists() {
            anyhow::bail!("image {} does not exist", file.display());
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(format!("memory://{}/{n}.png", kind.dir_name()))
    }
}

/// Collects recorded outcomes.
#[derive(Debug, Default)]
pub struct RecordingSink {
    outcomes: Mutex<Vec<FillOutcome>>,
}

impl RecordingSink {
    pub fn outcomes(&self) -> Vec<FillOutcome> {
        self.outcomes.lock().clone()
    }
}

impl FillStatusSink for RecordingSink {
    fn record(&self, outcome: &FillOutcome) -> anyhow::Result<()> {
        self.outcomes.lock().push(outcome.clone());
        Ok(())
    }
}

/// Answers captchas from a queue and remembers what it was shown.
#[derive(Debug, Default)]
pub struct ScriptedSolver {
    replies: Mutex<VecDeque<CaptchaReply>>,
    challenges: Mutex<Vec<CaptchaChallenge>>,
}

impl ScriptedSolver {
    pub fn new(replies: impl IntoIterator<Item = CaptchaReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            challenges: Mutex::new(Vec::new()),
        }
    }

    pub fn challenges(&self) -> Vec<CaptchaChallenge> {
        self.challenges.lock().clone()
    }
}

#[async_trait]
impl CaptchaSolver for ScriptedSolver {
    async fn solve(&self, challenge: &CaptchaChallenge, _session: &dyn BrowserDriver) -> CaptchaReply {
        self.challenges.lock().push(challenge.clone());
        self.replies.lock().pop_front().unwrap_or(CaptchaReply::Cancel)
    }
}

/// Messaging API that renders messages and records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingMessagingApi {
    validated: Mutex<Vec<CwcMessage>>,
    delivered: Mutex<Vec<CwcMessage>>,
    reject_with: Option<(u16, String)>,
}

impl RecordingMessagingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(status: u16, body: impl Into<String>) -> Self {
        Self {
            reject_with: Some((status, body.into())),
            ..Self::default()
        }
    }

    pub fn validated(&self) -> Vec<CwcMessage> {
        self.validated.lock().clone()
    }

    pub fn delivered(&self) -> Vec<CwcMessage> {
        self.delivered.lock().clone()
    }

    fn check(&self) -> Result<(), CwcError> {
        match &self.reject_with {
            Some((status, body)) => Err(CwcError::Api {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessagingApi for RecordingMessagingApi {
    fn create_message(&self, params: CwcMessageParams) -> Result<CwcMessage, CwcError> {
        let delivery_id = uuid::Uuid::new_v4().simple().to_string();
        let document = xml::render(&delivery_id, Utc::now().date_naive(), &DeliveryAgent::default(), &params);
        Ok(CwcMessage {
            delivery_id,
            params,
            document,
        })
    }

    async fn validate(&self, message: &CwcMessage) -> Result<(), CwcError> {
        self.check()?;
        self.validated.lock().push(message.clone());
        Ok(())
    }

    async fn deliver(&self, message: &CwcMessage) -> Result<(), CwcError> {
        self.check()?;
        self.delivered.lock().push(message.clone());
        Ok(())
    }
}
