//! Form action execution engine.
//!
//! A [`FormFiller`] turns a legislator profile and a field map into a
//! [`FormRun`]: one browser session walked through the profile's ordered
//! steps. A run pauses when it reaches a captcha and hands itself back
//! holding the challenge; [`FormRun::resume`] continues from the interrupted
//! step. [`FormFiller::fill_out_form`] drives the whole loop with a
//! [`CaptchaSolver`].

pub mod fields;
mod run;

pub use fields::{FieldMap, FillLog, prepare_value};
pub use run::{FillReport, FormRun, RunState};

use crate::captcha::{CaptchaCapture, CaptchaReply, CaptchaRegion, CaptchaSolver};
use crate::config::FormsConfig;
use crate::error::{FillError, FillResult};
use crate::images::ImageStore;
use crate::models::{ActionStep, LegislatorProfile};
use crate::store::FillStatusSink;
use congress_forms_browser::{BrowserDriver, SessionFactory, SessionRequest};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Text-browser user agent for forms guarded by Google reCAPTCHA.
pub const LYNX_USER_AGENT: &str = "Lynx/2.8.8dev.3 libwww-FM/2.14 SSL-MM/1.4.1";
/// Page load timeout for those forms; some of their iframes never finish.
pub const RECAPTCHA_PAGE_LOAD_TIMEOUT_SECS: u64 = 4;
pub const DEFAULT_FIND_WAIT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct FillSettings {
    pub session: SessionRequest,
    /// Wait for `find` steps without their own `wait` option.
    pub default_find_wait: Duration,
    pub record_fill_statuses: bool,
    /// Fixed captcha regions by bioguide id.
    pub captcha_overrides: HashMap<String, CaptchaRegion>,
    pub capture: CaptchaCapture,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self {
            session: SessionRequest::default(),
            default_find_wait: Duration::from_secs(DEFAULT_FIND_WAIT_SECS),
            record_fill_statuses: true,
            captcha_overrides: HashMap::new(),
            capture: CaptchaCapture::new(),
        }
    }
}

impl FillSettings {
    pub fn from_config(config: &FormsConfig) -> Self {
        Self {
            session: config.browser.session_request(),
            default_find_wait: Duration::from_secs(config.fill.default_find_wait_secs),
            record_fill_statuses: config.fill.record_fill_statuses,
            captcha_overrides: config
                .captcha
                .overrides
                .iter()
                .map(|(id, region)| (id.clone(), *region))
                .collect(),
            capture: CaptchaCapture::new(),
        }
    }
}

/// Per-invocation inputs.
#[derive(Debug, Clone, Default)]
pub struct FillRequest {
    pub fields: FieldMap,
    pub campaign_tag: Option<String>,
    /// Skip every step ordered before the step with this id.
    pub start_at: Option<u64>,
    /// Hand the session back in the report instead of quitting it.
    pub persist_session: bool,
}

impl FillRequest {
    pub fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_campaign_tag(mut self, tag: impl Into<String>) -> Self {
        self.campaign_tag = Some(tag.into());
        self
    }

    pub fn starting_at(mut self, step_id: u64) -> Self {
        self.start_at = Some(step_id);
        self
    }

    pub fn persist_session(mut self) -> Self {
        self.persist_session = true;
        self
    }
}

/// Collaborators shared by every run of one filler.
pub(crate) struct RunContext {
    pub images: Arc<dyn ImageStore>,
    pub sink: Option<Arc<dyn FillStatusSink>>,
    pub settings: FillSettings,
}

pub struct FormFiller {
    sessions: Arc<dyn SessionFactory>,
    images: Arc<dyn ImageStore>,
    sink: Option<Arc<dyn FillStatusSink>>,
    settings: FillSettings,
}

impl FormFiller {
    pub fn new(sessions: Arc<dyn SessionFactory>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            sessions,
            images,
            sink: None,
            settings: FillSettings::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn FillStatusSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_settings(mut self, settings: FillSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &FillSettings {
        &self.settings
    }

    fn context(&self) -> Arc<RunContext> {
        Arc::new(RunContext {
            images: self.images.clone(),
            sink: self.sink.clone(),
            settings: self.settings.clone(),
        })
    }

    /// Session parameters for `profile`.
    pub fn session_request(&self, profile: &LegislatorProfile) -> SessionRequest {
        let mut request = self.settings.session.clone();
        if profile.has_google_recaptcha() {
            request.user_agent = Some(LYNX_USER_AGENT.to_string());
            request.page_load_timeout_secs = Some(RECAPTCHA_PAGE_LOAD_TIMEOUT_SECS);
        }
        request
    }

    /// Open a session and prepare a run. Nothing executes until
    /// [`FormRun::advance`].
    pub async fn begin(&self, profile: &LegislatorProfile, request: FillRequest) -> FillResult<FormRun> {
        let steps = plan_steps(profile, request.start_at)?;
        let session = self.sessions.open(&self.session_request(profile)).await?;
        debug!(bioguide_id = %profile.bioguide_id, session_id = session.session_id(), "Session opened for fill");
        Ok(FormRun::new(self.context(), profile.clone(), request, steps, session))
    }

    /// Prepare a run on a session the caller already holds, e.g. one handed
    /// back by a previous run with `persist_session`. A session that can't
    /// start a run is returned untouched inside the error.
    pub fn begin_with_session(
        &self,
        profile: &LegislatorProfile,
        request: FillRequest,
        session: Box<dyn BrowserDriver>,
    ) -> Result<FormRun, RejectedSession> {
        match plan_steps(profile, request.start_at) {
            Ok(steps) => Ok(FormRun::new(self.context(), profile.clone(), request, steps, session)),
            Err(error) => Err(RejectedSession { error, session }),
        }
    }

    /// Run the profile's script to completion, asking `solver` for captchas.
    pub async fn fill_out_form(
        &self,
        profile: &LegislatorProfile,
        request: FillRequest,
        solver: &dyn CaptchaSolver,
    ) -> FillResult<FillReport> {
        let mut state = self.begin(profile, request).await?.advance().await;
        loop {
            match state {
                RunState::Finished(report) => return Ok(report),
                RunState::AwaitingCaptcha(run) => {
                    let reply = match (run.challenge(), run.session()) {
                        (Some(challenge), Some(session)) => solver.solve(challenge, session).await,
                        _ => CaptchaReply::Cancel,
                    };
                    state = run.resume(reply).await;
                }
            }
        }
    }
}

/// A caller-held session that couldn't start a run.
pub struct RejectedSession {
    pub error: FillError,
    pub session: Box<dyn BrowserDriver>,
}

impl fmt::Debug for RejectedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RejectedSession")
            .field("error", &self.error)
            .field("session", &self.session.session_id())
            .finish()
    }
}

impl fmt::Display for RejectedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for RejectedSession {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Ordered steps to execute, starting at `start_at` when given.
fn plan_steps(profile: &LegislatorProfile, start_at: Option<u64>) -> FillResult<Vec<ActionStep>> {
    profile.validate()?;
    let ordered = profile.ordered_steps();
    let start = match start_at {
        None => 0,
        Some(id) => ordered.iter().position(|s| s.id == id).ok_or_else(|| {
            FillError::invalid_step(id, format!("not a step of {}", profile.bioguide_id))
        })?,
    };
    Ok(ordered[start..].iter().map(|s| (*s).clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionKind;

    fn profile() -> LegislatorProfile {
        LegislatorProfile::senator("S000148", "NY", 3).with_steps(vec![
            ActionStep::new(10, 0, ActionKind::Visit).with_value("https://example.com"),
            ActionStep::new(11, 1, ActionKind::ClickOn).with_selector("#a"),
            ActionStep::new(12, 2, ActionKind::ClickOn).with_selector("#b"),
        ])
    }

    #[test]
    fn plan_skips_to_resume_point_by_identity() {
        let steps = plan_steps(&profile(), Some(11)).unwrap();
        let ids: Vec<u64> = steps.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![11, 12]);
    }

    #[test]
    fn plan_rejects_unknown_resume_point() {
        let err = plan_steps(&profile(), Some(99)).unwrap_err();
        assert!(matches!(err, FillError::InvalidStep { step_id: 99, .. }));
    }

    #[test]
    fn settings_from_config_copy_overrides() {
        let mut config = FormsConfig::default();
        config
            .captcha
            .overrides
            .insert("S000148".to_string(), CaptchaRegion::new(1.0, 2.0, 3.0, 4.0));
        config.fill.default_find_wait_secs = 9;
        let settings = FillSettings::from_config(&config);
        assert_eq!(settings.default_find_wait, Duration::from_secs(9));
        assert!(settings.captcha_overrides.contains_key("S000148"));
    }
}
