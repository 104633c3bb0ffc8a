use super::fields::{FieldMap, FillLog, prepare_value};
use super::{FillRequest, RunContext};
use crate::captcha::{CaptchaChallenge, CaptchaReply};
use crate::error::{FillError, FillResult};
use crate::models::{ActionKind, ActionStep, FillOutcome, LegislatorProfile, PLACEHOLDER_VALUES, is_placeholder};
use crate::selector::resolve_option;
use congress_forms_browser::{BrowserDriver, DriverResult, FindQuery, quote_attr};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span, debug, info, info_span, warn};

/// Where a run stands after [`FormRun::advance`] or [`FormRun::resume`].
pub enum RunState {
    /// Paused on a captcha; see [`FormRun::challenge`].
    AwaitingCaptcha(FormRun),
    Finished(FillReport),
}

pub struct FillReport {
    pub outcome: FillOutcome,
    /// Present only when the run was asked to persist its session.
    pub session: Option<Box<dyn BrowserDriver>>,
}

impl fmt::Debug for FillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillReport")
            .field("outcome", &self.outcome)
            .field("session", &self.session.as_ref().map(|s| s.session_id()))
            .finish()
    }
}

impl fmt::Debug for FormRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormRun")
            .field("cursor", &self.cursor)
            .field("session", &self.session.as_ref().map(|s| s.session_id()))
            .finish_non_exhaustive()
    }
}

enum Flow {
    Continue,
    Captcha(CaptchaChallenge),
}

/// One execution of a profile's script on one browser session.
///
/// Dropping a run that hasn't finished releases its session in the
/// background.
pub struct FormRun {
    ctx: Arc<RunContext>,
    profile: LegislatorProfile,
    fields: FieldMap,
    campaign_tag: Option<String>,
    persist_session: bool,
    steps: Vec<ActionStep>,
    cursor: usize,
    pending: Option<CaptchaChallenge>,
    session: Option<Box<dyn BrowserDriver>>,
    log: FillLog,
    span: Span,
}

impl FormRun {
    pub(crate) fn new(
        ctx: Arc<RunContext>,
        profile: LegislatorProfile,
        request: FillRequest,
        steps: Vec<ActionStep>,
        session: Box<dyn BrowserDriver>,
    ) -> Self {
        let mut log = FillLog::new(&profile.bioguide_id, &request.fields);
        let span = info_span!("fill", bioguide_id = %profile.bioguide_id, fill = %log.fingerprint());
        span.in_scope(|| log.record("begin"));
        Self {
            ctx,
            profile,
            fields: request.fields,
            campaign_tag: request.campaign_tag,
            persist_session: request.persist_session,
            steps,
            cursor: 0,
            pending: None,
            session: Some(session),
            log,
            span,
        }
    }

    pub fn bioguide_id(&self) -> &str {
        &self.profile.bioguide_id
    }

    /// The captcha this run is waiting on, if paused.
    pub fn challenge(&self) -> Option<&CaptchaChallenge> {
        self.pending.as_ref()
    }

    pub fn session(&self) -> Option<&dyn BrowserDriver> {
        self.session.as_deref()
    }

    /// Steps not yet executed, starting with the interrupted one when paused.
    pub fn remaining_steps(&self) -> &[ActionStep] {
        &self.steps[self.cursor.min(self.steps.len())..]
    }

    pub fn fill_log(&self) -> &[String] {
        self.log.lines()
    }

    /// Execute steps until the script ends or a captcha needs solving.
    pub async fn advance(self) -> RunState {
        let span = self.span.clone();
        self.run_steps().instrument(span).await
    }

    /// Answer the pending captcha and continue.
    pub async fn resume(self, reply: CaptchaReply) -> RunState {
        let span = self.span.clone();
        self.resume_inner(reply).instrument(span).await
    }

    async fn resume_inner(mut self, reply: CaptchaReply) -> RunState {
        let Some(challenge) = self.pending.take() else {
            warn!("Resume without a pending captcha, continuing");
            return self.run_steps().await;
        };

        match reply {
            CaptchaReply::Cancel => {
                self.log.record("captcha cancelled");
                self.conclude(None).await
            }
            CaptchaReply::Solution(solution) => match self.enter_solution(&challenge.step, &solution).await {
                Ok(()) => {
                    self.cursor += 1;
                    self.run_steps().await
                }
                Err(fault) => self.conclude(Some(fault)).await,
            },
        }
    }

    async fn run_steps(mut self) -> RunState {
        if self.pending.is_some() {
            return RunState::AwaitingCaptcha(self);
        }

        while let Some(step) = self.steps.get(self.cursor).cloned() {
            self.log.record(step.describe());
            match self.execute(&step).await {
                Ok(Flow::Continue) => self.cursor += 1,
                Ok(Flow::Captcha(challenge)) => {
                    info!(step_id = step.id, image_url = %challenge.image_url, "Awaiting captcha solution");
                    self.pending = Some(challenge);
                    return RunState::AwaitingCaptcha(self);
                }
                Err(fault) => return self.conclude(Some(fault)).await,
            }
        }
        self.conclude(None).await
    }

    fn driver(&self) -> FillResult<&dyn BrowserDriver> {
        self.session
            .as_deref()
            .ok_or_else(|| FillError::Browser("session already released".to_string()))
    }

    async fn execute(&self, step: &ActionStep) -> FillResult<Flow> {
        let driver = self.driver()?;
        match step.action {
            ActionKind::Visit => driver.navigate(step.value_or_err()?).await?,
            ActionKind::Wait => {
                tokio::time::sleep(Duration::from_secs(step.wait_secs()?)).await;
            }
            ActionKind::FillIn => return self.fill_in(driver, step).await,
            ActionKind::Select => self.select(driver, step).await?,
            ActionKind::ClickOn => {
                let element = driver.find(&FindQuery::css(step.selector_or_err()?)).await?;
                driver.click(&element).await?;
            }
            ActionKind::Find => self.find(driver, step).await?,
            ActionKind::Check | ActionKind::Uncheck => {
                let element = driver.find(&FindQuery::css(step.selector_or_err()?)).await?;
                driver
                    .set_checked(&element, step.action == ActionKind::Check)
                    .await?;
            }
            ActionKind::Choose => self.choose(driver, step).await?,
            ActionKind::Javascript => {
                driver.evaluate(step.value_or_err()?).await?;
            }
            ActionKind::Recaptcha => {
                return Err(FillError::UnsupportedChallenge(self.profile.bioguide_id.clone()));
            }
        }
        Ok(Flow::Continue)
    }

    async fn fill_in(&self, driver: &dyn BrowserDriver, step: &ActionStep) -> FillResult<Flow> {
        let Some(value) = step.value.as_deref() else {
            return Ok(Flow::Continue);
        };
        if step.is_captcha() {
            return self.capture_captcha(driver, step).await.map(Flow::Captcha);
        }

        let text = if is_placeholder(value) {
            match self.fields.get(value) {
                Some(field) => prepare_value(field, step.options.max_length),
                None if step.required => {
                    return Err(FillError::MissingField {
                        field: value.to_string(),
                        step_id: step.id,
                    });
                }
                None => {
                    debug!(step_id = step.id, field = value, "No value supplied, skipping");
                    return Ok(Flow::Continue);
                }
            }
        } else {
            value.to_string()
        };

        let element = driver.find(&FindQuery::css(step.selector_or_err()?)).await?;
        driver.set_value(&element, &text).await?;
        Ok(Flow::Continue)
    }

    async fn capture_captcha(
        &self,
        driver: &dyn BrowserDriver,
        step: &ActionStep,
    ) -> FillResult<CaptchaChallenge> {
        let settings = &self.ctx.settings;
        let region_override = settings
            .captcha_overrides
            .get(&self.profile.bioguide_id)
            .copied();
        let region = settings
            .capture
            .locate(driver, region_override, step.captcha_selector.as_deref())
            .await?;
        let image_url = settings
            .capture
            .capture_region(driver, self.ctx.images.as_ref(), region)
            .await?;
        Ok(CaptchaChallenge {
            bioguide_id: self.profile.bioguide_id.clone(),
            image_url,
            step: step.clone(),
        })
    }

    async fn enter_solution(&self, step: &ActionStep, solution: &str) -> FillResult<()> {
        let driver = self.driver()?;
        let element = driver.find(&FindQuery::css(step.selector_or_err()?)).await?;
        driver.set_value(&element, solution).await?;
        Ok(())
    }

    async fn select(&self, driver: &dyn BrowserDriver, step: &ActionStep) -> FillResult<()> {
        let scope_selector = step.selector_or_err()?;
        let value = step.value_or_err()?;
        let target = match self.fields.get(value) {
            Some(mapped) => mapped,
            None if PLACEHOLDER_VALUES.contains(&value) => {
                debug!(step_id = step.id, field = value, "No selection supplied, skipping");
                return Ok(());
            }
            None => value,
        };

        match select_in_scope(driver, scope_selector, target).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_lookup() && step.options.dependent => {
                warn!(step_id = step.id, error = %err, "Dependent select found no option, continuing");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find(&self, driver: &dyn BrowserDriver, step: &ActionStep) -> FillResult<()> {
        let wait = step
            .options
            .wait
            .map(Duration::from_secs)
            .unwrap_or(self.ctx.settings.default_find_wait);
        let mut query = FindQuery::css(step.selector_or_err()?).wait(wait);
        if let Some(pattern) = &step.value {
            let pattern = Regex::new(pattern)
                .map_err(|e| FillError::invalid_step(step.id, format!("invalid find pattern: {e}")))?;
            query = query.matching_text(pattern);
        }
        driver.find(&query).await?;
        Ok(())
    }

    async fn choose(&self, driver: &dyn BrowserDriver, step: &ActionStep) -> FillResult<()> {
        let selector = step.selector_or_err()?;
        let target = if step.options.choices.is_none() {
            selector.to_string()
        } else {
            let field = step.value_or_err()?;
            match self.fields.get(field) {
                Some(choice) => format!("{selector}[value=\"{}\"]", quote_attr(choice)),
                None if step.required => {
                    return Err(FillError::MissingField {
                        field: field.to_string(),
                        step_id: step.id,
                    });
                }
                None => {
                    debug!(step_id = step.id, field, "No choice supplied, skipping");
                    return Ok(());
                }
            }
        };

        let element = driver.find(&FindQuery::css(target)).await?;
        driver.set_checked(&element, true).await?;
        Ok(())
    }

    /// Classify, capture diagnostics, record and release the session.
    async fn conclude(mut self, fault: Option<FillError>) -> RunState {
        let fault = match fault {
            Some(fault) => Some(fault),
            None => match self.classify().await {
                Ok(true) => {
                    self.log.record("done: passing success criteria");
                    None
                }
                Ok(false) => {
                    self.log.record("done: failing success criteria");
                    let screenshot = self.screenshot().await;
                    let outcome = FillOutcome::failure(
                        &self.profile.bioguide_id,
                        self.campaign_tag.clone(),
                        screenshot,
                        self.log.lines().to_vec(),
                    );
                    return self.finish(outcome).await;
                }
                Err(fault) => Some(fault),
            },
        };

        let outcome = match fault {
            None => FillOutcome::success(&self.profile.bioguide_id, self.campaign_tag.clone()),
            Some(fault) => {
                warn!(error = %fault, kind = %fault.kind(), "Fill aborted");
                self.log
                    .record(format!("done: unsuccessful fill ({})", fault.kind()));
                let screenshot = self.screenshot().await;
                FillOutcome::error(
                    &self.profile.bioguide_id,
                    self.campaign_tag.clone(),
                    &fault,
                    screenshot,
                    self.log.lines().to_vec(),
                )
            }
        };
        self.finish(outcome).await
    }

    async fn classify(&self) -> FillResult<bool> {
        let text = self.driver()?.page_text().await?;
        Ok(self.profile.success_criteria.check_success(&text))
    }

    async fn screenshot(&self) -> Option<String> {
        let driver = self.driver().ok()?;
        match self
            .ctx
            .settings
            .capture
            .capture_page(driver, self.ctx.images.as_ref())
            .await
        {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(error = %err, "Failed to capture screenshot");
                None
            }
        }
    }

    async fn finish(mut self, outcome: FillOutcome) -> RunState {
        info!(status = %outcome.status, outcome_id = %outcome.id, "Fill finished");

        if self.ctx.settings.record_fill_statuses
            && let Some(sink) = &self.ctx.sink
            && let Err(err) = sink.record(&outcome)
        {
            warn!(error = %err, "Failed to record fill status");
        }

        let session = self.session.take();
        let session = match session {
            Some(session) if self.persist_session => Some(session),
            Some(session) => {
                if let Err(err) = session.quit().await {
                    warn!(error = %err, "Failed to quit browser session");
                }
                None
            }
            None => None,
        };

        RunState::Finished(FillReport { outcome, session })
    }
}

impl Drop for FormRun {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(bioguide_id = %self.profile.bioguide_id, "Run dropped before finishing");
            release_in_background(session);
        }
    }
}

/// Quit `session` without waiting for it.
fn release_in_background(session: Box<dyn BrowserDriver>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(err) = session.quit().await {
                    warn!(error = %err, "Failed to release abandoned browser session");
                }
            });
        }
        Err(_) => warn!(
            session_id = session.session_id(),
            "No runtime to release abandoned browser session"
        ),
    }
}

async fn select_in_scope(driver: &dyn BrowserDriver, scope_selector: &str, target: &str) -> DriverResult<()> {
    let scope = driver.find(&FindQuery::css(scope_selector)).await?;
    let option = resolve_option(driver, &scope, target).await?;
    driver.select_option(&option).await
}
