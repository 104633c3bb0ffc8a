#![cfg(feature = "test-utils")]

//! End-to-end fills against fixture pages.

use std::sync::Arc;
use std::time::Duration;

use congress_forms_browser::{SessionFactory, SessionRequest};
use congress_forms_core::captcha::{CaptchaCapture, CaptchaRegion, CaptchaReply};
use congress_forms_core::engine::{
    FieldMap, FillRequest, FillSettings, FormFiller, LYNX_USER_AGENT, RunState,
};
use congress_forms_core::error::{FaultKind, FillError};
use congress_forms_core::images::ImageKind;
use congress_forms_core::testkit::{
    BrowserEvent, FixtureBrowser, FixtureNode, FixturePage, FixtureSessions, MemoryImageStore,
    RecordingSink, ScriptedSolver,
};
use congress_forms_core::{
    ActionKind, ActionStep, LegislatorProfile, OutcomeStatus, StepOptions, SuccessCriteria,
};
use serde_json::json;

const FORM: &str = "https://senate.example.gov/contact";
const THANKS: &str = "https://senate.example.gov/thanks";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    browser: FixtureBrowser,
    sessions: FixtureSessions,
    images: Arc<MemoryImageStore>,
    sink: Arc<RecordingSink>,
    filler: FormFiller,
}

fn harness(browser: FixtureBrowser) -> Harness {
    harness_with(browser, MemoryImageStore::new(), FillSettings::default())
}

fn harness_with(browser: FixtureBrowser, images: MemoryImageStore, settings: FillSettings) -> Harness {
    let sessions = FixtureSessions::new(browser.clone());
    let images = Arc::new(images);
    let sink = Arc::new(RecordingSink::default());
    let filler = FormFiller::new(Arc::new(sessions.clone()), images.clone())
        .with_sink(sink.clone())
        .with_settings(settings);
    Harness {
        browser,
        sessions,
        images,
        sink,
        filler,
    }
}

fn jane() -> FieldMap {
    FieldMap::new()
        .with("$NAME_FIRST", "Jane")
        .with("$NAME_LAST", "Doe")
        .with("$EMAIL", "jane@example.com")
        .with("$MESSAGE", "Please support bill X")
}

fn contact_page() -> FixturePage {
    FixturePage::new("Contact Senator Smith")
        .node(FixtureNode::new("#first"))
        .node(FixtureNode::new("#last"))
        .node(FixtureNode::new("#email"))
        .node(FixtureNode::new("#msg"))
        .node(FixtureNode::new("#submit").navigates_to(THANKS))
}

fn confirmation(text: &str) -> FixturePage {
    FixturePage::new(text).node(FixtureNode::new(".confirmation").with_text(text))
}

fn jane_doe_profile() -> LegislatorProfile {
    LegislatorProfile::senator("S000148", "NY", 3)
        .with_steps(vec![
            ActionStep::new(1, 0, ActionKind::Visit).with_value(FORM),
            ActionStep::new(2, 1, ActionKind::FillIn)
                .with_selector("#first")
                .with_value("$NAME_FIRST")
                .required(),
            ActionStep::new(3, 2, ActionKind::FillIn)
                .with_selector("#last")
                .with_value("$NAME_LAST")
                .required(),
            ActionStep::new(4, 3, ActionKind::FillIn)
                .with_selector("#email")
                .with_value("$EMAIL")
                .required(),
            ActionStep::new(5, 4, ActionKind::FillIn)
                .with_selector("#msg")
                .with_value("$MESSAGE")
                .required(),
            ActionStep::new(6, 5, ActionKind::ClickOn).with_selector("#submit"),
            ActionStep::new(7, 6, ActionKind::Find)
                .with_selector(".confirmation")
                .with_options(StepOptions {
                    wait: Some(5),
                    ..StepOptions::default()
                }),
        ])
        .with_success_criteria(SuccessCriteria::body_contains("Thank you"))
}

fn jane_doe_browser(confirmation_text: &str) -> FixtureBrowser {
    FixtureBrowser::new()
        .with_page(FORM, contact_page())
        .with_page(THANKS, confirmation(confirmation_text))
}

/// Profile whose form has a state dropdown driven by `step`.
fn select_profile(step: ActionStep) -> LegislatorProfile {
    LegislatorProfile::senator("F000062", "CA", 1)
        .with_steps(vec![ActionStep::new(1, 0, ActionKind::Visit).with_value(FORM), step])
        .with_success_criteria(SuccessCriteria::body_contains("Contact"))
}

fn state_dropdown() -> FixtureBrowser {
    FixtureBrowser::new().with_page(
        FORM,
        FixturePage::new("Contact us").select(
            "#state",
            &[
                ("TX", "CA"),
                ("CA", "California"),
                ("CN", "California North"),
                ("CL", "Cali"),
            ],
        ),
    )
}

fn captcha_profile() -> LegislatorProfile {
    LegislatorProfile::representative("P000197", "CA", 11)
        .with_steps(vec![
            ActionStep::new(1, 0, ActionKind::Visit).with_value(FORM),
            ActionStep::new(2, 1, ActionKind::FillIn)
                .with_selector("#first")
                .with_value("$NAME_FIRST"),
            ActionStep::new(3, 2, ActionKind::FillIn)
                .with_selector("#captcha")
                .with_value("$CAPTCHA_SOLUTION")
                .with_captcha_selector("#captcha-img"),
            ActionStep::new(4, 3, ActionKind::ClickOn).with_selector("#submit"),
        ])
        .with_success_criteria(SuccessCriteria::body_contains("Thank you"))
}

fn captcha_browser() -> FixtureBrowser {
    FixtureBrowser::new()
        .with_page(
            FORM,
            contact_page()
                .node(FixtureNode::new("#captcha"))
                .node(FixtureNode::new("#captcha-img")),
        )
        .with_page(THANKS, confirmation("Thank you for writing"))
        .with_script_result(
            "#captcha-img",
            json!({"left": 10.0, "top": 20.0, "width": 60.0, "height": 30.0}),
        )
}

// ---------------------------------------------------------------------------
// Jane Doe scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn confirmed_submission_is_a_success() {
    let h = harness(jane_doe_browser("Thank you for your message"));
    let solver = ScriptedSolver::default();

    let report = h
        .filler
        .fill_out_form(&jane_doe_profile(), FillRequest::new(jane()), &solver)
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert!(report.outcome.extra.screenshot.is_none());
    assert!(report.session.is_none());
    assert_eq!(
        h.browser.values_set(),
        vec![
            ("#first".to_string(), "Jane".to_string()),
            ("#last".to_string(), "Doe".to_string()),
            ("#email".to_string(), "jane@example.com".to_string()),
            ("#msg".to_string(), "Please support bill X".to_string()),
        ]
    );
    assert_eq!(h.browser.last_find_wait(), Some(Duration::from_secs(5)));
    assert!(h.browser.has_quit());
    assert_eq!(h.sink.outcomes(), vec![report.outcome]);
}

#[tokio::test]
async fn unconfirmed_submission_is_a_failure_with_screenshot() {
    let h = harness(jane_doe_browser("An error occurred"));

    let report = h
        .filler
        .fill_out_form(&jane_doe_profile(), FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Failure);
    let screenshot = report.outcome.extra.screenshot.as_deref().unwrap();
    assert!(screenshot.starts_with("memory://screenshots/"));
    assert!(report.outcome.extra.fault.is_none());
    assert!(!report.outcome.extra.fill_log.is_empty());
    assert_eq!(h.images.stored()[0].0, ImageKind::Screenshot);
}

#[tokio::test]
async fn repeated_runs_classify_identically() {
    let profile = jane_doe_profile();
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let h = harness(jane_doe_browser("Thank you for your message"));
        let report = h
            .filler
            .fill_out_form(&profile, FillRequest::new(jane()), &ScriptedSolver::default())
            .await
            .unwrap();
        statuses.push(report.outcome.status);
    }
    assert_eq!(statuses, vec![OutcomeStatus::Success; 3]);
}

#[tokio::test]
async fn missing_element_is_an_error_outcome() {
    let browser = FixtureBrowser::new()
        .with_page(FORM, FixturePage::new("Contact").node(FixtureNode::new("#first")));
    let h = harness(browser);

    let report = h
        .filler
        .fill_out_form(&jane_doe_profile(), FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Error);
    assert_eq!(report.outcome.extra.fault_kind, Some(FaultKind::Lookup));
    assert!(report.outcome.extra.screenshot.is_some());
    assert!(h.browser.has_quit());
}

#[tokio::test]
async fn missing_required_field_is_an_error_outcome() {
    let h = harness(jane_doe_browser("Thank you"));
    let fields = FieldMap::new().with("$NAME_FIRST", "Jane");

    let report = h
        .filler
        .fill_out_form(&jane_doe_profile(), FillRequest::new(fields), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Error);
    assert_eq!(report.outcome.extra.fault_kind, Some(FaultKind::MissingField));
}

#[tokio::test]
async fn max_length_truncates_field_value() {
    let profile = LegislatorProfile::senator("S000148", "NY", 3)
        .with_steps(vec![
            ActionStep::new(1, 0, ActionKind::Visit).with_value(FORM),
            ActionStep::new(2, 1, ActionKind::FillIn)
                .with_selector("#msg")
                .with_value("$MESSAGE")
                .with_options(StepOptions {
                    max_length: Some(20),
                    ..StepOptions::default()
                }),
        ])
        .with_success_criteria(SuccessCriteria::body_contains("Contact"));
    let h = harness(jane_doe_browser("Thank you"));
    let fields = FieldMap::new().with("$MESSAGE", "a\tb".repeat(10));

    h.filler
        .fill_out_form(&profile, FillRequest::new(fields), &ScriptedSolver::default())
        .await
        .unwrap();

    let (_, value) = &h.browser.values_set()[0];
    // 19 characters of the original, tabs expanded afterwards
    assert_eq!(value, &"a\tb".repeat(10).chars().take(19).collect::<String>().replace('\t', "    "));
}

// ---------------------------------------------------------------------------
// Select resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn literal_select_value_matches_option_value_exactly() {
    let h = harness(state_dropdown());
    let step = ActionStep::new(2, 1, ActionKind::Select)
        .with_selector("#state")
        .with_value("CA");

    let report = h
        .filler
        .fill_out_form(&select_profile(step), FillRequest::new(FieldMap::new()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert_eq!(h.browser.selected_options(), vec!["CA".to_string()]);
}

#[tokio::test]
async fn exact_value_beats_label_text() {
    // The option labelled "CA" has value "TX"
    let h = harness(state_dropdown());
    let step = ActionStep::new(2, 1, ActionKind::Select)
        .with_selector("#state")
        .with_value("$ADDRESS_STATE_POSTAL_ABBREV");
    let fields = FieldMap::new().with("$ADDRESS_STATE_POSTAL_ABBREV", "CA");

    h.filler
        .fill_out_form(&select_profile(step), FillRequest::new(fields), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(h.browser.selected_options(), vec!["CA".to_string()]);
}

#[tokio::test]
async fn label_match_requires_word_boundary() {
    let h = harness(state_dropdown());
    let step = ActionStep::new(2, 1, ActionKind::Select)
        .with_selector("#state")
        .with_value("$ADDRESS_STATE");
    let fields = FieldMap::new().with("$ADDRESS_STATE", "Cali");

    h.filler
        .fill_out_form(&select_profile(step), FillRequest::new(fields), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(h.browser.selected_options(), vec!["CL".to_string()]);
}

#[tokio::test]
async fn ambiguous_label_takes_first_option() {
    let h = harness(state_dropdown());
    let step = ActionStep::new(2, 1, ActionKind::Select)
        .with_selector("#state")
        .with_value("$ADDRESS_STATE");
    let fields = FieldMap::new().with("$ADDRESS_STATE", "California");

    h.filler
        .fill_out_form(&select_profile(step), FillRequest::new(fields), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(h.browser.selected_options(), vec!["CA".to_string()]);
}

#[tokio::test]
async fn unset_known_placeholder_skips_select() {
    let h = harness(state_dropdown());
    let step = ActionStep::new(2, 1, ActionKind::Select)
        .with_selector("#state")
        .with_value("$ADDRESS_STATE_POSTAL_ABBREV");

    let report = h
        .filler
        .fill_out_form(&select_profile(step), FillRequest::new(FieldMap::new()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert!(h.browser.selected_options().is_empty());
}

#[tokio::test]
async fn dependent_select_tolerates_missing_option() {
    let h = harness(state_dropdown());
    let step = ActionStep::new(2, 1, ActionKind::Select)
        .with_selector("#state")
        .with_value("WY")
        .with_options(StepOptions::dependent());

    let report = h
        .filler
        .fill_out_form(&select_profile(step), FillRequest::new(FieldMap::new()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
}

#[tokio::test]
async fn non_dependent_select_with_missing_option_is_an_error() {
    let h = harness(state_dropdown());
    let step = ActionStep::new(2, 1, ActionKind::Select)
        .with_selector("#state")
        .with_value("WY");

    let report = h
        .filler
        .fill_out_form(&select_profile(step), FillRequest::new(FieldMap::new()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Error);
    assert_eq!(report.outcome.extra.fault_kind, Some(FaultKind::Lookup));
}

// ---------------------------------------------------------------------------
// Captcha pause and resume
// ---------------------------------------------------------------------------

#[tokio::test]
async fn captcha_pauses_with_image_and_resumes_with_solution() {
    let h = harness(captcha_browser());
    let fields = FieldMap::new().with("$NAME_FIRST", "Jane");

    let run = h.filler.begin(&captcha_profile(), FillRequest::new(fields)).await.unwrap();
    let RunState::AwaitingCaptcha(run) = run.advance().await else {
        panic!("expected a captcha pause");
    };

    let challenge = run.challenge().unwrap();
    assert_eq!(challenge.resume_token(), 3);
    assert!(challenge.image_url.starts_with("memory://captchas/"));
    assert_eq!(run.remaining_steps().len(), 2);

    let RunState::Finished(report) = run.resume(CaptchaReply::Solution("x7k9".into())).await else {
        panic!("expected the run to finish");
    };
    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert!(
        h.browser
            .values_set()
            .contains(&("#captcha".to_string(), "x7k9".to_string()))
    );
}

#[tokio::test]
async fn cancelled_captcha_classifies_page_as_it_stands() {
    let h = harness(captcha_browser());
    let solver = ScriptedSolver::new([CaptchaReply::Cancel]);

    let report = h
        .filler
        .fill_out_form(&captcha_profile(), FillRequest::new(FieldMap::new()), &solver)
        .await
        .unwrap();

    assert_eq!(solver.challenges().len(), 1);
    assert_eq!(report.outcome.status, OutcomeStatus::Failure);
    assert!(!h.browser.events().contains(&BrowserEvent::Click("#submit".to_string())));
}

#[tokio::test]
async fn captcha_region_override_skips_element_lookup() {
    let mut settings = FillSettings::default();
    settings
        .captcha_overrides
        .insert("P000197".to_string(), CaptchaRegion::new(0.0, 0.0, 40.0, 20.0));
    let browser = captcha_browser();
    let h = harness_with(browser, MemoryImageStore::new(), settings);
    let solver = ScriptedSolver::new([CaptchaReply::Solution("abc".into())]);

    let report = h
        .filler
        .fill_out_form(&captcha_profile(), FillRequest::new(FieldMap::new()), &solver)
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert!(
        !h.browser
            .events()
            .iter()
            .any(|e| matches!(e, BrowserEvent::Evaluate(script) if script.contains("#captcha-img")))
    );
}

#[tokio::test]
async fn captcha_capture_leaves_no_scratch_files() {
    for images in [MemoryImageStore::new(), MemoryImageStore::failing()] {
        let scratch = tempfile::tempdir().unwrap();
        let settings = FillSettings {
            capture: CaptchaCapture::in_dir(scratch.path()),
            ..FillSettings::default()
        };
        let h = harness_with(captcha_browser(), images, settings);
        let solver = ScriptedSolver::new([CaptchaReply::Solution("abc".into())]);

        h.filler
            .fill_out_form(&captcha_profile(), FillRequest::new(FieldMap::new()), &solver)
            .await
            .unwrap();

        assert!(!h.images.stored().is_empty());
        for (_, path) in h.images.stored() {
            assert!(!path.exists(), "{} was left behind", path.display());
        }
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}

#[tokio::test]
async fn failed_captcha_upload_is_a_capture_error() {
    let h = harness_with(captcha_browser(), MemoryImageStore::failing(), FillSettings::default());

    let report = h
        .filler
        .fill_out_form(&captcha_profile(), FillRequest::new(FieldMap::new()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Error);
    assert_eq!(report.outcome.extra.fault_kind, Some(FaultKind::Capture));
    assert!(report.outcome.extra.screenshot.is_none());
}

#[tokio::test]
async fn recaptcha_forms_use_text_browser_and_fail_unsupported() {
    let profile = LegislatorProfile::senator("S000148", "NY", 3).with_steps(vec![
        ActionStep::new(1, 0, ActionKind::Visit).with_value(FORM),
        ActionStep::new(2, 1, ActionKind::Recaptcha),
    ]);
    let h = harness(jane_doe_browser("Thank you"));

    let report = h
        .filler
        .fill_out_form(&profile, FillRequest::new(FieldMap::new()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.extra.fault_kind, Some(FaultKind::UnsupportedChallenge));
    let requests = h.sessions.requests();
    assert_eq!(requests[0].user_agent.as_deref(), Some(LYNX_USER_AGENT));
    assert_eq!(requests[0].page_load_timeout_secs, Some(4));
}

// ---------------------------------------------------------------------------
// Sessions and recording
// ---------------------------------------------------------------------------

#[tokio::test]
async fn persisted_session_is_handed_back_and_reusable() {
    let h = harness(jane_doe_browser("Thank you for your message"));

    let report = h
        .filler
        .fill_out_form(
            &jane_doe_profile(),
            FillRequest::new(jane()).persist_session(),
            &ScriptedSolver::default(),
        )
        .await
        .unwrap();

    assert!(!h.browser.has_quit());
    let session = report.session.expect("persisted session");

    let run = h
        .filler
        .begin_with_session(&jane_doe_profile(), FillRequest::new(jane()).starting_at(7), session)
        .unwrap();
    let RunState::Finished(report) = run.advance().await else {
        panic!("expected the run to finish");
    };
    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert!(h.browser.has_quit());
}

#[tokio::test]
async fn recording_can_be_disabled() {
    let settings = FillSettings {
        record_fill_statuses: false,
        ..FillSettings::default()
    };
    let h = harness_with(jane_doe_browser("Thank you"), MemoryImageStore::new(), settings);

    h.filler
        .fill_out_form(&jane_doe_profile(), FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert!(h.sink.outcomes().is_empty());
}

#[tokio::test]
async fn campaign_tag_is_carried_to_the_outcome() {
    let h = harness(jane_doe_browser("Thank you"));

    let report = h
        .filler
        .fill_out_form(
            &jane_doe_profile(),
            FillRequest::new(jane()).with_campaign_tag("bill-x"),
            &ScriptedSolver::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.outcome.campaign_tag.as_deref(), Some("bill-x"));
}

#[tokio::test]
async fn session_open_failure_is_returned_to_caller() {
    let sessions = FixtureSessions::failing("webdriver unavailable");
    let filler = FormFiller::new(Arc::new(sessions), Arc::new(MemoryImageStore::new()));

    let err = filler
        .fill_out_form(&jane_doe_profile(), FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FaultKind::Browser);
}

#[tokio::test]
async fn choose_and_check_steps_drive_inputs() {
    let browser = FixtureBrowser::new().with_page(
        FORM,
        FixturePage::new("Contact")
            .node(FixtureNode::new("#newsletter"))
            .node(FixtureNode::new("input[name=\"topic\"]"))
            .node(FixtureNode::new("input[name=\"topic\"][value=\"Health\"]")),
    );
    let profile = LegislatorProfile::senator("S000148", "NY", 3)
        .with_steps(vec![
            ActionStep::new(1, 0, ActionKind::Visit).with_value(FORM),
            ActionStep::new(2, 1, ActionKind::Uncheck).with_selector("#newsletter"),
            ActionStep::new(3, 2, ActionKind::Choose)
                .with_selector("input[name=\"topic\"]")
                .with_value("$TOPIC")
                .with_options(StepOptions {
                    choices: Some(congress_forms_core::Choices::List(vec![
                        "Health".to_string(),
                        "Energy".to_string(),
                    ])),
                    ..StepOptions::default()
                }),
        ])
        .with_success_criteria(SuccessCriteria::body_contains("Contact"));
    let h = harness(browser);

    h.filler
        .fill_out_form(
            &profile,
            FillRequest::new(FieldMap::new().with("$TOPIC", "Health")),
            &ScriptedSolver::default(),
        )
        .await
        .unwrap();

    let events = h.browser.events();
    assert!(events.contains(&BrowserEvent::SetChecked {
        element: "#newsletter".to_string(),
        checked: false,
    }));
    assert!(events.contains(&BrowserEvent::SetChecked {
        element: "input[name=\"topic\"][value=\"Health\"]".to_string(),
        checked: true,
    }));
}

// ---------------------------------------------------------------------------
// Individual step kinds
// ---------------------------------------------------------------------------

/// Profile that visits the contact form, runs `steps`, and succeeds when the
/// page still reads "Contact".
fn steps_profile(steps: Vec<ActionStep>) -> LegislatorProfile {
    let mut all = vec![ActionStep::new(1, 0, ActionKind::Visit).with_value(FORM)];
    all.extend(steps);
    LegislatorProfile::senator("S000148", "NY", 3)
        .with_steps(all)
        .with_success_criteria(SuccessCriteria::body_contains("Contact"))
}

fn form_with(nodes: Vec<FixtureNode>) -> FixtureBrowser {
    let page = nodes
        .into_iter()
        .fold(FixturePage::new("Contact Senator Smith"), FixturePage::node);
    FixtureBrowser::new().with_page(FORM, page)
}

#[tokio::test(start_paused = true)]
async fn wait_steps_sleep_whole_seconds() {
    let h = harness(form_with(vec![]));
    let profile = steps_profile(vec![
        ActionStep::new(2, 1, ActionKind::Wait).with_value("3"),
        ActionStep::new(3, 2, ActionKind::Wait).with_value("1.5"),
    ]);

    let started = tokio::time::Instant::now();
    let report = h
        .filler
        .fill_out_form(&profile, FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();
    let slept = started.elapsed();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert!(slept >= Duration::from_secs(4), "slept {slept:?}");
    assert!(slept < Duration::from_secs(5), "slept {slept:?}");
}

#[tokio::test]
async fn javascript_step_evaluates_its_script() {
    let script = "document.querySelector('#opt-in').click();";
    let h = harness(form_with(vec![]));
    let profile = steps_profile(vec![ActionStep::new(2, 1, ActionKind::Javascript).with_value(script)]);

    let report = h
        .filler
        .fill_out_form(&profile, FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert!(h.browser.events().contains(&BrowserEvent::Evaluate(script.to_string())));
}

#[tokio::test]
async fn check_step_ticks_the_box() {
    let h = harness(form_with(vec![FixtureNode::new("#newsletter")]));
    let profile = steps_profile(vec![ActionStep::new(2, 1, ActionKind::Check).with_selector("#newsletter")]);

    let report = h
        .filler
        .fill_out_form(&profile, FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert!(h.browser.events().contains(&BrowserEvent::SetChecked {
        element: "#newsletter".to_string(),
        checked: true,
    }));
}

#[tokio::test]
async fn choose_without_choices_sets_the_selector_itself() {
    let h = harness(form_with(vec![FixtureNode::new("#agree")]));
    let profile = steps_profile(vec![ActionStep::new(2, 1, ActionKind::Choose).with_selector("#agree")]);

    let report = h
        .filler
        .fill_out_form(&profile, FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert!(h.browser.events().contains(&BrowserEvent::SetChecked {
        element: "#agree".to_string(),
        checked: true,
    }));
}

#[tokio::test]
async fn find_with_matching_pattern_passes() {
    let h = harness(form_with(vec![FixtureNode::new(".banner").with_text("Contact form is open")]));
    let profile = steps_profile(vec![
        ActionStep::new(2, 1, ActionKind::Find)
            .with_selector(".banner")
            .with_value("^Contact form"),
    ]);

    let report = h
        .filler
        .fill_out_form(&profile, FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Success);
}

#[tokio::test]
async fn find_with_unmatched_pattern_is_a_lookup_error() {
    let h = harness(form_with(vec![FixtureNode::new(".banner").with_text("Contact form is open")]));
    let profile = steps_profile(vec![
        ActionStep::new(2, 1, ActionKind::Find)
            .with_selector(".banner")
            .with_value("^Form closed"),
    ]);

    let report = h
        .filler
        .fill_out_form(&profile, FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Error);
    assert_eq!(report.outcome.extra.fault_kind, Some(FaultKind::Lookup));
    assert!(report.outcome.extra.fault.as_deref().unwrap().contains("^Form closed"));
}

#[tokio::test]
async fn find_without_wait_option_uses_default_wait() {
    let profile = steps_profile(vec![ActionStep::new(2, 1, ActionKind::Find).with_selector(".banner")]);

    let h = harness(form_with(vec![FixtureNode::new(".banner")]));
    h.filler
        .fill_out_form(&profile, FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();
    assert_eq!(h.browser.last_find_wait(), Some(Duration::from_secs(5)));

    let settings = FillSettings {
        default_find_wait: Duration::from_secs(9),
        ..FillSettings::default()
    };
    let h = harness_with(form_with(vec![FixtureNode::new(".banner")]), MemoryImageStore::new(), settings);
    let report = h
        .filler
        .fill_out_form(&profile, FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();
    assert_eq!(report.outcome.status, OutcomeStatus::Success);
    assert_eq!(h.browser.last_find_wait(), Some(Duration::from_secs(9)));
}

#[tokio::test]
async fn failure_screenshot_covers_the_whole_page() {
    let browser = jane_doe_browser("An error occurred")
        .with_script_result("scrollHeight", json!([1024, 3000, 1024, 768]));
    let h = harness(browser);

    let report = h
        .filler
        .fill_out_form(&jane_doe_profile(), FillRequest::new(jane()), &ScriptedSolver::default())
        .await
        .unwrap();

    assert_eq!(report.outcome.status, OutcomeStatus::Failure);
    let events = h.browser.events();
    let position = |wanted: &BrowserEvent| events.iter().position(|e| e == wanted).unwrap();
    let grown = position(&BrowserEvent::Resize {
        width: 1024,
        height: 3000,
    });
    let shot = position(&BrowserEvent::Screenshot);
    let restored = position(&BrowserEvent::Resize {
        width: 1024,
        height: 768,
    });
    assert!(grown < shot && shot < restored);
    assert_eq!(h.browser.current_window_size(), (1024, 768));
}

#[tokio::test]
async fn rejected_session_is_handed_back_open() {
    let h = harness(jane_doe_browser("Thank you"));
    let session = h.sessions.open(&SessionRequest::default()).await.unwrap();

    let rejected = h
        .filler
        .begin_with_session(
            &jane_doe_profile(),
            FillRequest::new(jane()).starting_at(99).persist_session(),
            session,
        )
        .unwrap_err();

    assert!(matches!(rejected.error, FillError::InvalidStep { step_id: 99, .. }));
    assert!(!h.browser.has_quit());

    let run = h
        .filler
        .begin_with_session(&jane_doe_profile(), FillRequest::new(jane()), rejected.session)
        .unwrap();
    let RunState::Finished(report) = run.advance().await else {
        panic!("expected the run to finish");
    };
    assert_eq!(report.outcome.status, OutcomeStatus::Success);
}
