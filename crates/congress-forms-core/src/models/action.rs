//! Action steps: one recorded interaction with a contact form.

use crate::error::{FillError, FillResult};
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix marking a step value as a reference into the caller's field map.
pub const PLACEHOLDER_PREFIX: char = '$';

/// Placeholder that triggers captcha capture instead of a field lookup.
pub const CAPTCHA_SOLUTION: &str = "$CAPTCHA_SOLUTION";

/// Sentinel accepted in place of an options map.
pub const DEPENDENT: &str = "DEPENDENT";

/// Placeholders that mean "no selection" when the caller didn't supply them.
///
/// A select step whose value is one of these, and which has no field value,
/// does nothing instead of looking for an option literally named after the
/// placeholder.
pub const PLACEHOLDER_VALUES: &[&str] = &[
    "$NAME_PREFIX",
    "$NAME_FIRST",
    "$NAME_LAST",
    "$NAME_FULL",
    "$ADDRESS_STREET",
    "$ADDRESS_STREET_2",
    "$ADDRESS_CITY",
    "$ADDRESS_COUNTY",
    "$ADDRESS_STATE",
    "$ADDRESS_STATE_POSTAL_ABBREV",
    "$ADDRESS_STATE_FULL",
    "$ADDRESS_ZIP5",
    "$ADDRESS_ZIP4",
    "$ADDRESS_ZIP_PLUS_4",
    "$EMAIL",
    "$PHONE",
    "$PHONE_PARENTHESES",
    "$SUBJECT",
    "$MESSAGE",
    "$STATEMENT",
    "$TOPIC",
    "$CAMPAIGN_UUID",
    "$ORG_URL",
    "$ORG_NAME",
];

pub fn is_placeholder(value: &str) -> bool {
    value.starts_with(PLACEHOLDER_PREFIX)
}

/// Closed instruction set understood by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Visit,
    Wait,
    FillIn,
    Select,
    ClickOn,
    Find,
    Check,
    Uncheck,
    Choose,
    Javascript,
    Recaptcha,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Visit => "visit",
            ActionKind::Wait => "wait",
            ActionKind::FillIn => "fill_in",
            ActionKind::Select => "select",
            ActionKind::ClickOn => "click_on",
            ActionKind::Find => "find",
            ActionKind::Check => "check",
            ActionKind::Uncheck => "uncheck",
            ActionKind::Choose => "choose",
            ActionKind::Javascript => "javascript",
            ActionKind::Recaptcha => "recaptcha",
        }
    }

    fn needs_selector(&self) -> bool {
        matches!(
            self,
            ActionKind::FillIn
                | ActionKind::Select
                | ActionKind::ClickOn
                | ActionKind::Find
                | ActionKind::Check
                | ActionKind::Uncheck
                | ActionKind::Choose
        )
    }

    fn needs_value(&self) -> bool {
        matches!(
            self,
            ActionKind::Visit | ActionKind::Wait | ActionKind::Select | ActionKind::Javascript
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed values for a `choose` or `select` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choices {
    List(Vec<String>),
    /// label -> submitted value
    Map(BTreeMap<String, String>),
}

/// Per-step configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Seconds a `find` step waits for its element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dependent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Choices>,
}

impl StepOptions {
    pub fn dependent() -> Self {
        Self {
            dependent: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOptions {
    Sentinel(String),
    Map(OptionsMap),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionsMap {
    #[serde(default)]
    max_length: Option<usize>,
    #[serde(default)]
    wait: Option<u64>,
    #[serde(default)]
    dependent: Option<bool>,
    #[serde(default)]
    choices: Option<Choices>,
}

impl<'de> Deserialize<'de> for StepOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<RawOptions>::deserialize(deserializer)? {
            None => Ok(StepOptions::default()),
            Some(RawOptions::Sentinel(s)) if s == DEPENDENT => Ok(StepOptions::dependent()),
            Some(RawOptions::Sentinel(s)) => Err(de::Error::custom(format!(
                "unknown step option {s:?}, expected {DEPENDENT:?} or a map"
            ))),
            Some(RawOptions::Map(map)) => Ok(StepOptions {
                max_length: map.max_length,
                wait: map.wait,
                dependent: map.dependent.unwrap_or(false),
                choices: map.choices,
            }),
        }
    }
}

/// One instruction in a legislator's script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    /// Identity within the profile; resumption points refer to it.
    pub id: u64,
    /// Ordering index. Ties are broken by `id`.
    pub step: u32,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "StepOptions::is_empty")]
    pub options: StepOptions,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_selector: Option<String>,
}

impl ActionStep {
    pub fn new(id: u64, step: u32, action: ActionKind) -> Self {
        Self {
            id,
            step,
            action,
            selector: None,
            value: None,
            options: StepOptions::default(),
            required: false,
            captcha_selector: None,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_options(mut self, options: StepOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_captcha_selector(mut self, selector: impl Into<String>) -> Self {
        self.captcha_selector = Some(selector.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value if it is a `$` placeholder.
    pub fn placeholder(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| is_placeholder(v))
    }

    pub fn is_captcha(&self) -> bool {
        self.action == ActionKind::FillIn && self.value.as_deref() == Some(CAPTCHA_SOLUTION)
    }

    pub fn selector_or_err(&self) -> FillResult<&str> {
        self.selector
            .as_deref()
            .ok_or_else(|| FillError::invalid_step(self.id, format!("{} needs a selector", self.action)))
    }

    pub fn value_or_err(&self) -> FillResult<&str> {
        self.value
            .as_deref()
            .ok_or_else(|| FillError::invalid_step(self.id, format!("{} needs a value", self.action)))
    }

    /// Seconds a `wait` step sleeps: the leading whole number of its value,
    /// so `"1.5"` waits one second.
    pub fn wait_secs(&self) -> FillResult<u64> {
        let value = self.value_or_err()?;
        let trimmed = value.trim();
        let digits = &trimmed[..trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len())];
        digits.parse().map_err(|_| {
            FillError::invalid_step(
                self.id,
                format!("wait value {value:?} must start with a whole number of seconds"),
            )
        })
    }

    /// Structural checks that don't depend on the page or the field map.
    pub fn validate(&self) -> FillResult<()> {
        if self.action.needs_selector() {
            self.selector_or_err()?;
        }
        if self.action.needs_value() {
            self.value_or_err()?;
        }

        match self.action {
            ActionKind::Wait => {
                self.wait_secs()?;
            }
            ActionKind::Find => {
                if let Some(pattern) = &self.value {
                    Regex::new(pattern).map_err(|e| {
                        FillError::invalid_step(self.id, format!("find pattern is not a valid regex: {e}"))
                    })?;
                }
            }
            ActionKind::Choose => {
                if self.options.choices.is_some() && self.placeholder().is_none() {
                    return Err(FillError::invalid_step(
                        self.id,
                        "choose with choices needs a placeholder value",
                    ));
                }
            }
            _ => {}
        }

        if self.options.max_length == Some(0) {
            return Err(FillError::invalid_step(self.id, "max_length must be positive"));
        }
        Ok(())
    }

    /// Transcript form, e.g. `fill_in("#first", "$NAME_FIRST")`.
    pub fn describe(&self) -> String {
        let mut args = Vec::new();
        if let Some(selector) = &self.selector {
            args.push(format!("{selector:?}"));
        }
        if let Some(value) = &self.value {
            args.push(format!("{value:?}"));
        }
        format!("{}({})", self.action, args.join(", "))
    }
}
