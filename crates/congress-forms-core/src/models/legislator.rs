use super::action::{ActionKind, ActionStep, CAPTCHA_SOLUTION, StepOptions};
use super::criteria::SuccessCriteria;
use crate::error::{FillError, FillResult};
use crate::office::OfficeCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chamber {
    House,
    Senate,
}

impl Chamber {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::House => "house",
            Chamber::Senate => "senate",
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One legislator's contact form script and success criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegislatorProfile {
    pub id: String,
    pub bioguide_id: String,
    #[serde(default)]
    pub chamber: Option<Chamber>,
    pub state: String,
    #[serde(default)]
    pub senate_class: Option<u8>,
    #[serde(default)]
    pub house_district: Option<u8>,
    #[serde(default)]
    pub steps: Vec<ActionStep>,
    #[serde(default)]
    pub success_criteria: SuccessCriteria,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl LegislatorProfile {
    pub fn new(bioguide_id: impl Into<String>, state: impl Into<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            bioguide_id: bioguide_id.into(),
            chamber: None,
            state: state.into(),
            senate_class: None,
            house_district: None,
            steps: Vec::new(),
            success_criteria: SuccessCriteria::default(),
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    pub fn senator(bioguide_id: impl Into<String>, state: impl Into<String>, class: u8) -> Self {
        let mut profile = Self::new(bioguide_id, state);
        profile.chamber = Some(Chamber::Senate);
        profile.senate_class = Some(class);
        profile
    }

    pub fn representative(
        bioguide_id: impl Into<String>,
        state: impl Into<String>,
        district: u8,
    ) -> Self {
        let mut profile = Self::new(bioguide_id, state);
        profile.chamber = Some(Chamber::House);
        profile.house_district = Some(district);
        profile
    }

    pub fn with_steps(mut self, steps: Vec<ActionStep>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_success_criteria(mut self, criteria: SuccessCriteria) -> Self {
        self.success_criteria = criteria;
        self
    }

    /// Steps in execution order: by `step`, then by `id`.
    pub fn ordered_steps(&self) -> Vec<&ActionStep> {
        let mut steps: Vec<&ActionStep> = self.steps.iter().collect();
        steps.sort_by_key(|s| (s.step, s.id));
        steps
    }

    /// Required steps whose value must come from the caller.
    pub fn required_steps(&self) -> Vec<&ActionStep> {
        self.ordered_steps()
            .into_iter()
            .filter(|s| s.required && s.placeholder().is_some())
            .collect()
    }

    pub fn has_captcha(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.value.as_deref() == Some(CAPTCHA_SOLUTION))
    }

    pub fn has_google_recaptcha(&self) -> bool {
        self.steps.iter().any(|s| s.action == ActionKind::Recaptcha)
    }

    pub fn office_code(&self) -> Option<OfficeCode> {
        OfficeCode::for_profile(self)
    }

    pub fn validate(&self) -> FillResult<()> {
        if self.bioguide_id.trim().is_empty() {
            return Err(FillError::InvalidProfile("bioguide_id is required".to_string()));
        }
        if self.state.len() != 2 || !self.state.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(FillError::InvalidProfile(format!(
                "{}: state {:?} is not a two-letter postal code",
                self.bioguide_id, self.state
            )));
        }
        if let Some(class) = self.senate_class
            && !(1..=3).contains(&class)
        {
            return Err(FillError::InvalidProfile(format!(
                "{}: senate class {class} is outside 1..=3",
                self.bioguide_id
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id) {
                return Err(FillError::InvalidProfile(format!(
                    "{}: duplicate step id {}",
                    self.bioguide_id, step.id
                )));
            }
            step.validate()?;
        }
        Ok(())
    }
}

/// Profile document as written by hand or exported from the form database.
///
/// Step `id`s and `step` indexes may be omitted; they default to the
/// position in the list.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDocument {
    pub bioguide_id: String,
    #[serde(default)]
    pub chamber: Option<Chamber>,
    pub state: String,
    #[serde(default)]
    pub senate_class: Option<u8>,
    #[serde(default)]
    pub house_district: Option<u8>,
    #[serde(default)]
    pub steps: Vec<StepDocument>,
    #[serde(default)]
    pub success_criteria: SuccessCriteria,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDocument {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub step: Option<u32>,
    pub action: ActionKind,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub options: StepOptions,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub captcha_selector: Option<String>,
}

impl ProfileDocument {
    pub fn from_yaml(source: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Build a validated profile, assigning missing step ids in insertion order.
    pub fn into_profile(self) -> FillResult<LegislatorProfile> {
        let mut next_id = self.steps.iter().filter_map(|s| s.id).max().unwrap_or(0) + 1;
        let steps = self
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, doc)| {
                let id = doc.id.unwrap_or_else(|| {
                    let id = next_id;
                    next_id += 1;
                    id
                });
                ActionStep {
                    id,
                    step: doc.step.unwrap_or(index as u32),
                    action: doc.action,
                    selector: doc.selector,
                    value: doc.value,
                    options: doc.options,
                    required: doc.required,
                    captcha_selector: doc.captcha_selector,
                }
            })
            .collect();

        let mut profile = LegislatorProfile::new(self.bioguide_id, self.state);
        profile.chamber = self.chamber;
        profile.senate_class = self.senate_class;
        profile.house_district = self.house_district;
        profile.steps = steps;
        profile.success_criteria = self.success_criteria;
        profile.validate()?;
        Ok(profile)
    }
}
