//! Fill outcomes: the immutable record of one fill or delivery attempt.

use crate::error::{FaultKind, FillError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

const BADGE_BASE_URL: &str = "https://img.shields.io/badge/";
const BADGE_EXT: &str = ".svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failure => "failure",
            OutcomeStatus::Error => "error",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics attached to an outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_kind: Option<FaultKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fill_log: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillOutcome {
    pub id: String,
    pub bioguide_id: String,
    pub status: OutcomeStatus,
    #[serde(default)]
    pub extra: FillExtra,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_tag: Option<String>,
    pub created_at_ms: i64,
}

impl FillOutcome {
    fn new(
        bioguide_id: &str,
        status: OutcomeStatus,
        extra: FillExtra,
        campaign_tag: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            bioguide_id: bioguide_id.to_string(),
            status,
            extra,
            campaign_tag,
            created_at_ms: Utc::now().timestamp_millis(),
        }
    }

    pub fn success(bioguide_id: &str, campaign_tag: Option<String>) -> Self {
        Self::new(bioguide_id, OutcomeStatus::Success, FillExtra::default(), campaign_tag)
    }

    /// Script completed but the page didn't confirm submission.
    pub fn failure(
        bioguide_id: &str,
        campaign_tag: Option<String>,
        screenshot: Option<String>,
        fill_log: Vec<String>,
    ) -> Self {
        let extra = FillExtra {
            screenshot,
            fill_log,
            ..FillExtra::default()
        };
        Self::new(bioguide_id, OutcomeStatus::Failure, extra, campaign_tag)
    }

    /// Script broke down while executing.
    pub fn error(
        bioguide_id: &str,
        campaign_tag: Option<String>,
        fault: &FillError,
        screenshot: Option<String>,
        fill_log: Vec<String>,
    ) -> Self {
        let extra = FillExtra {
            screenshot,
            fault: Some(fault.to_string()),
            fault_kind: Some(fault.kind()),
            fill_log,
        };
        Self::new(bioguide_id, OutcomeStatus::Error, extra, campaign_tag)
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Outcome counts since a profile was last updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFillStatus {
    pub successes: usize,
    pub errors: usize,
    pub failures: usize,
}

impl RecentFillStatus {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a FillOutcome>) -> Self {
        let mut status = Self::default();
        for outcome in outcomes {
            match outcome.status {
                OutcomeStatus::Success => status.successes += 1,
                OutcomeStatus::Error => status.errors += 1,
                OutcomeStatus::Failure => status.failures += 1,
            }
        }
        status
    }

    pub fn total(&self) -> usize {
        self.successes + self.errors + self.failures
    }

    /// Success rate as a whole percentage, `None` when nothing was recorded.
    pub fn success_rate(&self) -> Option<u32> {
        let total = self.total();
        (total > 0).then(|| ((self.successes * 100) / total) as u32)
    }

    /// Status badge image for dashboards.
    pub fn badge_url(&self) -> String {
        let (label, color) = match self.success_rate() {
            None => ("unknown".to_string(), "lightgrey"),
            Some(rate) => {
                let color = match rate {
                    90.. => "brightgreen",
                    60..=89 => "yellow",
                    _ => "red",
                };
                (format!("{rate}%25"), color)
            }
        };
        format!("{BADGE_BASE_URL}success-{label}-{color}{BADGE_EXT}")
    }
}
