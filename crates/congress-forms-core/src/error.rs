//! Error types for form filling, office codes and CWC delivery.

use congress_forms_browser::DriverError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Faults raised while executing a profile's script.
///
/// `ElementNotFound` and `Ambiguous` together form the lookup class, the only
/// faults a DEPENDENT select step may swallow.
#[derive(Debug, Error)]
pub enum FillError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Ambiguous match, found {count} elements matching {selector}")]
    Ambiguous { selector: String, count: usize },

    #[error("Unsupported challenge on {0}'s form: recaptcha cannot be automated")]
    UnsupportedChallenge(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Missing required field {field} for step {step_id}")]
    MissingField { field: String, step_id: u64 },

    #[error("Invalid step {step_id}: {reason}")]
    InvalidStep { step_id: u64, reason: String },

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FillError {
    pub fn kind(&self) -> FaultKind {
        match self {
            FillError::ElementNotFound(_) | FillError::Ambiguous { .. } => FaultKind::Lookup,
            FillError::UnsupportedChallenge(_) => FaultKind::UnsupportedChallenge,
            FillError::Navigation(_) => FaultKind::Navigation,
            FillError::Script(_) => FaultKind::Script,
            FillError::Capture(_) => FaultKind::Capture,
            FillError::MissingField { .. } => FaultKind::MissingField,
            FillError::InvalidStep { .. } | FillError::InvalidProfile(_) => FaultKind::InvalidStep,
            FillError::Browser(_) => FaultKind::Browser,
            FillError::Io(_) => FaultKind::Io,
        }
    }

    pub fn is_lookup(&self) -> bool {
        self.kind() == FaultKind::Lookup
    }

    pub(crate) fn invalid_step(step_id: u64, reason: impl Into<String>) -> Self {
        FillError::InvalidStep {
            step_id,
            reason: reason.into(),
        }
    }
}

impl From<DriverError> for FillError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotFound(selector) => FillError::ElementNotFound(selector),
            DriverError::Ambiguous { selector, count } => FillError::Ambiguous { selector, count },
            DriverError::Navigation(msg) => FillError::Navigation(msg),
            DriverError::Script(msg) => FillError::Script(msg),
            DriverError::Session(msg) => FillError::Browser(msg),
            DriverError::Io(e) => FillError::Io(e),
        }
    }
}

/// Coarse fault classification stored on error outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Lookup,
    UnsupportedChallenge,
    Navigation,
    Script,
    Capture,
    MissingField,
    InvalidStep,
    Browser,
    Io,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Lookup => "lookup",
            FaultKind::UnsupportedChallenge => "unsupported_challenge",
            FaultKind::Navigation => "navigation",
            FaultKind::Script => "script",
            FaultKind::Capture => "capture",
            FaultKind::MissingField => "missing_field",
            FaultKind::InvalidStep => "invalid_step",
            FaultKind::Browser => "browser",
            FaultKind::Io => "io",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Office codes that can't be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OfficeCodeError {
    #[error("Malformed office code {code:?}: {reason}")]
    Malformed { code: String, reason: String },
}

impl OfficeCodeError {
    pub(crate) fn malformed(code: &str, reason: impl Into<String>) -> Self {
        OfficeCodeError::Malformed {
            code: code.to_string(),
            reason: reason.into(),
        }
    }
}

/// Faults on the structured (CWC) delivery path.
#[derive(Debug, Error)]
pub enum CwcError {
    #[error("CWC API rejected the message (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("CWC HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid CWC response: {0}")]
    InvalidResponse(String),

    #[error("CWC client is not configured: {0}")]
    NotConfigured(String),
}

pub type FillResult<T> = std::result::Result<T, FillError>;
