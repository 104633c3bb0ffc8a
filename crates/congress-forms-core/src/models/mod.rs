pub mod action;
pub mod criteria;
pub mod legislator;
pub mod outcome;

pub use action::{
    ActionKind, ActionStep, CAPTCHA_SOLUTION, Choices, DEPENDENT, PLACEHOLDER_VALUES, StepOptions,
    is_placeholder,
};
pub use criteria::{BodyCriteria, HeaderCriteria, OneOrMany, SuccessCriteria};
pub use legislator::{Chamber, LegislatorProfile, ProfileDocument, StepDocument};
pub use outcome::{FillExtra, FillOutcome, OutcomeStatus, RecentFillStatus};
