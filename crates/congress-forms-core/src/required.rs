//! Fields a caller must supply before filling a form.

use crate::models::{Choices, LegislatorProfile};
use serde::{Deserialize, Serialize};

pub const NAME_PREFIXES: &[&str] = &[
    "Mr.",
    "Mrs.",
    "Ms.",
    "Mr. and Mrs.",
    "Miss",
    "Dr.",
    "Dr. and Mrs.",
    "Dr. and Mr.",
    "Admiral",
    "Captain",
    "Chief Master Sergeant",
    "Colonel",
    "Commander",
    "Corporal",
    "Father",
    "Lieutenant",
    "Lieutenant Colonel",
    "Master Sergeant",
    "Reverend",
    "Sergeant",
    "Second Lieutenant",
    "Sergeant Major",
    "Sister",
    "Technical Sergeant",
];

pub const STATE_ABBREVIATIONS: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM",
    "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY",
];

/// Library of Congress legislative policy areas.
pub const LIBRARY_OF_CONGRESS_TOPICS: &[&str] = &[
    "Agriculture and Food",
    "Animals",
    "Armed Forces and National Security",
    "Arts, Culture, Religion",
    "Civil Rights and Liberties, Minority Issues",
    "Commerce",
    "Congress",
    "Crime and Law Enforcement",
    "Economics and Public Finance",
    "Education",
    "Emergency Management",
    "Energy",
    "Environmental Protection",
    "Families",
    "Finance and Financial Sector",
    "Foreign Trade and International Finance",
    "Government Operations and Politics",
    "Health",
    "Housing and Community Development",
    "Immigration",
    "International Affairs",
    "Labor and Employment",
    "Law",
    "Native Americans",
    "Public Lands and Natural Resources",
    "Science, Technology, Communications",
    "Social Sciences and History",
    "Social Welfare",
    "Sports and Recreation",
    "Taxation",
    "Transportation and Public Works",
    "Water Resources Development",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredField {
    /// Placeholder, e.g. `$NAME_FIRST`.
    pub value: String,
    pub max_length: Option<usize>,
    /// Accepted values when the form restricts them.
    pub options: Option<Choices>,
}

impl RequiredField {
    fn free(value: &str) -> Self {
        Self {
            value: value.to_string(),
            max_length: None,
            options: None,
        }
    }

    fn one_of(value: &str, options: &[&str]) -> Self {
        Self {
            value: value.to_string(),
            max_length: None,
            options: Some(Choices::List(options.iter().map(|s| s.to_string()).collect())),
        }
    }
}

/// Placeholders the profile's required steps consume, in execution order.
/// A placeholder used by several steps is listed once.
pub fn required_fields(profile: &LegislatorProfile) -> Vec<RequiredField> {
    let mut fields: Vec<RequiredField> = Vec::new();
    for step in profile.required_steps() {
        let Some(value) = step.placeholder() else {
            continue;
        };
        if fields.iter().any(|f| f.value == value) {
            continue;
        }
        fields.push(RequiredField {
            value: value.to_string(),
            max_length: step.options.max_length,
            options: step.options.choices.clone(),
        });
    }
    fields
}

/// Fields the CWC delivery path needs regardless of office.
pub fn cwc_required_fields() -> Vec<RequiredField> {
    vec![
        RequiredField::one_of("$NAME_PREFIX", NAME_PREFIXES),
        RequiredField::free("$NAME_FIRST"),
        RequiredField::free("$NAME_LAST"),
        RequiredField::free("$ADDRESS_STREET"),
        RequiredField::free("$ADDRESS_CITY"),
        RequiredField::free("$ADDRESS_ZIP5"),
        RequiredField::free("$EMAIL"),
        RequiredField::free("$SUBJECT"),
        RequiredField::free("$MESSAGE"),
        RequiredField::one_of("$ADDRESS_STATE_POSTAL_ABBREV", STATE_ABBREVIATIONS),
        RequiredField::one_of("$TOPIC", LIBRARY_OF_CONGRESS_TOPICS),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionKind, ActionStep, StepOptions};

    #[test]
    fn required_fields_follow_step_order_without_duplicates() {
        let profile = LegislatorProfile::senator("S000148", "NY", 3).with_steps(vec![
            ActionStep::new(2, 1, ActionKind::FillIn)
                .with_selector("#email")
                .with_value("$EMAIL")
                .required(),
            ActionStep::new(1, 0, ActionKind::FillIn)
                .with_selector("#msg")
                .with_value("$MESSAGE")
                .with_options(StepOptions {
                    max_length: Some(500),
                    ..StepOptions::default()
                })
                .required(),
            ActionStep::new(3, 2, ActionKind::FillIn)
                .with_selector("#confirm")
                .with_value("$EMAIL")
                .required(),
            ActionStep::new(4, 3, ActionKind::FillIn)
                .with_selector("#phone")
                .with_value("$PHONE"),
        ]);

        let fields = required_fields(&profile);
        let names: Vec<&str> = fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(names, vec!["$MESSAGE", "$EMAIL"]);
        assert_eq!(fields[0].max_length, Some(500));
    }

    #[test]
    fn cwc_fields_carry_fixed_lists() {
        let fields = cwc_required_fields();
        let state = fields
            .iter()
            .find(|f| f.value == "$ADDRESS_STATE_POSTAL_ABBREV")
            .unwrap();
        assert!(matches!(&state.options, Some(Choices::List(list)) if list.len() == 51));
        assert_eq!(NAME_PREFIXES.len(), 24);
        assert_eq!(LIBRARY_OF_CONGRESS_TOPICS.len(), 32);
    }
}
