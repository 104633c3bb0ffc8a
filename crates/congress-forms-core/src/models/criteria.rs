//! Success criteria attached to a legislator profile.

use serde::{Deserialize, Serialize};

/// Declarative description of what a successful submission page looks like.
///
/// All assertions must hold. A document with no assertions passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuccessCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderCriteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyCriteria>,
}

/// Parsed for compatibility but not evaluated; the driver doesn't expose
/// response status codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<OneOrMany>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            OneOrMany::One(s) => std::slice::from_ref(s),
            OneOrMany::Many(v) => v.as_slice(),
        };
        items.iter().map(String::as_str)
    }
}

impl SuccessCriteria {
    /// Page must contain `needle` in its body text.
    pub fn body_contains(needle: impl Into<String>) -> Self {
        Self {
            headers: None,
            body: Some(BodyCriteria {
                contains: Some(OneOrMany::One(needle.into())),
            }),
        }
    }

    pub fn check_success(&self, body_text: &str) -> bool {
        let Some(contains) = self.body.as_ref().and_then(|b| b.contains.as_ref()) else {
            return true;
        };
        contains.iter().all(|needle| body_text.contains(needle))
    }
}
