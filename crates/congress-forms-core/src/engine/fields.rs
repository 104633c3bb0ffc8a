use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

const FINGERPRINT_BYTES: usize = 6;

/// Caller-supplied values keyed by placeholder, e.g. `$NAME_FIRST`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(HashMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short stable digest identifying one fill of one legislator in logs.
    pub fn fingerprint(&self, bioguide_id: &str) -> String {
        let sorted: BTreeMap<&String, &String> = self.0.iter().collect();
        let mut hasher = Sha256::new();
        hasher.update(bioguide_id.as_bytes());
        for (key, value) in sorted {
            hasher.update([0u8]);
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
        }
        hex::encode(&hasher.finalize()[..FINGERPRINT_BYTES])
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Cut `value` to 95% of `max_length` characters and expand tabs.
pub fn prepare_value(value: &str, max_length: Option<usize>) -> String {
    let truncated: String = match max_length {
        Some(max) => {
            let limit = max.saturating_mul(95) / 100;
            value.chars().take(limit).collect()
        }
        None => value.to_string(),
    };
    truncated.replace('\t', "    ")
}

/// Transcript of one fill, mirrored to the tracing log as it grows.
#[derive(Debug, Clone)]
pub struct FillLog {
    bioguide_id: String,
    fingerprint: String,
    lines: Vec<String>,
}

impl FillLog {
    pub fn new(bioguide_id: &str, fields: &FieldMap) -> Self {
        Self {
            bioguide_id: bioguide_id.to_string(),
            fingerprint: fields.fingerprint(bioguide_id),
            lines: Vec::new(),
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(
            bioguide_id = %self.bioguide_id,
            fill = %self.fingerprint,
            "{message}"
        );
        self.lines.push(message);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}
