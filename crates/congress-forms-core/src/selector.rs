//! Option lookup for `select` steps.
//!
//! Options are matched by their `value` attribute first and by label text
//! second. Label matches are anchored at the start and must be followed by a
//! non-word character or the end of the label, so `Cali` never selects
//! `California`.

use congress_forms_browser::{BrowserDriver, DriverError, DriverResult, ElementRef, FindQuery, quote_attr};
use regex::Regex;
use tracing::debug;

pub fn value_query(scope: &ElementRef, target: &str) -> FindQuery {
    FindQuery::css(format!("option[value=\"{}\"]", quote_attr(target))).within(scope)
}

pub fn label_pattern(target: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"^{}(\W|$)", regex::escape(target)))
}

/// Label lookup. A target too large to compile into a pattern can't match
/// any option, so it reports not-found.
pub fn label_query(scope: &ElementRef, target: &str) -> DriverResult<FindQuery> {
    let pattern =
        label_pattern(target).map_err(|e| DriverError::NotFound(format!("option labelled {target:?}: {e}")))?;
    Ok(FindQuery::css("option").within(scope).matching_text(pattern))
}

/// Find exactly one element for `query`, settling ambiguity on the first match.
async fn find_or_first(driver: &dyn BrowserDriver, query: &FindQuery) -> DriverResult<ElementRef> {
    match driver.find(query).await {
        Err(DriverError::Ambiguous { count, .. }) => {
            debug!(selector = %query.describe(), count, "Ambiguous option, taking first");
            driver.first(query).await
        }
        other => other,
    }
}

/// Resolve the option for `target` inside `scope`.
pub async fn resolve_option(
    driver: &dyn BrowserDriver,
    scope: &ElementRef,
    target: &str,
) -> DriverResult<ElementRef> {
    match find_or_first(driver, &value_query(scope, target)).await {
        Err(DriverError::NotFound(_)) => {
            debug!(target, "No option with that value, matching label text");
            find_or_first(driver, &label_query(scope, target)?).await
        }
        other => other,
    }
}
