//! `${key}` placeholder substitution for fixture contents.

use regex::{NoExpand, Regex};
use std::collections::HashMap;
use tracing::warn;

/// Replacement values keyed by placeholder name. `None` renders as `null`.
pub type Replacements = HashMap<String, Option<String>>;

/// Replace every `${key}` token in `text` with its mapped value.
///
/// Keys are applied longest first (ties broken alphabetically) so the result
/// does not depend on map iteration order. Tokens without a key are kept.
pub fn substitute(text: &str, replacements: &Replacements) -> String {
    let mut entries: Vec<_> = replacements.iter().collect();
    entries.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut result = text.to_string();
    for (key, value) in entries {
        let pattern = match Regex::new(&format!(r"\$\{{{}\}}", regex::escape(key))) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping placeholder that cannot be compiled");
                continue;
            }
        };
        let value = value.as_deref().unwrap_or("null");
        result = pattern.replace_all(&result, NoExpand(value)).into_owned();
    }
    result
}
