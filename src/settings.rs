//! Parsing of flat `key=value;key=value` command settings.

use std::collections::HashMap;

/// Settings key naming a single fixture file.
pub const FILE_KEY: &str = "file";

/// Settings key naming a fixture subdirectory.
pub const DIRECTORY_KEY: &str = "directory";

/// Key/value settings attached to a scheduled command.
pub type SettingsMap = HashMap<String, String>;

/// Parse a settings string into a map.
///
/// Entries are separated by `;` and split on the first `=`. An entry without
/// `=` maps to an empty value, empty entries are dropped and the last
/// occurrence of a duplicate key wins. There is no escaping.
pub fn parse(raw: &str) -> SettingsMap {
    if raw.trim().is_empty() {
        return SettingsMap::new();
    }

    raw.split(';')
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (entry.to_string(), String::new()),
        })
        .collect()
}
