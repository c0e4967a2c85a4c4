//! Fixture resolution.
//!
//! Turns command settings into the ordered list of JSON fixture files to
//! upload, plus the placeholder replacements that apply to them.

use crate::error::ResolveError;
use crate::settings::{SettingsMap, DIRECTORY_KEY, FILE_KEY};
use crate::substitute::Replacements;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Where the fixtures of a command come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureSource {
    /// Nothing to do: no `file`/`directory` setting, or the named file is
    /// missing or not a regular `.json` file.
    None,
    /// A single named file, templated with the remaining settings.
    File,
    /// Every eligible file of a subdirectory, uploaded verbatim.
    Directory,
}

/// Outcome of resolving command settings against the fixtures root.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub source: FixtureSource,
    /// Files to upload, in upload order
    pub files: Vec<PathBuf>,
    /// Placeholder values; only present in file mode
    pub replacements: Option<Replacements>,
}

impl Resolution {
    fn empty() -> Self {
        Self {
            source: FixtureSource::None,
            files: Vec::new(),
            replacements: None,
        }
    }

    /// Directory mode replaces state, so existing entries are cleared first.
    pub fn delete_before_import(&self) -> bool {
        self.source == FixtureSource::Directory
    }
}

/// A fixture file with its UTF-8 content.
#[derive(Debug, Clone)]
pub struct FixtureFile {
    pub path: PathBuf,
    pub content: String,
}

/// Resolve which fixture files `settings` refers to below `root`.
pub fn resolve(root: &Path, settings: &SettingsMap) -> Result<Resolution, ResolveError> {
    if settings.contains_key(FILE_KEY) && settings.contains_key(DIRECTORY_KEY) {
        return Err(ResolveError::ConflictingFixtureSource);
    }

    if let Some(file) = settings.get(FILE_KEY) {
        let path = root.join(file);
        if !path.exists() {
            error!(file = %path.display(), "Fixture file does not exist");
            return Ok(Resolution::empty());
        }
        if !is_eligible(&path) {
            debug!(file = %path.display(), "Skipping fixture that is not a regular .json file");
            return Ok(Resolution::empty());
        }

        let replacements = settings
            .iter()
            .filter(|(key, _)| key.as_str() != FILE_KEY)
            .map(|(key, value)| (key.clone(), Some(value.clone())))
            .collect();

        return Ok(Resolution {
            source: FixtureSource::File,
            files: vec![path],
            replacements: Some(replacements),
        });
    }

    if let Some(directory) = settings.get(DIRECTORY_KEY) {
        let dir = root.join(directory);
        if !dir.exists() {
            return Err(ResolveError::DirectoryNotFound { path: dir });
        }
        return Ok(Resolution {
            source: FixtureSource::Directory,
            files: list_fixtures(&dir)?,
            replacements: None,
        });
    }

    Ok(Resolution::empty())
}

/// List the eligible fixtures of `dir`, sorted by file name. Not recursive.
pub fn list_fixtures(dir: &Path) -> Result<Vec<PathBuf>, ResolveError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ResolveError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .inspect(|path| info!(file = %path.display(), "Checking fixture"))
        .filter(|path| is_eligible(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Regular file with a `.json` name.
fn is_eligible(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(".json"))
}

/// Read each file, skipping (and logging) those that cannot be read.
pub fn load(files: &[PathBuf]) -> Vec<FixtureFile> {
    files
        .iter()
        .filter_map(|path| match std::fs::read_to_string(path) {
            Ok(content) => Some(FixtureFile {
                path: path.clone(),
                content,
            }),
            Err(e) => {
                error!(file = %path.display(), error = %e, "Failed to read fixture file");
                None
            }
        })
        .collect()
}
