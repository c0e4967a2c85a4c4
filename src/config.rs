//! Configuration for the mapping synchronization engine.
//!
//! Defines where fixtures live, which mock servers receive them and how
//! upload failures are treated.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration, fixed before the first command is dispatched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Root directory holding the JSON fixtures
    #[serde(default)]
    pub fixtures_dir: Option<PathBuf>,

    /// Comma-separated mock server base URLs
    #[serde(default)]
    pub urls: Option<String>,

    /// Route admin calls through the local debugging proxy
    #[serde(default)]
    pub use_proxy: bool,

    /// Proxy used when `use_proxy` is set
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    /// Log failed uploads and carry on instead of aborting the command
    #[serde(default)]
    pub continue_on_upload_error: bool,

    /// Per-request timeout; the transport default applies when unset
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_proxy_url() -> String {
    "http://localhost:8888".to_string()
}

impl EngineConfig {
    /// Create a configuration for the given fixtures directory and URL list.
    pub fn new(fixtures_dir: impl Into<PathBuf>, urls: impl Into<String>) -> Self {
        Self {
            fixtures_dir: Some(fixtures_dir.into()),
            urls: Some(urls.into()),
            proxy_url: default_proxy_url(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// The fixtures directory must exist and at least one target URL must be set.
    pub fn validate(&self) -> Result<(), SyncError> {
        self.fixtures_root()?;
        self.target_urls()?;
        Ok(())
    }

    /// The validated fixtures root directory.
    pub fn fixtures_root(&self) -> Result<&Path, SyncError> {
        let dir = self
            .fixtures_dir
            .as_deref()
            .ok_or(SyncError::MissingFixturesDir)?;
        if !dir.exists() {
            return Err(SyncError::FixturesDirNotFound {
                path: dir.to_path_buf(),
            });
        }
        if !dir.is_dir() {
            return Err(SyncError::FixturesDirNotADirectory {
                path: dir.to_path_buf(),
            });
        }
        Ok(dir)
    }

    /// Target base URLs in configured order, without trailing slashes.
    pub fn target_urls(&self) -> Result<Vec<String>, SyncError> {
        let urls: Vec<String> = self
            .urls
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .map(String::from)
            .collect();

        if urls.is_empty() {
            return Err(SyncError::MissingTargetUrl);
        }
        Ok(urls)
    }

    /// Request timeout, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
