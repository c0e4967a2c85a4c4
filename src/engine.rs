//! Mapping synchronization engine.
//!
//! Resolves the fixtures of a command, templates them and pushes them to
//! every configured mock server in order.

use crate::client::{AdminClient, TargetClient, TransportOptions};
use crate::config::EngineConfig;
use crate::error::SyncError;
use crate::fixtures::{self, FixtureFile};
use crate::settings;
use crate::substitute::substitute;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, error, info};

/// Admin path for stub mappings.
pub const MAPPINGS_PATH: &str = "/__admin/mappings";
/// Admin path for bulk mapping imports.
pub const MAPPINGS_IMPORT_PATH: &str = "/__admin/mappings/import";
/// Admin path for global settings.
pub const ADMIN_SETTINGS_PATH: &str = "/__admin/settings";

/// Prefix accepted in front of command names coming from scheduler event files.
const COMMAND_ALIAS_PREFIX: &str = "wiremock-";

/// A command the engine knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    ChangeMappings,
    ChangeImport,
    ChangeSettings,
}

impl AdminCommand {
    /// Canonical names of all accepted commands.
    pub const ALL: [&'static str; 3] = ["change-mappings", "change-import", "change-settings"];

    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::ChangeMappings => "change-mappings",
            AdminCommand::ChangeImport => "change-import",
            AdminCommand::ChangeSettings => "change-settings",
        }
    }

    /// Admin API path the fixtures of this command are posted to.
    pub fn admin_path(&self) -> &'static str {
        match self {
            AdminCommand::ChangeMappings => MAPPINGS_PATH,
            AdminCommand::ChangeImport => MAPPINGS_IMPORT_PATH,
            AdminCommand::ChangeSettings => ADMIN_SETTINGS_PATH,
        }
    }
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AdminCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix(COMMAND_ALIAS_PREFIX).unwrap_or(lower.as_str());
        match name {
            "change-mappings" => Ok(AdminCommand::ChangeMappings),
            "change-import" => Ok(AdminCommand::ChangeImport),
            "change-settings" => Ok(AdminCommand::ChangeSettings),
            _ => Err(format!("unknown command: {s}")),
        }
    }
}

/// Pushes fixtures to an ordered list of mock server targets.
pub struct SyncEngine {
    fixtures_root: PathBuf,
    continue_on_upload_error: bool,
    clients: Vec<Box<dyn AdminClient>>,
}

impl SyncEngine {
    /// Validate `config` and build one HTTP client per target URL.
    pub fn from_config(config: &EngineConfig) -> Result<Self, SyncError> {
        let fixtures_root = config.fixtures_root()?.to_path_buf();
        let options = TransportOptions {
            proxy: config.use_proxy.then(|| config.proxy_url.clone()),
            timeout: config.request_timeout(),
        };

        let clients = config
            .target_urls()?
            .iter()
            .map(|url| {
                TargetClient::new(url, &options).map(|c| Box::new(c) as Box<dyn AdminClient>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            fixtures_dir = %fixtures_root.display(),
            targets = clients.len(),
            use_proxy = config.use_proxy,
            continue_on_upload_error = config.continue_on_upload_error,
            "Mapping sync engine initialized"
        );

        Ok(Self {
            fixtures_root,
            continue_on_upload_error: config.continue_on_upload_error,
            clients,
        })
    }

    /// Build an engine around already constructed clients.
    pub fn with_clients(
        fixtures_root: impl Into<PathBuf>,
        continue_on_upload_error: bool,
        clients: Vec<Box<dyn AdminClient>>,
    ) -> Self {
        Self {
            fixtures_root: fixtures_root.into(),
            continue_on_upload_error,
            clients,
        }
    }

    /// Base URLs of the targets in dispatch order.
    pub fn target_urls(&self) -> Vec<&str> {
        self.clients.iter().map(|c| c.base_url()).collect()
    }

    /// Apply a named command with its raw settings string.
    ///
    /// Unknown commands are ignored. Errors are returned only for
    /// configuration problems and, unless `continue_on_upload_error` is set,
    /// for the first failed admin call.
    pub async fn dispatch(&self, name: &str, settings_raw: &str) -> Result<(), SyncError> {
        let command = match name.parse::<AdminCommand>() {
            Ok(command) => command,
            Err(_) => {
                debug!(command = %name, "Ignoring unknown command");
                return Ok(());
            }
        };
        self.apply(command, settings_raw).await
    }

    /// Apply a parsed command.
    pub async fn apply(&self, command: AdminCommand, settings_raw: &str) -> Result<(), SyncError> {
        let path = command.admin_path();
        let settings = settings::parse(settings_raw);
        let resolution =
            fixtures::resolve(&self.fixtures_root, &settings).map_err(|source| {
                SyncError::Resolve {
                    command: command.to_string(),
                    source,
                }
            })?;

        let fixtures: Vec<FixtureFile> = fixtures::load(&resolution.files)
            .into_iter()
            .map(|fixture| match &resolution.replacements {
                Some(replacements) => FixtureFile {
                    content: substitute(&fixture.content, replacements),
                    path: fixture.path,
                },
                None => fixture,
            })
            .collect();

        // Imports are addressed per mapping id and cannot be bulk-cleared
        let clear_first = resolution.delete_before_import() && path == MAPPINGS_PATH;

        info!(
            command = %command,
            path = %path,
            fixtures = fixtures.len(),
            clear_first,
            "Applying command"
        );

        for client in &self.clients {
            if clear_first {
                if let Err(source) = client.delete_all(path).await {
                    self.handle_failure(SyncError::Delete {
                        command: command.to_string(),
                        target: client.base_url().to_string(),
                        path: path.to_string(),
                        source,
                    })?;
                }
            }

            for fixture in &fixtures {
                info!(
                    target_url = %client.base_url(),
                    file = %fixture.path.display(),
                    "Importing fixture"
                );
                if let Err(source) = client.upload(path, &fixture.content).await {
                    self.handle_failure(SyncError::Upload {
                        command: command.to_string(),
                        target: client.base_url().to_string(),
                        path: path.to_string(),
                        file: fixture.path.clone(),
                        source,
                    })?;
                }
            }
        }

        Ok(())
    }

    fn handle_failure(&self, err: SyncError) -> Result<(), SyncError> {
        error!(error = %err, "Error uploading file");
        if self.continue_on_upload_error {
            Ok(())
        } else {
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ResolveError, UploadError};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Upload { target: String, path: String, payload: String },
        DeleteAll { target: String, path: String },
    }

    type CallLog = Arc<Mutex<Vec<Call>>>;

    struct RecordingClient {
        base_url: String,
        calls: CallLog,
        fail_uploads: bool,
        fail_deletes: bool,
    }

    #[async_trait]
    impl AdminClient for RecordingClient {
        fn base_url(&self) -> &str {
            &self.base_url
        }

        async fn upload(&self, path: &str, payload: &str) -> Result<(), UploadError> {
            self.calls.lock().unwrap().push(Call::Upload {
                target: self.base_url.clone(),
                path: path.to_string(),
                payload: payload.to_string(),
            });
            if self.fail_uploads {
                return Err(UploadError::Status {
                    status: "500 Internal Server Error".to_string(),
                    request: format!("POST {}{}", self.base_url, path),
                    body: "boom".to_string(),
                });
            }
            Ok(())
        }

        async fn delete_all(&self, path: &str) -> Result<(), UploadError> {
            self.calls.lock().unwrap().push(Call::DeleteAll {
                target: self.base_url.clone(),
                path: path.to_string(),
            });
            if self.fail_deletes {
                return Err(UploadError::Status {
                    status: "503 Service Unavailable".to_string(),
                    request: format!("DELETE {}{}", self.base_url, path),
                    body: "null".to_string(),
                });
            }
            Ok(())
        }
    }

    fn fixture_root() -> TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join("delay.json"),
            r#"{"response": {"fixedDelayMilliseconds": ${delay}}}"#,
        )
        .unwrap();
        fs::write(root.path().join("settings.json"), r#"{"fixedDelay": ${delay}}"#).unwrap();

        let swap = root.path().join("swap");
        fs::create_dir(&swap).unwrap();
        fs::write(swap.join("one.json"), r#"{"id": 1, "delay": ${delay}}"#).unwrap();
        fs::write(swap.join("two.json"), r#"{"id": 2}"#).unwrap();
        fs::write(swap.join("notes.txt"), "ignored").unwrap();
        root
    }

    fn engine(root: &TempDir, continue_on_error: bool, failing: &[bool]) -> (SyncEngine, CallLog) {
        let targets: Vec<(bool, bool)> = failing.iter().map(|fail| (*fail, false)).collect();
        engine_with(root, continue_on_error, &targets)
    }

    /// One recording client per `(fail_uploads, fail_deletes)` pair.
    fn engine_with(
        root: &TempDir,
        continue_on_error: bool,
        targets: &[(bool, bool)],
    ) -> (SyncEngine, CallLog) {
        let calls: CallLog = Arc::default();
        let clients = targets
            .iter()
            .enumerate()
            .map(|(i, (fail_uploads, fail_deletes))| {
                Box::new(RecordingClient {
                    base_url: format!("http://target-{}", i + 1),
                    calls: calls.clone(),
                    fail_uploads: *fail_uploads,
                    fail_deletes: *fail_deletes,
                }) as Box<dyn AdminClient>
            })
            .collect();
        (
            SyncEngine::with_clients(root.path(), continue_on_error, clients),
            calls,
        )
    }

    fn calls(log: &CallLog) -> Vec<Call> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_command_names() {
        assert_eq!(
            "change-mappings".parse::<AdminCommand>().unwrap(),
            AdminCommand::ChangeMappings
        );
        assert_eq!(
            "CHANGE-IMPORT".parse::<AdminCommand>().unwrap(),
            AdminCommand::ChangeImport
        );
        assert_eq!(
            "wiremock-change-settings".parse::<AdminCommand>().unwrap(),
            AdminCommand::ChangeSettings
        );
        assert!("change-everything".parse::<AdminCommand>().is_err());

        assert_eq!(AdminCommand::ChangeMappings.admin_path(), "/__admin/mappings");
        assert_eq!(AdminCommand::ChangeImport.admin_path(), "/__admin/mappings/import");
        assert_eq!(AdminCommand::ChangeSettings.admin_path(), "/__admin/settings");
        for name in AdminCommand::ALL {
            assert_eq!(name.parse::<AdminCommand>().unwrap().name(), name);
        }
    }

    #[tokio::test]
    async fn test_file_mode_substitutes_and_fans_out() {
        let root = fixture_root();
        let (engine, log) = engine(&root, false, &[false, false]);

        engine
            .dispatch("change-settings", "file=settings.json;delay=400")
            .await
            .unwrap();

        let expected: Vec<Call> = ["http://target-1", "http://target-2"]
            .iter()
            .map(|target| Call::Upload {
                target: target.to_string(),
                path: ADMIN_SETTINGS_PATH.to_string(),
                payload: r#"{"fixedDelay": 400}"#.to_string(),
            })
            .collect();
        assert_eq!(calls(&log), expected);
    }

    #[tokio::test]
    async fn test_unknown_command_is_ignored() {
        let root = fixture_root();
        let (engine, log) = engine(&root, false, &[false]);

        engine.dispatch("restart-everything", "file=delay.json").await.unwrap();
        assert!(calls(&log).is_empty());
    }

    #[tokio::test]
    async fn test_conflicting_settings_touch_no_target() {
        let root = fixture_root();
        let (engine, log) = engine(&root, true, &[false, false]);

        let result = engine
            .dispatch("change-mappings", "file=delay.json;directory=swap")
            .await;
        match result {
            Err(SyncError::Resolve { command, source }) => {
                assert_eq!(command, "change-mappings");
                assert!(matches!(source, ResolveError::ConflictingFixtureSource));
            }
            other => panic!("Expected resolve error, got {other:?}"),
        }
        assert!(calls(&log).is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_noop_and_missing_directory_fails() {
        let root = fixture_root();
        let (engine, log) = engine(&root, false, &[false]);

        engine.dispatch("change-mappings", "file=nope.json").await.unwrap();
        engine.dispatch("change-mappings", "delay=10").await.unwrap();

        let result = engine.dispatch("change-mappings", "directory=nope").await;
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("Command change-mappings: Directory does not exist"));
        assert!(matches!(
            err,
            SyncError::Resolve {
                source: ResolveError::DirectoryNotFound { .. },
                ..
            }
        ));
        assert!(calls(&log).is_empty());
    }

    #[tokio::test]
    async fn test_directory_mappings_cleared_once_per_target() {
        let root = fixture_root();
        let (engine, log) = engine(&root, false, &[false, false]);

        engine
            .dispatch("change-mappings", "directory=swap;delay=400")
            .await
            .unwrap();

        let mut expected = Vec::new();
        for target in ["http://target-1", "http://target-2"] {
            expected.push(Call::DeleteAll {
                target: target.to_string(),
                path: MAPPINGS_PATH.to_string(),
            });
            // Directory fixtures are uploaded verbatim
            for payload in [r#"{"id": 1, "delay": ${delay}}"#, r#"{"id": 2}"#] {
                expected.push(Call::Upload {
                    target: target.to_string(),
                    path: MAPPINGS_PATH.to_string(),
                    payload: payload.to_string(),
                });
            }
        }
        assert_eq!(calls(&log), expected);
    }

    #[tokio::test]
    async fn test_directory_import_is_not_cleared() {
        let root = fixture_root();
        let (engine, log) = engine(&root, false, &[false]);

        engine.dispatch("change-import", "directory=swap").await.unwrap();

        let recorded = calls(&log);
        assert_eq!(recorded.len(), 2);
        assert!(recorded
            .iter()
            .all(|call| matches!(call, Call::Upload { path, .. } if path == MAPPINGS_IMPORT_PATH)));
    }

    #[tokio::test]
    async fn test_repeated_dispatch_is_identical() {
        let root = fixture_root();
        let (engine, log) = engine(&root, false, &[false, false]);

        engine.dispatch("change-mappings", "directory=swap").await.unwrap();
        let first = calls(&log);
        log.lock().unwrap().clear();

        engine.dispatch("change-mappings", "directory=swap").await.unwrap();
        assert_eq!(calls(&log), first);
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_remaining_targets() {
        let root = fixture_root();
        let (engine, log) = engine(&root, false, &[true, false]);

        let result = engine
            .dispatch("change-mappings", "file=delay.json;delay=4000")
            .await;

        match result {
            Err(SyncError::Upload { command, target, path, file, .. }) => {
                assert_eq!(command, "change-mappings");
                assert_eq!(target, "http://target-1");
                assert_eq!(path, MAPPINGS_PATH);
                assert_eq!(file, root.path().join("delay.json"));
            }
            other => panic!("Expected upload error, got {other:?}"),
        }

        let recorded = calls(&log);
        assert_eq!(recorded.len(), 1);
        assert!(!recorded
            .iter()
            .any(|call| matches!(call, Call::Upload { target, .. } if target == "http://target-2")));
    }

    #[tokio::test]
    async fn test_upload_failure_continues_when_allowed() {
        let root = fixture_root();
        let (engine, log) = engine(&root, true, &[true, false]);

        engine
            .dispatch("change-mappings", "file=delay.json;delay=4000")
            .await
            .unwrap();

        let targets: Vec<String> = calls(&log)
            .into_iter()
            .map(|call| match call {
                Call::Upload { target, .. } | Call::DeleteAll { target, .. } => target,
            })
            .collect();
        assert_eq!(targets, vec!["http://target-1", "http://target-2"]);
    }

    #[tokio::test]
    async fn test_failed_clear_aborts_before_any_upload() {
        let root = fixture_root();
        let (engine, log) = engine_with(&root, false, &[(false, true), (false, false)]);

        let result = engine.dispatch("change-mappings", "directory=swap").await;

        match result {
            Err(SyncError::Delete { command, target, path, .. }) => {
                assert_eq!(command, "change-mappings");
                assert_eq!(target, "http://target-1");
                assert_eq!(path, MAPPINGS_PATH);
            }
            other => panic!("Expected delete error, got {other:?}"),
        }
        assert_eq!(
            calls(&log),
            vec![Call::DeleteAll {
                target: "http://target-1".to_string(),
                path: MAPPINGS_PATH.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_clear_continues_when_allowed() {
        let root = fixture_root();
        let (engine, log) = engine_with(&root, true, &[(false, true), (false, false)]);

        engine.dispatch("change-mappings", "directory=swap").await.unwrap();

        let recorded = calls(&log);
        let uploads_per_target = |target: &str| {
            recorded
                .iter()
                .filter(|call| matches!(call, Call::Upload { target: t, .. } if t == target))
                .count()
        };
        assert_eq!(recorded.len(), 6);
        assert_eq!(uploads_per_target("http://target-1"), 2);
        assert_eq!(uploads_per_target("http://target-2"), 2);
        assert!(matches!(&recorded[1], Call::Upload { target, .. } if target == "http://target-1"));
    }

    #[tokio::test]
    async fn test_from_config_builds_clients_in_order() {
        let root = fixture_root();
        let config = EngineConfig::new(root.path(), "http://a:8080/,http://b:8081");
        let engine = SyncEngine::from_config(&config).unwrap();
        assert_eq!(engine.target_urls(), vec!["http://a:8080", "http://b:8081"]);
    }
}
