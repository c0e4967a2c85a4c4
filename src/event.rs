//! Scheduler lifecycle hooks.
//!
//! The test orchestrator calls `on_setup` once before the run, `on_command`
//! for every scheduled command in sequence, and `on_teardown` once at the end.

use crate::config::EngineConfig;
use crate::engine::{AdminCommand, SyncEngine};
use crate::error::SyncError;
use async_trait::async_trait;
use tracing::info;

/// Capabilities a scheduled event handler exposes to the orchestrator.
#[async_trait]
pub trait EventHandler: Sized + Send + Sync {
    type Config: Send;

    /// Validate configuration and prepare everything commands need.
    fn on_setup(config: Self::Config) -> Result<Self, SyncError>;

    /// Handle one scheduled command.
    async fn on_command(&self, name: &str, settings: &str) -> Result<(), SyncError>;

    /// Release resources after the last command.
    fn on_teardown(self);

    /// Command names this handler reacts to.
    fn allowed_commands(&self) -> &'static [&'static str];
}

/// Event handler keeping mock servers in sync with fixture files.
pub struct MappingSyncEvent {
    engine: SyncEngine,
}

impl MappingSyncEvent {
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }
}

#[async_trait]
impl EventHandler for MappingSyncEvent {
    type Config = EngineConfig;

    fn on_setup(config: EngineConfig) -> Result<Self, SyncError> {
        info!("Setting up mapping sync");
        config.validate()?;
        let engine = SyncEngine::from_config(&config)?;
        Ok(Self { engine })
    }

    async fn on_command(&self, name: &str, settings: &str) -> Result<(), SyncError> {
        self.engine.dispatch(name, settings).await
    }

    fn on_teardown(self) {
        info!(targets = self.engine.target_urls().len(), "Mapping sync finished");
    }

    fn allowed_commands(&self) -> &'static [&'static str] {
        &AdminCommand::ALL
    }
}
