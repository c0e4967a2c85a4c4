//! Mock Mapping Sync
//!
//! Keeps one or more mock servers in sync with JSON fixtures on disk while a
//! load test is running. A scheduler fires named commands at chosen moments;
//! each command picks fixture files, fills in `${placeholders}` and posts the
//! result to the admin API of every configured mock server.
//!
//! # Commands
//!
//! - **change-mappings**: post stub mappings to `/__admin/mappings`
//! - **change-import**: bulk import mappings via `/__admin/mappings/import`
//! - **change-settings**: replace global settings at `/__admin/settings`
//!
//! # Settings
//!
//! Commands carry a `key=value;key=value` string. `file=<name>` uploads one
//! fixture with the other keys used as placeholder values, while
//! `directory=<name>` uploads every `*.json` file of a subdirectory as is
//! (clearing existing mappings first for `change-mappings`).
//!
//! ```text
//! change-mappings   file=slow-backend.json;delay=4000
//! change-settings   file=global-settings.json;delay=400
//! change-mappings   directory=scenario-b
//! ```
//!
//! # Example Configuration
//!
//! ```yaml
//! fixtures_dir: ./fixtures
//! urls: "http://localhost:8080,http://localhost:8081"
//! continue_on_upload_error: false
//! ```

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod fixtures;
pub mod settings;
pub mod substitute;

pub use client::{AdminClient, TargetClient};
pub use config::EngineConfig;
pub use engine::{AdminCommand, SyncEngine};
pub use error::{ResolveError, SyncError, UploadError};
pub use event::{EventHandler, MappingSyncEvent};
