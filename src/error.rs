//! Error types for mapping synchronization.

use std::path::PathBuf;
use thiserror::Error;

/// A single failed call to a mock server admin endpoint.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The target answered with a status outside 2xx.
    #[error("Unexpected status code: {status} for request: {request}, {body}")]
    Status {
        status: String,
        request: String,
        body: String,
    },

    /// The request never produced a response (connection refused, timeout, bad URL).
    #[error("Call to mock server failed: {source} for request: {request}, null")]
    Transport {
        request: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Settings that cannot be resolved to fixture files.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Both file and directory settings are present. Please use only one.")]
    ConflictingFixtureSource,

    #[error("Directory does not exist: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to list directory {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All errors that can abort setup or a dispatched command.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Fixtures directory is not set")]
    MissingFixturesDir,

    #[error("Fixtures directory not found: {path}")]
    FixturesDirNotFound { path: PathBuf },

    #[error("Fixtures path is not a directory: {path}")]
    FixturesDirNotADirectory { path: PathBuf },

    #[error("Mock server url is not set")]
    MissingTargetUrl,

    #[error("Failed to build HTTP client for {url}: {source}")]
    HttpClient {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Command {command}: {source}")]
    Resolve {
        command: String,
        #[source]
        source: ResolveError,
    },

    #[error("Command {command}: upload of {file} to {target}{path} failed: {source}")]
    Upload {
        command: String,
        target: String,
        path: String,
        file: PathBuf,
        #[source]
        source: UploadError,
    },

    #[error("Command {command}: delete of {target}{path} failed: {source}")]
    Delete {
        command: String,
        target: String,
        path: String,
        #[source]
        source: UploadError,
    },
}
