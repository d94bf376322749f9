//! Error types shared by the control engine, the registry, discovery and the
//! results store.

use std::path::PathBuf;

/// Errors raised while loading adapters or driving a projector.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("unknown projector type: {0}")]
    UnknownAdapter(String),
    #[error("projector type {id} is not usable: {reason}")]
    InvalidAdapter { id: String, reason: String },
    #[error("unknown command '{command}' for projector type {adapter}")]
    UnknownCommand { adapter: String, command: String },
    #[error("cannot set source '{source_name}' for projector type {adapter}")]
    UnknownSource { adapter: String, source_name: String },
    #[error("command failed: {reason}")]
    CommandFailed { reason: String },
    #[error("status unavailable: {reason}")]
    StatusUnavailable { reason: String },
    #[error("invalid device settings: {0}")]
    InvalidSettings(String),
}

impl ControlError {
    pub fn command_failed(reason: impl Into<String>) -> Self {
        ControlError::CommandFailed {
            reason: reason.into(),
        }
    }

    pub fn status_unavailable(reason: impl Into<String>) -> Self {
        ControlError::StatusUnavailable {
            reason: reason.into(),
        }
    }
}

/// Errors starting a discovery sweep.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("discovery already in progress")]
    AlreadyRunning,
    #[error("invalid address range {start}..={end}")]
    InvalidRange { start: u8, end: u8 },
}

/// Errors reading or writing persisted discovery results.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed discovery results in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode discovery results: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Top-level failure of a command-line invocation.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no device selected: {0}")]
    NoDevice(String),
}
