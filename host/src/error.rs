//! Host-specific error types

use shared::{SharedError, SurfaceId};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Unknown worker: {name}")]
    UnknownWorker { name: String },

    #[error("Failed to spawn worker {name}: {message}")]
    SpawnFailed { name: String, message: String },

    #[error("Worker {name} not ready after {waited:?}")]
    DegradedStart { name: String, waited: Duration },

    #[error("Worker {name} exited before becoming ready")]
    WorkerExited { name: String },

    #[error("Renderer shell unavailable: {message}")]
    ShellUnavailable { message: String },

    #[error("Content source unavailable: {source_desc}")]
    ContentUnavailable { source_desc: String },

    #[error("Unknown surface: {surface}")]
    UnknownSurface { surface: SurfaceId },

    #[error("Screen capture failed: {message}")]
    CaptureFailed { message: String },

    #[error("Transport error: {message}")]
    TransportError { message: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl HostError {
    pub fn spawn(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::SpawnFailed {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }

    pub fn shell(message: impl Into<String>) -> Self {
        Self::ShellUnavailable { message: message.into() }
    }

    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::TransportError {
            message: message.to_string(),
        }
    }

    pub fn capture(message: impl std::fmt::Display) -> Self {
        Self::CaptureFailed {
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for HostError {
    fn from(e: reqwest::Error) -> Self {
        Self::transport(e)
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// Failure to install the OS-level input hook
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The OS refused the hook; the user has to grant accessibility access
    #[error("Accessibility permission required ({detail})")]
    PermissionDenied { detail: String },

    #[error("Input hook unavailable: {detail}")]
    Unavailable { detail: String },
}

impl HookError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, HookError::PermissionDenied { .. })
    }
}
