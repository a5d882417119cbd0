//! Error types for Trialforge.
//!
//! Library crates use [`TrialforgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Trialforge build operations.
#[derive(Debug, thiserror::Error)]
pub enum TrialforgeError {
    /// Configuration loading or experiment-definition error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Data validation error (schema mismatch, constraint violation).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Table model or DDL generation error.
    #[error("schema error: {0}")]
    Schema(String),

    /// Stimulus source resolution or loading error.
    #[error("stimuli error: {0}")]
    Stimuli(String),

    /// Timeline scanning or materialization error.
    #[error("timeline error: {message}")]
    Timeline { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Artifact serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TrialforgeError>;

impl TrialforgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a timeline error from any displayable message.
    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
