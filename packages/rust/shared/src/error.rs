//! Error types for DemoForge.
//!
//! Library crates use [`DemoForgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Variants map onto the failure taxonomy of a run:
//! - fatal-to-run: [`DemoForgeError::NoCandidatesFound`], [`DemoForgeError::Config`]
//! - fatal-to-lead: [`DemoForgeError::StoreWriteFailed`],
//!   [`DemoForgeError::RepositoryPersonalizationFailed`]
//! - turn-fatal: [`DemoForgeError::AiUnavailable`]
//!
//! Everything else is either propagated by a collaborator and absorbed by the
//! caller's fallback, or surfaces as a lead failure.

use std::path::PathBuf;

/// Top-level error type for all DemoForge operations.
#[derive(Debug, thiserror::Error)]
pub enum DemoForgeError {
    /// Configuration loading or credential resolution error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to a collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// Response parsing error (HTML, JSON, CLI output).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, empty input, illegal transition, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Discovery produced nothing usable. Terminal for the run.
    #[error("no candidates found for query '{query}'")]
    NoCandidatesFound { query: String },

    /// The CRM record for a lead could not be created. Terminal for the lead.
    #[error("store write failed: {0}")]
    StoreWriteFailed(String),

    /// Repository creation, personalization, or push failed. Terminal for the lead.
    #[error("repository personalization failed: {0}")]
    RepositoryPersonalizationFailed(String),

    /// Deployment platform error (absorbed by the tier chain).
    #[error("deployment error: {0}")]
    Deployment(String),

    /// The completion endpoint could not be reached during a conversational turn.
    #[error("AI unavailable: {0}")]
    AiUnavailable(String),

    /// Any other collaborator reported a failure.
    #[error("{service} error: {message}")]
    Collaborator { service: String, message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DemoForgeError>;

impl DemoForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

    /// Create a collaborator error tagged with the service name.
    pub fn collaborator(service: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Collaborator {
            service: service.into(),
            message: msg.into(),
        }
    }
}
