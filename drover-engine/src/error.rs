//! Typed errors for the send engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::transport::TransportError;

/// Top-level engine error.
///
/// Configuration and input errors are fatal at startup, before any send is
/// attempted. Transport failures are handled per recipient by the runner and
/// only surface here when state or journal persistence itself fails.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Campaign configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The recipient file is missing or cannot be parsed.
    #[error("Recipient file error: {0}")]
    Recipients(String),

    /// The campaign template file is missing or unreadable.
    #[error("Template not found: {0}")]
    TemplateNotFound(PathBuf),

    /// Serializing or deserializing the persistent send state failed.
    #[error("State serialization error: {0}")]
    State(#[from] serde_json::Error),

    /// Reading or writing a journal/state file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A transport failure that escaped recipient-level handling.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl EngineError {
    /// Returns `true` for errors that abort a run before any send.
    #[must_use]
    pub const fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Recipients(_) | Self::TemplateNotFound(_)
        )
    }
}
