use crate::channel::ChannelId;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by a [`ScheduleProvider`](crate::ScheduleProvider).
///
/// This is the complete set of kinds the core expects from the remote side.
/// The core never retries or translates them; they propagate to whoever
/// started the refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The remote answered with a client-error status.
    #[error("Schedule provider rejected the request with status {status}")]
    BadRequest { status: u16 },

    /// Transport-level failure (connection, timeout, server error, undecodable body).
    #[error("Schedule provider request failed: {reason}")]
    IoFailure { reason: String },

    /// The request was cancelled while waiting for the remote.
    #[error("Schedule provider request was interrupted")]
    Interrupted,

    /// The endpoint address could not be built.
    #[error("Malformed schedule provider address: {reason}")]
    MalformedAddress { reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please review it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Refresh errors
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Unknown channel: {channel_id}")]
    UnknownChannel { channel_id: ChannelId },

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoreError {
    /// The provider failure behind this error, if it came from the remote side.
    #[must_use]
    pub const fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
