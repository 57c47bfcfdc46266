//! Error types for imagestash
//!
//! All modules use `StashResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for imagestash operations
pub type StashResult<T> = Result<T, StashError>;

/// All errors that can occur in imagestash
#[derive(Error, Debug)]
pub enum StashError {
    // Key and path errors
    #[error("Cache key must not be empty")]
    EmptyKey,

    #[error("Cannot build a cache path for key '{key}': {reason}")]
    InvalidPath { key: String, reason: String },

    #[error("No cache directory available on this platform")]
    NoCacheDirectory,

    // Storage errors
    #[error("Unable to encode image for storage: {0}")]
    Encoding(String),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Network errors
    #[error("Invalid source locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Bad response: HTTP status {status}")]
    BadResponse { status: u16 },

    #[error("Unable to decode image: {0}")]
    Decode(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // Resolver usage errors
    #[error("Nothing to refresh: no image has been requested yet")]
    NoPreviousRequest,

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`StashError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Key,
    Path,
    Encoding,
    Io,
    Url,
    Transport,
    BadResponse,
    Decode,
    Config,
    Usage,
    Internal,
}

impl StashError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error from any displayable failure
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// Create an invalid path error
    pub fn invalid_path(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyKey => ErrorKind::Key,
            Self::InvalidPath { .. } | Self::NoCacheDirectory => ErrorKind::Path,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Io { .. } => ErrorKind::Io,
            Self::InvalidLocator { .. } => ErrorKind::Url,
            Self::Transport(_) => ErrorKind::Transport,
            Self::BadResponse { .. } => ErrorKind::BadResponse,
            Self::Decode(_) => ErrorKind::Decode,
            Self::ConfigInvalid { .. }
            | Self::ConfigDirCreate { .. }
            | Self::TomlParse(_)
            | Self::TomlSerialize(_) => ErrorKind::Config,
            Self::NoPreviousRequest => ErrorKind::Usage,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if a user-initiated refresh could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::BadResponse { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Transport(_) => Some("Check the network connection and refresh"),
            Self::BadResponse { .. } => Some("The image host rejected the request; refresh to retry"),
            Self::NoCacheDirectory => Some("Set disk.directory in config.toml or IMAGESTASH_CACHE_DIR"),
            Self::NoPreviousRequest => Some("Call resolve() before refresh()"),
            _ => None,
        }
    }
}
