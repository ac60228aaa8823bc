//! Error types for navigation, script replay and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Why a navigation attempt did not end with the new page applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The href could not be resolved; nothing was attempted.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A newer navigation superseded this one.
    #[error("navigation superseded by a newer request")]
    Cancelled,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    #[error("response for {url} has no element matching `{selector}`")]
    MalformedResponse { url: String, selector: String },

    #[error("failed to apply page: {0}")]
    Apply(String),
}

impl NavigationError {
    /// Transport failures and non-2xx statuses.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::HttpStatus(_))
    }
}

/// Failure while loading or running a page script. Logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("failed to load script {url}: {reason}")]
    Load { url: String, reason: String },

    #[error("inline script failed: {0}")]
    Execution(String),
}

/// Failure reported by a [`crate::fetch::Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid container selector `{0}`")]
    Selector(String),

    #[error("invalid document URL `{0}`")]
    DocumentUrl(String),
}
