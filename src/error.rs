//! Error types for the MCP adapter

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for the MCP adapter
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal adapter errors.
///
/// Only ingestion and configuration failures abort a run; everything after
/// ingestion recovers locally (see [`ProviderError`]).
#[derive(Error, Debug)]
pub enum Error {
    /// Remote spec unreachable or returned a non-success status
    #[error("Failed to fetch {source_desc}: {reason}")]
    Fetch {
        /// URL that was requested
        source_desc: String,
        /// What went wrong
        reason: String,
    },

    /// Input matches none of the recognized formats
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Format recognized but structurally invalid
    #[error("Malformed {format} document: {reason}")]
    MalformedSpec {
        /// Detected format name
        format: &'static str,
        /// Missing or invalid section
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a malformed-spec error
    pub fn malformed(format: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedSpec {
            format,
            reason: reason.into(),
        }
    }

    /// Whether this error came from reading the input (as opposed to config/IO plumbing)
    #[must_use]
    pub fn is_ingestion(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::UnsupportedFormat(_) | Self::MalformedSpec { .. }
        )
    }
}

/// Reasoning provider failures. Never fatal: each one moves the enhancer on
/// to the next provider in the chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Connection refused, DNS failure, reset
    #[error("network error: {0}")]
    Network(String),

    /// No complete response within the configured timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Missing or rejected credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-success HTTP status other than auth failures
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Response did not match the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingestion_errors_are_classified() {
        assert!(Error::UnsupportedFormat("x".into()).is_ingestion());
        assert!(Error::malformed("OpenAPI 3.x", "missing paths").is_ingestion());
        assert!(!Error::Config("bad".into()).is_ingestion());
    }

    #[test]
    fn malformed_message_names_the_format() {
        let e = Error::malformed("Swagger 2.x", "missing 'paths'");
        assert_eq!(e.to_string(), "Malformed Swagger 2.x document: missing 'paths'");
    }
}
