//! Error types for Shelfscan.
//!
//! Only failures that abort a request live here. Malformed model output is
//! not an error: the normalizer turns it into an [`UnparsableResult`] that is
//! returned to the caller as data.
//!
//! [`UnparsableResult`]: crate::types::UnparsableResult

use thiserror::Error;

/// Top-level error type for one analysis request.
#[derive(Error, Debug)]
pub enum ShelfscanError {
    /// Upstream model provider errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// The upload could not be stored in temporary storage
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Failures of the upstream call itself (network, auth, quota).
///
/// Every variant maps to the same generic 500 at the HTTP layer; the details
/// are for server-side logs only.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// No API credential configured
    #[error("{provider} API key not set. Set OPENAI_API_KEY env var.")]
    MissingApiKey { provider: String },

    /// The request never produced an HTTP response
    #[error("{provider} request failed: {message}")]
    Request { provider: String, message: String },

    /// The provider answered with a non-success status
    #[error("{provider} HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    /// The response body was not JSON at all
    #[error("Failed to read {provider} response: {message}")]
    InvalidBody { provider: String, message: String },

    /// The uploaded image could not be read back from temporary storage
    #[error("Failed to read uploaded image: {message}")]
    Upload { message: String },
}

impl UpstreamError {
    /// HTTP status reported by the provider, if the call got that far.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience type alias for Shelfscan results.
pub type Result<T> = std::result::Result<T, ShelfscanError>;
