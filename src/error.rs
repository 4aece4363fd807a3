//! Error types for paced-client
//!
//! This module defines the single error hierarchy for the crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Callers can match a specific variant or use [`Error::kind`] to catch a
//! whole category at once.

use std::time::Duration;
use thiserror::Error;

/// The main error type for paced-client
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Request Errors
    // ============================================================================
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("Authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Not found (HTTP 404): {message}")]
    NotFound { message: String },

    #[error("Rate limited (HTTP 429): {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request deadline exceeded while {stage}")]
    DeadlineExceeded { stage: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },
}

/// Broad error categories, for callers that only care about the class
/// of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad configuration or service definition
    Config,
    /// The request itself was malformed
    InvalidRequest,
    /// HTTP 401 / 403
    Authentication,
    /// HTTP 404
    NotFound,
    /// HTTP 429
    RateLimited,
    /// Any other HTTP status >= 400
    Api,
    /// Network-level failure
    Transport,
    /// Overall request deadline ran out
    Deadline,
    /// Successful response that could not be decoded
    Decode,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a deadline error
    pub fn deadline(stage: impl Into<String>) -> Self {
        Self::DeadlineExceeded {
            stage: stage.into(),
        }
    }

    /// Map a non-success HTTP status and its extracted message to an error
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Authentication { status, message },
            404 => Self::NotFound { message },
            429 => Self::RateLimited {
                retry_after,
                message,
            },
            _ => Self::Api { status, message },
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::JsonParse(_)
            | Error::InvalidUrl(_)
            | Error::UndefinedVariable { .. }
            | Error::Io(_) => ErrorKind::Config,
            Error::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Api { .. } => ErrorKind::Api,
            Error::Transport(_) => ErrorKind::Transport,
            Error::DeadlineExceeded { .. } => ErrorKind::Deadline,
            Error::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication { status, .. } | Error::Api { status, .. } => Some(*status),
            Error::NotFound { .. } => Some(404),
            Error::RateLimited { .. } => Some(429),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a caller may reasonably retry the failed request
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::RateLimited { .. } => true,
            Error::Api { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Whether this is a network timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(e) if e.is_timeout())
    }

    /// Server-provided `Retry-After` delay, for rate-limit errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for paced-client
pub type Result<T> = std::result::Result<T, Error>;
