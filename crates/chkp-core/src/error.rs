//! Error types for management API operations.
//!
//! This module provides the error taxonomy shared by every client crate: transport failures,
//! decode failures, protocol-state errors, the classified server failure kinds callers branch
//! on, and the unclassified server failure carrying the full payload.

use crate::types::FailureResponse;
use thiserror::Error;

/// Main error type for management API operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Management server is unreachable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Malformed JSON in a success or failure body
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// A session token is required but none is stored
    #[error("no session ID")]
    NoSession,

    /// The server returned an empty task collection for a task ID
    #[error("no task: {0}")]
    NoTask(String),

    /// Polling a task exceeded the configured ceiling
    #[error("task timeout exceeded: {0}")]
    TaskTimeout(String),

    /// Waiting was cancelled by the caller
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Object is locked by another session
    #[error("Object is locked by another session: {0}")]
    ObjectLocked(String),

    /// Object with the same name exists
    #[error("Object with the same name exists: {0}")]
    ObjectNameExists(String),

    /// Object with the same IP address exists
    #[error("Object with the same ip address exists: {0}")]
    IpAddressExists(String),

    /// Object not found
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Server failure that matched no known signature
    #[error("Management API error `{}`: {}", .0.code, .0.message)]
    Api(Box<FailureResponse>),
}

/// Specialized result type for management API operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::NoSession => "NO_SESSION",
            Self::NoTask(_) => "NO_TASK",
            Self::TaskTimeout(_) => "TASK_TIMEOUT",
            Self::Cancelled(_) => "CANCELLED",
            Self::ObjectLocked(_) => "OBJECT_LOCKED",
            Self::ObjectNameExists(_) => "OBJECT_NAME_EXISTS",
            Self::IpAddressExists(_) => "IP_ADDRESS_EXISTS",
            Self::ObjectNotFound(_) => "OBJECT_NOT_FOUND",
            Self::Api(_) => "API_ERROR",
        }
    }

    /// The server's original message, for errors decoded from a failure body.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::ObjectLocked(message)
            | Self::ObjectNameExists(message)
            | Self::IpAddressExists(message)
            | Self::ObjectNotFound(message) => Some(message),
            Self::Api(failure) => Some(&failure.message),
            _ => None,
        }
    }

    /// The raw failure payload of an unclassified server error.
    #[must_use]
    pub fn failure(&self) -> Option<&FailureResponse> {
        match self {
            Self::Api(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns true when another session holds a lock on the target object.
    #[must_use]
    pub const fn is_lock_contention(&self) -> bool {
        matches!(self, Self::ObjectLocked(_))
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(format!("Invalid configuration: {err}"))
    }
}
