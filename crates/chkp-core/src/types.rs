//! Failure payload returned by the management server.
//!
//! Every non-200 response from the Web API carries a JSON body of this shape. It is decoded
//! once, classified into an [`Error`](crate::Error) kind, and never persisted.

use serde::{Deserialize, Serialize};

/// Structured decoding of a non-success response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureResponse {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Warnings reported alongside the failure.
    #[serde(default)]
    pub warnings: Vec<ErrorObject>,

    /// Errors reported alongside the failure.
    #[serde(default)]
    pub errors: Vec<ErrorObject>,

    /// Errors that block the requested operation.
    #[serde(default, rename = "blocking-errors")]
    pub blocking_errors: Vec<ErrorObject>,

    /// Machine error code, e.g. `generic_err_object_not_found`.
    #[serde(default)]
    pub code: String,

    /// Status code observed by the client. Not part of the wire body.
    #[serde(skip)]
    pub status_code: u16,
}

impl FailureResponse {
    /// Create a failure with a code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the client-observed status code.
    #[must_use]
    pub const fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Iterate over the messages of every sub-error, blocking errors first.
    pub fn sub_messages(&self) -> impl Iterator<Item = &str> {
        self.blocking_errors
            .iter()
            .chain(&self.errors)
            .chain(&self.warnings)
            .map(|entry| entry.message.as_str())
    }
}

/// A single warning or error entry inside a [`FailureResponse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorObject {
    /// Whether the entry relates to the current session.
    #[serde(default, rename = "current-session")]
    pub current_session: bool,

    /// Entry message.
    #[serde(default)]
    pub message: String,
}
