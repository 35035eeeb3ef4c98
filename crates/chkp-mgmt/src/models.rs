//! Wire models for the session lifecycle and task endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status reported by `show-task` while a task is still running.
pub const TASK_STATUS_IN_PROGRESS: &str = "in progress";

/// Body of the `login` action.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub user: &'a str,
    pub password: &'a str,
}

/// Response of the `login` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    /// Session token sent back in the session header.
    pub sid: String,
    /// API version served by the management server.
    #[serde(default, rename = "api-server-version")]
    pub api_server_version: String,
    /// When this user last logged in.
    #[serde(default, rename = "last-login-was-at")]
    pub last_login_was_at: LastLogin,
    /// Banner configured on the server.
    #[serde(default, rename = "loginMessage")]
    pub login_message: Option<serde_json::Value>,
    /// Whether the session is read-only.
    #[serde(default, rename = "read-only")]
    pub read_only: bool,
    /// Idle timeout of the session in seconds. Enforced by the server only.
    #[serde(default, rename = "session-timeout")]
    pub session_timeout: u64,
    /// Whether the server is a standby management server.
    #[serde(default)]
    pub standby: bool,
    /// Session object UID.
    #[serde(default)]
    pub uid: String,
    /// Web API URL echoed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Timestamp pair used by the management server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastLogin {
    /// ISO-8601 rendering, in the server's local offset.
    #[serde(default, rename = "iso-8601")]
    pub iso_8601: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub posix: i64,
}

impl LastLogin {
    /// The timestamp as UTC, when the server reported one.
    #[must_use]
    pub fn at(&self) -> Option<DateTime<Utc>> {
        if self.posix == 0 {
            return None;
        }
        DateTime::<Utc>::from_timestamp_millis(self.posix)
    }
}

/// Generic reference to a server-side object.
///
/// Type-specific fields are not interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagedObject {
    /// Object name.
    #[serde(default)]
    pub name: String,
    /// Object UID.
    #[serde(default)]
    pub uid: String,
    /// Object type tag, e.g. `host`.
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Handle returned by task-producing actions such as `publish`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskId {
    /// Task identifier.
    #[serde(rename = "task-id")]
    pub id: String,
}

/// One asynchronous server-side operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Human readable task name.
    #[serde(default, rename = "task-name")]
    pub name: String,
    /// Task identifier.
    #[serde(default, rename = "task-id")]
    pub id: String,
    /// Completion percentage.
    #[serde(default, rename = "progress-percentage")]
    pub progress: i32,
    /// Status, `in progress` until the task reaches a terminal state.
    #[serde(default)]
    pub status: String,
    /// Whether the task is hidden from the task list.
    #[serde(default)]
    pub suppressed: bool,
}

impl Task {
    /// Returns true once the status is anything other than `in progress`.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status != TASK_STATUS_IN_PROGRESS
    }
}

/// Response of `show-task`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCollection {
    /// Tasks matching the requested ID.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Response of `discard`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscardResult {
    /// Server message.
    #[serde(default)]
    pub message: String,
    /// Number of pending changes dropped.
    #[serde(default, rename = "number-of-discarded-changes")]
    pub discarded: u64,
}

/// Response of `logout`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitResult {
    /// Server message.
    #[serde(default)]
    pub message: String,
}

/// Response carrying only a message, e.g. `delete-host`.
pub type MessageResult = ExitResult;
