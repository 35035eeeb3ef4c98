//! Session-aware client for the Check Point management Web API.
//!
//! A [`Connection`] logs in and yields a [`Session`]. Mutating calls made through the
//! session stay pending on the server until [`Session::publish`] commits them or
//! [`Session::discard`] drops them. Publishing runs asynchronously on the server and is
//! tracked through a task that the session polls to completion.
//!
//! Nothing is retried. Server failures are classified into [`Error`] kinds such as
//! [`Error::ObjectLocked`] so callers can decide whether to back off with
//! [`Session::wait`] and try again.

#![deny(missing_docs)]

pub mod connection;
pub mod failure;
pub mod models;
pub mod session;
pub mod shared;
pub mod task;
pub mod transport;

pub use chkp_core::{Error, FailureResponse, ManagementConfig};
pub use connection::{Connection, ConnectionBuilder};
pub use models::{
    DiscardResult, ExitResult, LoginResponse, ManagedObject, MessageResult, Task, TaskCollection,
    TaskId,
};
pub use session::Session;
pub use shared::SharedSession;
pub use task::{Clock, PollSettings, TokioClock};
pub use tokio_util::sync::CancellationToken;
pub use transport::Transport;

/// Convenient result alias that reuses the shared error type.
pub type Result<T> = chkp_core::Result<T>;
