//! # chkp-core
//!
//! Core types and utilities for working with the Check Point management Web API.
//!
//! This crate provides the error taxonomy, the structured failure payload returned by the
//! management server, connection configuration, and small helpers shared by client crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and classified server failure kinds
//! - [`types`] - Failure payload returned on non-success responses
//! - [`config`] - Configuration for reaching a management server
//! - [`client`] - HTTP client settings and default constants
//! - [`random`] - Bounded random delays for jittered waiting

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod random;
pub mod types;

// Re-export commonly used types
pub use config::ManagementConfig;
pub use error::{Error, Result};
pub use types::{ErrorObject, FailureResponse};
