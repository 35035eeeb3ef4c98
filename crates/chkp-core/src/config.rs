//! Configuration for reaching a management server.
//!
//! Every tunable is passed explicitly at construction time; nothing is read from the
//! environment.

use crate::client::{API_PATH, MGMT_DEFAULT_TIMEOUT};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

/// Connection parameters for one management server.
///
/// TLS certificate verification is enabled by default. Management appliances commonly
/// present self-signed certificates; [`ManagementConfig::insecure`] turns verification off
/// for those deployments and is logged whenever a client is built from such a config.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ManagementConfig {
    /// Management server host name or address
    #[validate(length(min = 1))]
    pub host: String,

    /// Management server port
    #[validate(range(min = 1))]
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL scheme, `https` unless talking to a plain HTTP endpoint
    #[validate(custom(function = "validate_scheme"))]
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to custom CA certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,
}

const fn default_port() -> u16 {
    443
}

fn default_scheme() -> String {
    "https".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    MGMT_DEFAULT_TIMEOUT
}

const fn default_tls_verify() -> bool {
    true
}

fn validate_scheme(scheme: &str) -> Result<(), ValidationError> {
    match scheme {
        "https" | "http" => Ok(()),
        _ => Err(ValidationError::new("unsupported_scheme")),
    }
}

impl ManagementConfig {
    /// Create a configuration for `host` with default port, scheme and timeout.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            scheme: default_scheme(),
            request_timeout_secs: default_request_timeout_secs(),
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the URL scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Trust any server certificate.
    ///
    /// Compatibility mode for appliances with self-signed certificates. Any party able to
    /// intercept the connection can then read credentials and session tokens.
    #[must_use]
    pub const fn insecure(self) -> Self {
        self.with_tls_verify(false)
    }

    /// Set custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration and build the Web API base URL,
    /// `<scheme>://<host>:<port>/web_api/`.
    ///
    /// IPv6 literals may be given with or without brackets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if validation fails or the URL cannot be parsed.
    pub fn api_url(&self) -> Result<Url, Error> {
        self.validate()?;

        let host = match self.host.parse::<Ipv6Addr>() {
            Ok(addr) => format!("[{addr}]"),
            Err(_) => self.host.clone(),
        };
        let raw = format!("{}://{host}:{}/{API_PATH}", self.scheme, self.port);
        Url::parse(&raw).map_err(|e| Error::ConfigError(format!("Invalid management URL: {e}")))
    }
}
