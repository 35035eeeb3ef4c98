//! HTTP transport for Web API actions.
//!
//! Every action is a JSON `POST` to `<base>/web_api/<action>`. Authenticated calls carry the
//! session token in the `X-chkp-sid` header.

use crate::failure::parse_failure;
use crate::Result;
use chkp_core::client::{ClientConfig, SESSION_HEADER};
use chkp_core::{Error, ManagementConfig};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("chkp-mgmt/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP transport bound to one management server.
///
/// Cloning is cheap and clones share the connection pool, so a single transport can serve
/// many sessions concurrently.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    base_url: Url,
}

impl Transport {
    /// Build the transport from a server configuration.
    ///
    /// The request timeout applies to every call made through this transport.
    pub fn new(config: &ManagementConfig, http_config: &ClientConfig) -> Result<Self> {
        let base_url = config.api_url()?;

        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .connect_timeout(http_config.connect_timeout)
            .pool_idle_timeout(http_config.pool_idle_timeout)
            .pool_max_idle_per_host(http_config.pool_max_idle_per_host);

        if !config.tls_verify {
            warn!(host = %config.host, "TLS verification disabled for management API client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_cert) = &config.tls_ca_cert {
            debug!("loading management CA certificate from {}", ca_cert.display());
            let bytes = std::fs::read(ca_cert).map_err(|err| {
                Error::ConfigError(format!(
                    "Failed to read CA certificate {}: {err}",
                    ca_cert.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&bytes)
                .map_err(|err| Error::ConfigError(format!("Invalid CA certificate: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build management HTTP client: {err}"))
        })?;

        Ok(Self { http, base_url })
    }

    /// Return the Web API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve the URL of an action.
    pub fn action_url(&self, action: &str) -> Result<Url> {
        self.base_url.join(action).map_err(|err| {
            Error::InvalidEndpoint(format!("Invalid management API action `{action}`: {err}"))
        })
    }

    /// Issue a raw JSON `POST`, attaching the session header when a token is given.
    pub async fn send(&self, url: Url, body: Vec<u8>, session_id: Option<&str>) -> Result<Response> {
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        if let Some(sid) = session_id {
            request = request.header(SESSION_HEADER, sid);
        }

        request.send().await.map_err(Error::from)
    }

    /// Run an action and return the raw success body.
    ///
    /// Non-200 responses are decoded as failure payloads and classified.
    pub async fn execute_text<B>(
        &self,
        action: &str,
        body: &B,
        session_id: Option<&str>,
    ) -> Result<String>
    where
        B: Serialize + ?Sized,
    {
        let url = self.action_url(action)?;
        let payload = serde_json::to_vec(body)?;

        debug!(action = %action, authenticated = session_id.is_some(), "Sending management API request");

        let response = self.send(url, payload, session_id).await?;
        let status = response.status();
        let text = response.text().await.map_err(Error::from)?;

        if status != StatusCode::OK {
            let error = parse_failure(&text, status.as_u16());
            debug!(action = %action, %status, code = error.error_code(), "Management API request failed");
            return Err(error);
        }

        Ok(text)
    }

    /// Run an action and decode the success body into `R`.
    pub async fn execute<B, R>(&self, action: &str, body: &B, session_id: Option<&str>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let text = self.execute_text(action, body, session_id).await?;

        serde_json::from_str(&text).map_err(|err| {
            Error::ParseError(format!("can not parse `{action}` response: {err}"))
        })
    }
}
