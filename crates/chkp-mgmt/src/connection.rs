//! Unauthenticated entry point to a management server.

use crate::models::{LoginRequest, LoginResponse, ManagedObject, TaskId};
use crate::session::Session;
use crate::task::{Clock, PollSettings, TokioClock};
use crate::transport::Transport;
use crate::Result;
use chkp_core::client::ClientConfig;
use chkp_core::{Error, ManagementConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Builder for [`Connection`].
#[derive(Clone)]
pub struct ConnectionBuilder {
    config: ManagementConfig,
    http_config: ClientConfig,
    clock: Arc<dyn Clock>,
    poll: PollSettings,
}

impl ConnectionBuilder {
    /// Create a builder for the given server configuration.
    #[must_use]
    pub fn new(config: ManagementConfig) -> Self {
        Self {
            config,
            http_config: ClientConfig::new(),
            clock: Arc::new(TokioClock),
            poll: PollSettings::new(),
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, http_config: ClientConfig) -> Self {
        self.http_config = http_config;
        self
    }

    /// Override the clock handed to every session.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the task polling settings handed to every session.
    #[must_use]
    pub const fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Build the connection.
    pub fn build(self) -> Result<Connection> {
        let transport = Transport::new(&self.config, &self.http_config)?;
        debug!(base_url = %transport.base_url(), "Created management API connection");

        Ok(Connection {
            transport: Arc::new(transport),
            session_id: None,
            clock: self.clock,
            poll: self.poll,
        })
    }
}

/// Connection to one management server.
///
/// Holds the shared transport that every [`Session`] created from it uses. A connection may
/// also carry a session token of its own for [`fetch_object`](Self::fetch_object) and
/// [`call_task`](Self::call_task).
#[derive(Clone)]
pub struct Connection {
    transport: Arc<Transport>,
    session_id: Option<String>,
    clock: Arc<dyn Clock>,
    poll: PollSettings,
}

impl Connection {
    /// Construct a connection with default HTTP settings.
    pub fn new(config: ManagementConfig) -> Result<Self> {
        ConnectionBuilder::new(config).build()
    }

    /// Start a builder for the given configuration.
    #[must_use]
    pub fn builder(config: ManagementConfig) -> ConnectionBuilder {
        ConnectionBuilder::new(config)
    }

    /// Return the shared transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Log in and open a new session.
    ///
    /// API key login is not supported: a non-empty `api_key` fails with
    /// [`Error::NotImplemented`] before anything is sent.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        api_key: Option<&str>,
    ) -> Result<Session> {
        if api_key.is_some_and(|key| !key.is_empty()) {
            return Err(Error::NotImplemented(
                "API key login is not supported".to_string(),
            ));
        }

        let request = LoginRequest {
            user: username,
            password: password.expose_secret(),
        };

        let response: LoginResponse = self.transport.execute("login", &request, None).await?;
        info!(
            user = %username,
            api_version = %response.api_server_version,
            read_only = response.read_only,
            "Logged in to management server"
        );

        Ok(Session::new(
            response.sid.clone(),
            Some(response),
            Arc::clone(&self.transport),
            Arc::clone(&self.clock),
            self.poll,
        ))
    }

    /// Log in with a username and password.
    pub async fn login_with_password(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Session> {
        self.login(username, password, None).await
    }

    /// Attach to an existing session token without logging in.
    #[must_use]
    pub fn resume(&self, session_id: impl Into<String>) -> Session {
        Session::new(
            session_id.into(),
            None,
            Arc::clone(&self.transport),
            Arc::clone(&self.clock),
            self.poll,
        )
    }

    /// Returns true if a session token is stored on the connection.
    #[must_use]
    pub fn has_session_id(&self) -> bool {
        self.session_id.as_deref().is_some_and(|sid| !sid.is_empty())
    }

    /// The stored session token.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|sid| !sid.is_empty())
    }

    /// Store a session token on the connection.
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// Forget the stored session token.
    pub fn clear_session_id(&mut self) {
        self.session_id = None;
    }

    /// Run an object-returning action with the connection's own session token.
    ///
    /// An empty success body yields `None`. Without a stored token this fails with
    /// [`Error::NoSession`] and nothing is sent.
    pub async fn fetch_object<P>(&self, action: &str, payload: &P) -> Result<Option<ManagedObject>>
    where
        P: Serialize + ?Sized,
    {
        let sid = self.session_id().ok_or(Error::NoSession)?;
        let body = self.transport.execute_text(action, payload, Some(sid)).await?;

        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body).map(Some).map_err(|err| {
            Error::ParseError(format!("can not parse object response: {err}"))
        })
    }

    /// Start a task-producing action with the connection's own session token.
    pub async fn call_task<P>(&self, action: &str, payload: &P) -> Result<TaskId>
    where
        P: Serialize + ?Sized,
    {
        let sid = self.session_id().ok_or(Error::NoSession)?;
        self.transport.execute(action, payload, Some(sid)).await
    }
}
