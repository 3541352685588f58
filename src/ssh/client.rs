// ABOUTME: SSH session management using russh.
// ABOUTME: Password authentication, keepalive and channel opening for one host.

use super::error::{Error, Result};
use super::sftp::SftpChannel;
use super::shell::Shell;
use crate::config::{Credentials, Target};
use crate::session::{Connector, Transport};
use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::keys::ssh_key;
use russh::{Channel, Disconnect};
use russh_sftp::client::SftpSession;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Bound on dial, handshake and authentication together.
    pub connect_timeout: Option<Duration>,
    /// Interval between keepalive requests.
    pub keepalive_interval: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            connect_timeout: None,
            keepalive_interval: Duration::from_secs(30),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }
}

impl From<&Target> for SessionConfig {
    fn from(target: &Target) -> Self {
        SessionConfig::new(target.host()).port(target.port())
    }
}

/// SSH client handler for russh.
///
/// Every host key is accepted. The key's algorithm is logged at debug level.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        tracing::debug!(
            host = %self.host,
            port = self.port,
            algorithm = %server_public_key.algorithm(),
            "accepting host key without verification"
        );
        Ok(true)
    }
}

/// An established, authenticated SSH session.
pub struct Session {
    config: SessionConfig,
    handle: Arc<Handle<SshHandler>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Session {
    /// Connect and authenticate with `credentials`, within the configured timeout.
    pub async fn connect(config: SessionConfig, credentials: &Credentials) -> Result<Self> {
        let handle = match config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, Self::connect_inner(&config, credentials))
                .await
                .map_err(|_| Error::ConnectTimeout(limit))??,
            None => Self::connect_inner(&config, credentials).await?,
        };
        Ok(Self::from_handle(config, handle))
    }

    fn from_handle(config: SessionConfig, handle: Handle<SshHandler>) -> Self {
        Self {
            config,
            handle: Arc::new(handle),
        }
    }

    async fn connect_inner(
        config: &SessionConfig,
        credentials: &Credentials,
    ) -> Result<Handle<SshHandler>> {
        let russh_config = Config {
            keepalive_interval: Some(config.keepalive_interval),
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
        };

        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        )
        .await
        .map_err(|e| {
            if e.to_string().contains("Connection refused") {
                Error::Connection(format!(
                    "connection refused to {}:{}",
                    config.host, config.port
                ))
            } else {
                Error::Connection(e.to_string())
            }
        })?;

        let auth = handle
            .authenticate_password(credentials.username(), credentials.password())
            .await
            .map_err(Error::Protocol)?;
        if !auth.success() {
            return Err(Error::AuthenticationFailed(
                credentials.username().to_string(),
            ));
        }

        tracing::debug!(host = %config.host, port = config.port, "authenticated");
        Ok(handle)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn open_channel(&self) -> Result<Channel<client::Msg>> {
        self.handle
            .channel_open_session()
            .await
            .map_err(|e| Error::ChannelOpen(e.to_string()))
    }

    /// Disconnect the session.
    pub async fn disconnect(&self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)
    }
}

#[async_trait]
impl Transport for Session {
    type Files = SftpChannel;
    type Shell = Shell;

    async fn open_files(&self) -> Result<SftpChannel> {
        let channel = self.open_channel().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;
        Ok(SftpChannel::new(sftp))
    }

    async fn open_shell(&self) -> Result<Shell> {
        Ok(Shell::new(self.open_channel().await?))
    }

    async fn close(&self) -> Result<()> {
        self.disconnect().await
    }
}

/// Opens russh sessions with password authentication.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    keepalive_interval: Option<Duration>,
}

impl SshConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = Some(interval);
        self
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Transport = Session;

    async fn dial(
        &self,
        target: &Target,
        credentials: &Credentials,
        timeout: Option<Duration>,
    ) -> Result<Session> {
        let mut config = SessionConfig::from(target).connect_timeout(timeout);
        if let Some(interval) = self.keepalive_interval {
            config = config.keepalive_interval(interval);
        }
        Session::connect(config, credentials).await
    }
}
