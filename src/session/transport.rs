// ABOUTME: Capability traits for the remote transport a session is built on.
// ABOUTME: Defines Connector, Transport, FileChannel and ShellChannel.

use crate::config::{Credentials, Target};
use crate::ssh::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Opens authenticated transports to targets.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    /// Dial, handshake and authenticate by password, bounded by `timeout` when set.
    async fn dial(
        &self,
        target: &Target,
        credentials: &Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self::Transport>;
}

/// One live, authenticated connection to one host.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Files: FileChannel;
    type Shell: ShellChannel;

    /// Negotiate the file-transfer sub-channel.
    async fn open_files(&self) -> Result<Self::Files>;

    /// Open a fresh channel for one shell invocation.
    async fn open_shell(&self) -> Result<Self::Shell>;

    async fn close(&self) -> Result<()>;
}

/// File-transfer sub-channel.
#[async_trait]
pub trait FileChannel: Send + Sync + 'static {
    type Reader: AsyncRead + Send + Unpin;
    type Writer: AsyncWrite + Send + Unpin;

    /// Open an existing remote file for reading.
    async fn open(&self, path: &str) -> Result<Self::Reader>;

    /// Create or truncate a remote file for writing.
    async fn create(&self, path: &str) -> Result<Self::Writer>;

    /// Create `path` and every missing parent.
    async fn mkdir_all(&self, path: &str) -> Result<()>;

    async fn working_dir(&self) -> Result<String>;

    async fn close(&self) -> Result<()>;
}

/// A remote shell fed from a byte buffer.
#[async_trait]
pub trait ShellChannel: Send {
    /// Start the shell and send `input` followed by end-of-input.
    async fn start(&mut self, input: &[u8]) -> Result<()>;

    /// Forward remote stdout into `stdout` until the remote side terminates.
    ///
    /// Fails when the command exits non-zero, is killed by a signal, or the
    /// channel closes without reporting an exit status.
    async fn wait(&mut self, stdout: &mut (dyn AsyncWrite + Send + Unpin)) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}
