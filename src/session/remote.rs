// ABOUTME: One authenticated connection plus its SFTP sub-channel.
// ABOUTME: Upload, download, shell execution and the closing handshake for a single host.

use super::error::{
    CloseSnafu, ConnectStage, ConnectSnafu, ExecSnafu, ExecStage, SessionError, TransferSnafu,
    TransferStep,
};
use super::transport::{Connector, FileChannel, ShellChannel, Transport};
use crate::config::{Credentials, Target};
use crate::ssh;
use snafu::ResultExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// An open session to one target.
///
/// A session serves at most one operation: [`RemoteSession::close`] consumes it.
pub struct RemoteSession<T: Transport> {
    target: Target,
    transport: T,
    files: T::Files,
    timeout: Option<Duration>,
}

impl<T: Transport> std::fmt::Debug for RemoteSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("target", &self.target)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> RemoteSession<T> {
    /// Connect to `target` and negotiate the SFTP sub-channel.
    ///
    /// If the sub-channel cannot be negotiated the transport is closed before
    /// the error is returned.
    pub async fn open<C>(
        connector: &C,
        target: &Target,
        credentials: &Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self, SessionError>
    where
        C: Connector<Transport = T> + ?Sized,
    {
        tracing::debug!(host = %target, user = credentials.username(), "connecting");
        let transport = connector
            .dial(target, credentials, timeout)
            .await
            .context(ConnectSnafu {
                stage: ConnectStage::Dial,
            })?;

        let files = match transport.open_files().await {
            Ok(files) => files,
            Err(source) => {
                if let Err(e) = transport.close().await {
                    tracing::warn!(host = %target, "failed to release transport: {}", e);
                }
                return Err(source).context(ConnectSnafu {
                    stage: ConnectStage::Channel,
                });
            }
        };

        Ok(Self {
            target: target.clone(),
            transport,
            files,
            timeout,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Copy a local file to `remote`, creating missing remote directories.
    pub async fn upload(&self, local: &Path, remote: &str) -> Result<(), SessionError> {
        let mut source = tokio::fs::File::open(local)
            .await
            .map_err(ssh::Error::Io)
            .context(TransferSnafu {
                step: TransferStep::LocalOpen,
                path: local.display().to_string(),
            })?;

        // An unknown working directory leaves relative paths relative.
        let cwd = self.files.working_dir().await.unwrap_or_else(|e| {
            tracing::debug!(host = %self.target, "working directory unavailable: {}", e);
            String::new()
        });
        if let Some(dir) = remote_parent_dir(&cwd, remote) {
            self.files.mkdir_all(&dir).await.context(TransferSnafu {
                step: TransferStep::RemoteMkdir,
                path: dir.as_str(),
            })?;
        }

        let mut dest = self.files.create(remote).await.context(TransferSnafu {
            step: TransferStep::RemoteCreate,
            path: remote,
        })?;

        let copied = copy_all(&mut source, &mut dest)
            .await
            .context(TransferSnafu {
                step: TransferStep::Copy,
                path: remote,
            })?;
        tracing::debug!(host = %self.target, bytes = copied, "uploaded {}", remote);
        Ok(())
    }

    /// Copy `remote` to a local file, creating missing local directories.
    pub async fn download(&self, remote: &str, local: &Path) -> Result<(), SessionError> {
        let mut source = self.files.open(remote).await.context(TransferSnafu {
            step: TransferStep::RemoteOpen,
            path: remote,
        })?;

        let local_display = local.display().to_string();
        let absolute = std::env::current_dir()
            .map_err(ssh::Error::Io)
            .context(TransferSnafu {
                step: TransferStep::LocalMkdir,
                path: local_display.as_str(),
            })?
            .join(local);
        if let Some(dir) = absolute.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(ssh::Error::Io)
                .context(TransferSnafu {
                    step: TransferStep::LocalMkdir,
                    path: dir.display().to_string(),
                })?;
        }

        let mut dest = tokio::fs::File::create(local)
            .await
            .map_err(ssh::Error::Io)
            .context(TransferSnafu {
                step: TransferStep::LocalCreate,
                path: local_display.as_str(),
            })?;

        let copied = copy_all(&mut source, &mut dest)
            .await
            .context(TransferSnafu {
                step: TransferStep::Copy,
                path: local_display.as_str(),
            })?;
        tracing::debug!(host = %self.target, bytes = copied, "downloaded {}", remote);
        Ok(())
    }

    /// Run `input` through a remote shell, forwarding its stdout into `stdout`.
    pub async fn run_shell(
        &self,
        input: &[u8],
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), SessionError> {
        let mut shell = self.transport.open_shell().await.context(ExecSnafu {
            stage: ExecStage::Open,
        })?;

        let result = match self.timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, drive_shell(&mut shell, input, stdout)).await {
                    Ok(result) => result,
                    Err(_) => Err(ssh::Error::CommandTimeout(limit)).context(ExecSnafu {
                        stage: ExecStage::Wait,
                    }),
                }
            }
            None => drive_shell(&mut shell, input, stdout).await,
        };

        if let Err(e) = shell.close().await {
            tracing::debug!(host = %self.target, "shell channel close: {}", e);
        }
        result
    }

    /// Close the SFTP sub-channel and then the transport.
    ///
    /// End-of-stream from a channel that is already shutting down is not an error.
    pub async fn close(self) -> Result<(), SessionError> {
        let files = suppress_eof(self.files.close().await);
        let transport = suppress_eof(self.transport.close().await);

        match (files, transport) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e).context(CloseSnafu),
            (Err(first), Err(second)) => {
                tracing::warn!(host = %self.target, "transport close also failed: {}", second);
                Err(first).context(CloseSnafu)
            }
        }
    }
}

async fn drive_shell<S: ShellChannel>(
    shell: &mut S,
    input: &[u8],
    stdout: &mut (dyn AsyncWrite + Send + Unpin),
) -> Result<(), SessionError> {
    shell.start(input).await.context(ExecSnafu {
        stage: ExecStage::Start,
    })?;
    shell.wait(stdout).await.context(ExecSnafu {
        stage: ExecStage::Wait,
    })?;
    stdout
        .flush()
        .await
        .map_err(ssh::Error::Io)
        .context(ExecSnafu {
            stage: ExecStage::Wait,
        })
}

async fn copy_all<R, W>(reader: &mut R, writer: &mut W) -> ssh::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let copied = tokio::io::copy(reader, writer).await?;
    writer.shutdown().await?;
    Ok(copied)
}

fn suppress_eof(result: ssh::Result<()>) -> ssh::Result<()> {
    match result {
        Err(e) if e.is_eof() => Ok(()),
        other => other,
    }
}

/// Parent directory of `remote` on the server, resolved against `cwd`.
///
/// Returns `None` when there is nothing to create (no parent, or the root).
fn remote_parent_dir(cwd: &str, remote: &str) -> Option<String> {
    let joined = if remote.starts_with('/') || cwd.is_empty() {
        remote.to_string()
    } else {
        format!("{}/{}", cwd.trim_end_matches('/'), remote)
    };

    let trimmed = joined.trim_end_matches('/');
    let (parent, _) = trimmed.rsplit_once('/')?;
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() || parent == "." {
        None
    } else {
        Some(parent.to_string())
    }
}
