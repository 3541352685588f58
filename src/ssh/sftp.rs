// ABOUTME: SFTP sub-channel over a russh session channel.
// ABOUTME: File open/create, recursive mkdir and working directory lookup.

use super::error::{Error, Result};
use crate::session::FileChannel;
use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::fs::File;
use russh_sftp::protocol::{OpenFlags, StatusCode};

/// File-transfer channel negotiated on an SSH session.
pub struct SftpChannel {
    sftp: SftpSession,
}

impl std::fmt::Debug for SftpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpChannel").finish_non_exhaustive()
    }
}

impl SftpChannel {
    pub fn new(sftp: SftpSession) -> Self {
        Self { sftp }
    }
}

#[async_trait]
impl FileChannel for SftpChannel {
    type Reader = File;
    type Writer = File;

    async fn open(&self, path: &str) -> Result<File> {
        Ok(self.sftp.open_with_flags(path, OpenFlags::READ).await?)
    }

    async fn create(&self, path: &str) -> Result<File> {
        let flags = OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE | OpenFlags::READ;
        Ok(self.sftp.open_with_flags(path, flags).await?)
    }

    async fn mkdir_all(&self, path: &str) -> Result<()> {
        for dir in ancestors(path) {
            if self.sftp.try_exists(&dir).await? {
                if !self.sftp.metadata(&dir).await?.is_dir() {
                    return Err(Error::NotADirectory(dir));
                }
                continue;
            }
            tracing::debug!("creating remote directory {}", dir);
            self.sftp.create_dir(&dir).await?;
        }
        Ok(())
    }

    async fn working_dir(&self) -> Result<String> {
        Ok(self.sftp.canonicalize(".").await?)
    }

    async fn close(&self) -> Result<()> {
        match self.sftp.close().await {
            Ok(()) => Ok(()),
            Err(SftpError::Status(status)) if matches!(status.status_code, StatusCode::Eof) => {
                Err(Error::Eof)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Every directory from the top of `path` down to `path` itself.
fn ancestors(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut current = String::new();
    let mut dirs = Vec::new();
    for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        dirs.push(current.clone());
    }
    dirs
}
