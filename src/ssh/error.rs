// ABOUTME: SSH transport error types.
// ABOUTME: Covers dial, authentication, channel, SFTP and remote command failures.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("invalid host entry: {0}")]
    InvalidAddress(String),

    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("authentication failed for user {0}")]
    AuthenticationFailed(String),

    #[error("failed to open channel: {0}")]
    ChannelOpen(String),

    #[error("remote command exited with status {0}")]
    ExitStatus(u32),

    #[error("remote command killed by signal {0}")]
    ExitSignal(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(Duration),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("end of stream")]
    Eof,

    #[error("SFTP error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// End-of-stream seen while shutting down a channel that is already closing.
    pub fn is_eof(&self) -> bool {
        match self {
            Error::Eof => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_variants_are_recognised() {
        assert!(Error::Eof.is_eof());
        assert!(Error::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)).is_eof());
    }

    #[test]
    fn other_errors_are_not_eof() {
        assert!(!Error::ChannelClosed.is_eof());
        assert!(!Error::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_eof());
        assert!(!Error::Connection("refused".to_string()).is_eof());
    }
}
