// ABOUTME: russh-based transport for remote sessions.
// ABOUTME: Password authentication, SFTP sub-channel and shell execution.

mod client;
mod error;
mod sftp;
mod shell;

pub use client::{Session, SessionConfig, SshConnector};
pub use error::{Error, Result};
pub use sftp::SftpChannel;
pub use shell::Shell;
