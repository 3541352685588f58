// ABOUTME: Per-session error types with SNAFU context selectors.
// ABOUTME: Tags every failure with the phase and step it happened in.

use crate::ssh;
use snafu::Snafu;
use std::fmt;

/// Which half of session establishment failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    /// The host entry could not be turned into an address; nothing was dialed.
    Address,
    Dial,
    Channel,
}

impl fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectStage::Address => f.write_str("host address"),
            ConnectStage::Dial => f.write_str("ssh dial"),
            ConnectStage::Channel => f.write_str("sftp channel negotiation"),
        }
    }
}

/// Step of an upload or download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    LocalOpen,
    LocalMkdir,
    LocalCreate,
    RemoteOpen,
    RemoteMkdir,
    RemoteCreate,
    Copy,
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            TransferStep::LocalOpen => "open local file",
            TransferStep::LocalMkdir => "create local directory",
            TransferStep::LocalCreate => "create local file",
            TransferStep::RemoteOpen => "open remote file",
            TransferStep::RemoteMkdir => "create remote directory",
            TransferStep::RemoteCreate => "create remote file",
            TransferStep::Copy => "copy to",
        };
        f.write_str(step)
    }
}

/// Step of a shell execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStage {
    Open,
    Start,
    Wait,
}

impl fmt::Display for ExecStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecStage::Open => f.write_str("open"),
            ExecStage::Start => f.write_str("start"),
            ExecStage::Wait => f.write_str("execution"),
        }
    }
}

/// Failure of one session, tagged with the phase it happened in.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("{stage} failed: {source}"))]
    Connect {
        stage: ConnectStage,
        source: ssh::Error,
    },

    #[snafu(display("{step} {path} failed: {source}"))]
    Transfer {
        step: TransferStep,
        path: String,
        source: ssh::Error,
    },

    #[snafu(display("shell {stage} failed: {source}"))]
    Exec { stage: ExecStage, source: ssh::Error },

    #[snafu(display("close failed: {source}"))]
    Close { source: ssh::Error },

    #[snafu(display("operation aborted: {message}"))]
    Aborted { message: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connect,
    Transfer,
    Exec,
    Close,
    /// The operation panicked or its task was cancelled.
    Aborted,
}

impl SessionError {
    /// Connect failure for a host entry that never reached the dialer.
    pub fn malformed_host(reason: impl Into<String>) -> Self {
        SessionError::Connect {
            stage: ConnectStage::Address,
            source: ssh::Error::InvalidAddress(reason.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Connect { .. } => ErrorKind::Connect,
            SessionError::Transfer { .. } => ErrorKind::Transfer,
            SessionError::Exec { .. } => ErrorKind::Exec,
            SessionError::Close { .. } => ErrorKind::Close,
            SessionError::Aborted { .. } => ErrorKind::Aborted,
        }
    }

    /// The transfer step that failed, for transfer errors.
    pub fn transfer_step(&self) -> Option<TransferStep> {
        match self {
            SessionError::Transfer { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The underlying transport error, when there is one.
    pub fn transport_error(&self) -> Option<&ssh::Error> {
        match self {
            SessionError::Connect { source, .. }
            | SessionError::Transfer { source, .. }
            | SessionError::Exec { source, .. }
            | SessionError::Close { source } => Some(source),
            SessionError::Aborted { .. } => None,
        }
    }
}
