// ABOUTME: Single-host session lifecycle over an abstract transport.
// ABOUTME: Exposes RemoteSession, its error taxonomy and the transport traits.

mod error;
mod remote;
pub mod transport;

pub use error::{ConnectStage, ErrorKind, ExecStage, SessionError, TransferStep};
pub(crate) use error::AbortedSnafu;
pub use remote::RemoteSession;
pub use transport::{Connector, FileChannel, ShellChannel, Transport};
