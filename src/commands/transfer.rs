// ABOUTME: get and put command implementations.
// ABOUTME: One file copied between this machine and every host.

use super::execute;
use crate::cli::ConnectionArgs;
use sshctl::error::Result;
use sshctl::executor::Operation;
use sshctl::output::Output;
use std::path::PathBuf;
use std::sync::Arc;

/// Download `remote` from every host into `local`.
pub async fn get(
    connection: ConnectionArgs,
    remote: String,
    local: PathBuf,
    output: Arc<Output>,
) -> Result<()> {
    execute(connection, Operation::Get { remote, local }, output).await
}

/// Upload `local` to `remote` on every host.
pub async fn put(
    connection: ConnectionArgs,
    local: PathBuf,
    remote: String,
    output: Arc<Output>,
) -> Result<()> {
    execute(connection, Operation::Put { local, remote }, output).await
}
