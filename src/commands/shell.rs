// ABOUTME: sh command implementation.
// ABOUTME: Reads the script once and feeds it to a shell on every host.

use super::execute;
use crate::cli::ConnectionArgs;
use sshctl::error::Result;
use sshctl::executor::Operation;
use sshctl::output::Output;
use sshctl::script::ScriptSource;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn shell(
    connection: ConnectionArgs,
    command: Option<String>,
    file: Option<PathBuf>,
    output: Arc<Output>,
) -> Result<()> {
    let source = ScriptSource::from_flags(command, file)?;
    let script = source.read().await?;
    tracing::debug!(bytes = script.len(), "script loaded");
    execute(connection, Operation::Shell { script }, output).await
}
