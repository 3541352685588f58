// ABOUTME: Command dispatch for the sshctl CLI.
// ABOUTME: Merges inventory and flags into Parameters, then runs the chosen operation.

mod shell;
mod transfer;

use crate::cli::{Commands, ConnectionArgs};
use sshctl::config::{Inventory, Mode, Parameters};
use sshctl::error::Result;
use sshctl::executor::Operation;
use sshctl::output::Output;
use sshctl::ssh::SshConnector;
use std::sync::Arc;

pub use shell::shell;
pub use transfer::{get, put};

/// Run one subcommand.
pub async fn run(command: Commands, connection: ConnectionArgs, output: Arc<Output>) -> Result<()> {
    match command {
        Commands::Version => {
            println!("{}", version_line());
            Ok(())
        }
        Commands::Get { remote, local } => get(connection, remote, local, output).await,
        Commands::Put { local, remote } => put(connection, local, remote, output).await,
        Commands::Sh { command, file } => shell(connection, command, file, output).await,
    }
}

pub fn version_line() -> String {
    format!(
        "sshctl version v{} {}/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Build parameters from the inventory (if any) with flags layered on top.
///
/// Mode precedence: flag, then inventory, then the operation's default.
pub fn parameters(connection: ConnectionArgs, operation: &Operation) -> Result<Parameters> {
    let (mut params, inventory_mode) = match &connection.inventory {
        Some(path) => {
            let inventory = Inventory::load(path)?;
            let mode = inventory.mode;
            (inventory.into_parameters()?, mode)
        }
        None => (Parameters::default(), None),
    };

    if let Some(username) = connection.username {
        params.username = username;
    }
    if let Some(password) = connection.password {
        params.password = password;
    }
    if !connection.remote.is_empty() {
        params.hosts = connection.remote;
    }
    if let Some(port) = connection.port {
        params.port = port;
    }
    if let Some(timeout) = connection.timeout {
        params.timeout_secs = timeout;
    }
    params.mode = connection
        .mode
        .map(Mode::from)
        .or(inventory_mode)
        .unwrap_or_else(|| operation.default_mode());

    tracing::debug!(
        hosts = params.hosts.len(),
        user = %params.username,
        port = params.port,
        mode = %params.mode,
        "resolved parameters"
    );
    Ok(params)
}

/// Validate, connect and run `operation` over SSH.
async fn execute(
    connection: ConnectionArgs,
    operation: Operation,
    output: Arc<Output>,
) -> Result<()> {
    let params = parameters(connection, &operation)?;
    let kind = operation.kind();
    sshctl::executor::run_fan_out(
        Arc::new(SshConnector::new()),
        &params,
        operation,
        Arc::clone(&output),
    )
    .await?;
    output.success(&format!("{} finished on {} host(s)", kind, params.hosts.len()));
    Ok(())
}
