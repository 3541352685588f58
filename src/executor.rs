// ABOUTME: Runs one operation against every session of a pool and closes each one.
// ABOUTME: Parallel and sequential dispatch; all failures land in one aggregate.

use crate::aggregate::{ErrorAggregator, HostError};
use crate::config::{Mode, Parameters, Target};
use crate::output::{HostReport, Output};
use crate::pool::SessionPool;
use crate::session::{AbortedSnafu, Connector, RemoteSession, SessionError, Transport};
use bytes::Bytes;
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWrite;

/// Placeholder in local paths replaced by the target's host name.
pub const HOST_PLACEHOLDER: &str = "{host}";

/// The single logical operation applied to every host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Download `remote` from each host into `local`.
    Get { remote: String, local: PathBuf },
    /// Upload `local` to `remote` on each host.
    Put { local: PathBuf, remote: String },
    /// Feed `script` to a shell on each host.
    Shell { script: Bytes },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Get,
    Put,
    Shell,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Get => f.write_str("get"),
            OperationKind::Put => f.write_str("put"),
            OperationKind::Shell => f.write_str("shell"),
        }
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Get { .. } => OperationKind::Get,
            Operation::Put { .. } => OperationKind::Put,
            Operation::Shell { .. } => OperationKind::Shell,
        }
    }

    /// What the operation acts on, for reports.
    pub fn subject(&self) -> String {
        match self {
            Operation::Get { remote, .. } | Operation::Put { remote, .. } => remote.clone(),
            Operation::Shell { script } => format!("script ({} bytes)", script.len()),
        }
    }

    /// Default dispatch mode when none was chosen explicitly.
    ///
    /// Shell output goes straight to the terminal, so scripts run one host at
    /// a time to keep their output apart.
    pub fn default_mode(&self) -> Mode {
        match self {
            Operation::Shell { .. } => Mode::Sequential,
            Operation::Get { .. } | Operation::Put { .. } => Mode::Parallel,
        }
    }

    /// The operation as it applies to `target`, with local paths expanded.
    pub fn for_target(&self, target: &Target) -> Operation {
        match self {
            Operation::Get { remote, local } => Operation::Get {
                remote: remote.clone(),
                local: expand_host(local, target),
            },
            Operation::Put { local, remote } => Operation::Put {
                local: expand_host(local, target),
                remote: remote.clone(),
            },
            Operation::Shell { script } => Operation::Shell {
                script: script.clone(),
            },
        }
    }

    /// True for a download whose local path does not name the host, so every
    /// host writes the same local file.
    pub fn writes_shared_local_path(&self) -> bool {
        match self {
            Operation::Get { local, .. } => !local
                .to_str()
                .is_some_and(|s| s.contains(HOST_PLACEHOLDER)),
            Operation::Put { .. } | Operation::Shell { .. } => false,
        }
    }
}

fn expand_host(path: &Path, target: &Target) -> PathBuf {
    match path.to_str() {
        Some(s) if s.contains(HOST_PLACEHOLDER) => {
            PathBuf::from(s.replace(HOST_PLACEHOLDER, target.host()))
        }
        _ => path.to_path_buf(),
    }
}

/// Produces the stdout sink for one host's shell.
pub type ShellOutput = Arc<dyn Fn(&Target) -> Box<dyn AsyncWrite + Send + Unpin> + Send + Sync>;

fn process_stdout() -> ShellOutput {
    Arc::new(|_: &Target| Box::new(tokio::io::stdout()) as Box<dyn AsyncWrite + Send + Unpin>)
}

/// Dispatches an operation across a pool.
pub struct FanOutExecutor {
    output: Arc<Output>,
    shell_output: ShellOutput,
}

impl FanOutExecutor {
    pub fn new(output: Arc<Output>) -> Self {
        Self {
            output,
            shell_output: process_stdout(),
        }
    }

    /// Replace the default shell sink (the process's stdout).
    pub fn with_shell_output(mut self, shell_output: ShellOutput) -> Self {
        self.shell_output = shell_output;
        self
    }

    /// Validate, connect, run and close; connect and run errors share one aggregate.
    pub async fn invoke<C: Connector>(
        &self,
        connector: Arc<C>,
        params: &Parameters,
        operation: Operation,
    ) -> crate::error::Result<()> {
        let config = params.validate()?;
        let (pool, mut errors) = SessionPool::build(connector, &config).await;
        errors.merge(self.run(pool, operation).await);
        errors.resolve()?;
        Ok(())
    }

    /// Run `operation` on every session of `pool`, closing each one afterwards.
    ///
    /// Errors are ordered by the pool's session order, regardless of which
    /// session finished first. An empty pool is a no-op.
    pub async fn run<T: Transport>(
        &self,
        pool: SessionPool<T>,
        operation: Operation,
    ) -> ErrorAggregator {
        let mode = pool.mode();
        let sessions = pool.into_sessions();
        if sessions.is_empty() {
            tracing::debug!("no sessions to run {} on", operation.kind());
            return ErrorAggregator::new();
        }

        tracing::debug!(
            sessions = sessions.len(),
            %mode,
            operation = %operation.kind(),
            "dispatching"
        );
        if sessions.len() > 1 && operation.writes_shared_local_path() {
            tracing::warn!(
                "every host downloads to the same local path; add {} to keep them apart",
                HOST_PLACEHOLDER
            );
        }
        match mode {
            Mode::Parallel => self.run_parallel(sessions, operation).await,
            Mode::Sequential => self.run_sequential(sessions, operation).await,
        }
    }

    async fn run_parallel<T: Transport>(
        &self,
        sessions: Vec<RemoteSession<T>>,
        operation: Operation,
    ) -> ErrorAggregator {
        let operation = Arc::new(operation);
        let handles: Vec<_> = sessions
            .into_iter()
            .map(|session| {
                let target = session.target().clone();
                let operation = Arc::clone(&operation);
                let output = Arc::clone(&self.output);
                let shell_output = Arc::clone(&self.shell_output);
                let handle = tokio::spawn(async move {
                    run_session(session, &operation, &output, &shell_output).await
                });
                (target, handle)
            })
            .collect();

        let (targets, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = futures::future::join_all(handles).await;

        let mut errors = ErrorAggregator::new();
        for (target, result) in targets.into_iter().zip(results) {
            match result {
                Ok(session_errors) => errors.merge(session_errors),
                Err(e) => {
                    tracing::warn!(host = %target, "session task failed: {}", e);
                    let source = AbortedSnafu {
                        message: e.to_string(),
                    }
                    .build();
                    errors.push(HostError::new(target, source));
                }
            }
        }
        errors
    }

    async fn run_sequential<T: Transport>(
        &self,
        sessions: Vec<RemoteSession<T>>,
        operation: Operation,
    ) -> ErrorAggregator {
        let mut errors = ErrorAggregator::new();
        for session in sessions {
            errors.merge(run_session(session, &operation, &self.output, &self.shell_output).await);
        }
        errors
    }
}

/// Validate `params`, connect every host, run `operation` and close every session.
pub async fn run_fan_out<C: Connector>(
    connector: Arc<C>,
    params: &Parameters,
    operation: Operation,
    output: Arc<Output>,
) -> crate::error::Result<()> {
    FanOutExecutor::new(output)
        .invoke(connector, params, operation)
        .await
}

/// Operation then close, unconditionally. Yields zero, one or two errors.
async fn run_session<T: Transport>(
    session: RemoteSession<T>,
    operation: &Operation,
    output: &Output,
    shell_output: &ShellOutput,
) -> ErrorAggregator {
    let target = session.target().clone();
    let operation = operation.for_target(&target);
    let started_at = Utc::now();
    let start = Instant::now();

    let outcome = AssertUnwindSafe(perform(&session, &operation, shell_output))
        .catch_unwind()
        .await;
    let op_error = match outcome {
        Ok(result) => result.err(),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::warn!(host = %target, "operation panicked: {}", message);
            Some(AbortedSnafu { message }.build())
        }
    };

    let close_error = session.close().await.err();
    let elapsed = start.elapsed();
    let ok = op_error.is_none() && close_error.is_none();
    tracing::info!(
        host = %target,
        operation = %operation.kind(),
        elapsed_ms = elapsed.as_millis() as u64,
        ok,
        "session finished"
    );
    output.host_report(&HostReport {
        host: target.to_string(),
        operation: operation.kind(),
        subject: operation.subject(),
        started_at,
        elapsed,
        ok,
    });

    let mut errors = ErrorAggregator::new();
    errors.append(op_error.map(|e| HostError::new(target.clone(), e)));
    errors.append(close_error.map(|e| HostError::new(target, e)));
    errors
}

async fn perform<T: Transport>(
    session: &RemoteSession<T>,
    operation: &Operation,
    shell_output: &ShellOutput,
) -> Result<(), SessionError> {
    match operation {
        Operation::Get { remote, local } => session.download(remote, local).await,
        Operation::Put { local, remote } => session.upload(local, remote).await,
        Operation::Shell { script } => {
            let mut sink = shell_output(session.target());
            session.run_shell(script, sink.as_mut()).await
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation panicked".to_string()
    }
}
