// ABOUTME: Connects every target of an invocation and keeps the sessions that opened.
// ABOUTME: Failed targets are left out and their errors handed back to the caller.

use crate::aggregate::{ErrorAggregator, HostError};
use crate::config::{Config, HostEntry, InvalidParameters, MalformedHost, Mode, Parameters, Target};
use crate::session::{AbortedSnafu, Connector, RemoteSession, SessionError, Transport};
use parking_lot::Mutex;
use std::sync::Arc;

/// Sessions for one invocation, one per successfully connected target.
///
/// A pool is torn down by [`FanOutExecutor::run`](crate::FanOutExecutor::run)
/// or [`close_all`](Self::close_all). Dropping it with sessions still open
/// skips their close and logs a warning.
pub struct SessionPool<T: Transport> {
    sessions: Vec<RemoteSession<T>>,
    mode: Mode,
}

impl<T: Transport> std::fmt::Debug for SessionPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("sessions", &self.sessions)
            .field("mode", &self.mode)
            .finish()
    }
}

impl<T: Transport> SessionPool<T> {
    /// Validate `params`, then connect every target.
    ///
    /// No connection is attempted when validation fails.
    pub async fn connect<C>(
        connector: Arc<C>,
        params: &Parameters,
    ) -> Result<(Self, ErrorAggregator), InvalidParameters>
    where
        C: Connector<Transport = T>,
    {
        let config = params.validate()?;
        Ok(Self::build(connector, &config).await)
    }

    /// Attempt one connection per host entry.
    ///
    /// Parallel pools hold sessions in the order the connections completed;
    /// sequential pools follow the host list. A malformed entry fails its own
    /// attempt without dialing.
    pub async fn build<C>(connector: Arc<C>, config: &Config) -> (Self, ErrorAggregator)
    where
        C: Connector<Transport = T>,
    {
        tracing::debug!(
            hosts = config.hosts.len(),
            mode = %config.mode,
            "building session pool"
        );
        let (sessions, errors) = match config.mode {
            Mode::Parallel => build_parallel(connector, config).await,
            Mode::Sequential => build_sequential(connector.as_ref(), config).await,
        };
        tracing::debug!(
            connected = sessions.len(),
            failed = errors.len(),
            "session pool ready"
        );

        let pool = Self {
            sessions,
            mode: config.mode,
        };
        (pool, errors)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.sessions.iter().map(|s| s.target())
    }

    pub fn into_sessions(mut self) -> Vec<RemoteSession<T>> {
        std::mem::take(&mut self.sessions)
    }

    /// Close every session without running an operation.
    pub async fn close_all(self) -> ErrorAggregator {
        let mut errors = ErrorAggregator::new();
        for session in self.into_sessions() {
            let target = session.target().clone();
            if let Err(e) = session.close().await {
                errors.push(HostError::new(target, e));
            }
        }
        errors
    }
}

impl<T: Transport> Drop for SessionPool<T> {
    fn drop(&mut self) {
        if !self.sessions.is_empty() {
            tracing::warn!(
                sessions = self.sessions.len(),
                "session pool dropped without closing its sessions"
            );
        }
    }
}

fn reject(malformed: &MalformedHost) -> HostError {
    tracing::debug!(host = %malformed.target(), "malformed host entry: {}", malformed.reason());
    HostError::new(
        malformed.target().clone(),
        SessionError::malformed_host(malformed.reason()),
    )
}

async fn build_parallel<C: Connector>(
    connector: Arc<C>,
    config: &Config,
) -> (Vec<RemoteSession<C::Transport>>, ErrorAggregator) {
    let sessions = Arc::new(Mutex::new(Vec::with_capacity(config.hosts.len())));
    // Malformed entries fail before any task starts, so they arrive first.
    let mut rejected = ErrorAggregator::new();
    rejected.extend(config.malformed().map(reject));
    let errors = Arc::new(Mutex::new(rejected));

    let handles = config.targets().map(|target| {
        let connector = Arc::clone(&connector);
        let sessions = Arc::clone(&sessions);
        let errors = Arc::clone(&errors);
        let credentials = config.credentials.clone();
        let timeout = config.timeout;
        let target = target.clone();

        async move {
            let task_target = target.clone();
            let task_errors = Arc::clone(&errors);
            let joined = tokio::spawn(async move {
                let opened = RemoteSession::open(
                    connector.as_ref(),
                    &task_target,
                    &credentials,
                    timeout,
                )
                .await;
                match opened {
                    Ok(session) => sessions.lock().push(session),
                    Err(e) => {
                        tracing::debug!(host = %task_target, "connect failed: {}", e);
                        task_errors.lock().push(HostError::new(task_target, e));
                    }
                }
            })
            .await;

            if let Err(e) = joined {
                let source = AbortedSnafu {
                    message: e.to_string(),
                }
                .build();
                errors.lock().push(HostError::new(target, source));
            }
        }
    });
    futures::future::join_all(handles).await;

    let sessions = std::mem::take(&mut *sessions.lock());
    let errors = std::mem::take(&mut *errors.lock());
    (sessions, errors)
}

async fn build_sequential<C: Connector>(
    connector: &C,
    config: &Config,
) -> (Vec<RemoteSession<C::Transport>>, ErrorAggregator) {
    let mut sessions = Vec::with_capacity(config.hosts.len());
    let mut errors = ErrorAggregator::new();

    for entry in config.hosts.iter() {
        let target = match entry {
            HostEntry::Target(target) => target,
            HostEntry::Malformed(malformed) => {
                errors.push(reject(malformed));
                continue;
            }
        };
        match RemoteSession::open(connector, target, &config.credentials, config.timeout).await {
            Ok(session) => sessions.push(session),
            Err(e) => {
                tracing::debug!(host = %target, "connect failed: {}", e);
                errors.push(HostError::new(target.clone(), e));
            }
        }
    }
    (sessions, errors)
}
