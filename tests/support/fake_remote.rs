// ABOUTME: In-memory stand-in for SSH hosts used by the fan-out tests.
// ABOUTME: Scriptable dial, SFTP, shell and close behaviour per host, with call counters.

use async_trait::async_trait;
use parking_lot::Mutex;
use sshctl::config::{Credentials, Target};
use sshctl::executor::ShellOutput;
use sshctl::session::{Connector, FileChannel, ShellChannel, Transport};
use sshctl::ssh::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const HOME: &str = "/home/tester";

/// How a close call on a channel ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloseOutcome {
    #[default]
    Ok,
    Eof,
    Fail,
}

/// Scripted behaviour of one fake host.
#[derive(Debug, Clone, Default)]
pub struct HostBehavior {
    pub unreachable: bool,
    pub sftp_fails: bool,
    pub read_only: bool,
    pub dial_delay: Duration,
    pub files_close: CloseOutcome,
    pub transport_close: CloseOutcome,
}

#[derive(Default)]
struct NetworkState {
    behaviors: Mutex<HashMap<String, HostBehavior>>,
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    dirs: Mutex<HashMap<String, BTreeSet<String>>>,
    dials: Mutex<HashMap<String, usize>>,
    transport_closes: Mutex<HashMap<String, usize>>,
    files_closes: Mutex<HashMap<String, usize>>,
    events: Mutex<Vec<String>>,
    credentials: Mutex<Vec<Credentials>>,
}

impl NetworkState {
    fn behavior(&self, host: &str) -> HostBehavior {
        self.behaviors.lock().get(host).cloned().unwrap_or_default()
    }

    fn record(&self, event: String) {
        self.events.lock().push(event);
    }

    fn bump(counter: &Mutex<HashMap<String, usize>>, host: &str) {
        *counter.lock().entry(host.to_string()).or_default() += 1;
    }

    fn count(counter: &Mutex<HashMap<String, usize>>, host: &str) -> usize {
        counter.lock().get(host).copied().unwrap_or(0)
    }

    fn has_dir(&self, host: &str, dir: &str) -> bool {
        dir.is_empty()
            || dir == "/"
            || default_dirs().contains(&dir)
            || self
                .dirs
                .lock()
                .get(host)
                .is_some_and(|dirs| dirs.contains(dir))
    }
}

fn default_dirs() -> [&'static str; 4] {
    ["/home", HOME, "/tmp", "/etc"]
}

fn resolve(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", HOME, path.trim_start_matches("./"))
    }
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
}

fn close_result(outcome: CloseOutcome, what: &str) -> Result<()> {
    match outcome {
        CloseOutcome::Ok => Ok(()),
        CloseOutcome::Eof => Err(Error::Eof),
        CloseOutcome::Fail => Err(Error::Connection(format!("{} close refused", what))),
    }
}

/// A set of fake hosts reachable through [`FakeConnector`].
#[derive(Clone, Default)]
pub struct FakeNetwork {
    state: Arc<NetworkState>,
}

#[allow(dead_code)]
impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&self, host: &str, configure: impl FnOnce(&mut HostBehavior)) {
        let mut behaviors = self.state.behaviors.lock();
        configure(behaviors.entry(host.to_string()).or_default());
    }

    pub fn unreachable(&self, host: &str) {
        self.configure(host, |b| b.unreachable = true);
    }

    pub fn connector(&self) -> Arc<FakeConnector> {
        Arc::new(FakeConnector {
            state: Arc::clone(&self.state),
        })
    }

    pub fn put_file(&self, host: &str, path: &str, content: &[u8]) {
        self.state
            .files
            .lock()
            .insert((host.to_string(), resolve(path)), content.to_vec());
    }

    pub fn file(&self, host: &str, path: &str) -> Option<Vec<u8>> {
        self.state
            .files
            .lock()
            .get(&(host.to_string(), resolve(path)))
            .cloned()
    }

    pub fn has_dir(&self, host: &str, dir: &str) -> bool {
        self.state.has_dir(host, dir)
    }

    pub fn dial_count(&self, host: &str) -> usize {
        NetworkState::count(&self.state.dials, host)
    }

    pub fn total_dials(&self) -> usize {
        self.state.dials.lock().values().sum()
    }

    pub fn transport_close_count(&self, host: &str) -> usize {
        NetworkState::count(&self.state.transport_closes, host)
    }

    pub fn files_close_count(&self, host: &str) -> usize {
        NetworkState::count(&self.state.files_closes, host)
    }

    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().clone()
    }

    pub fn seen_credentials(&self) -> Vec<Credentials> {
        self.state.credentials.lock().clone()
    }
}

pub struct FakeConnector {
    state: Arc<NetworkState>,
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn dial(
        &self,
        target: &Target,
        credentials: &Credentials,
        timeout: Option<Duration>,
    ) -> Result<FakeTransport> {
        let host = target.host().to_string();
        NetworkState::bump(&self.state.dials, &host);
        self.state.credentials.lock().push(credentials.clone());
        let behavior = self.state.behavior(&host);

        if !behavior.dial_delay.is_zero() {
            match timeout {
                Some(limit) if limit < behavior.dial_delay => {
                    tokio::time::sleep(limit).await;
                    return Err(Error::ConnectTimeout(limit));
                }
                _ => tokio::time::sleep(behavior.dial_delay).await,
            }
        }
        if behavior.unreachable {
            return Err(Error::Connection(format!("connection refused to {}", target)));
        }

        self.state.record(format!("dial {}", host));
        Ok(FakeTransport {
            host,
            state: Arc::clone(&self.state),
        })
    }
}

pub struct FakeTransport {
    host: String,
    state: Arc<NetworkState>,
}

#[async_trait]
impl Transport for FakeTransport {
    type Files = FakeFiles;
    type Shell = FakeShell;

    async fn open_files(&self) -> Result<FakeFiles> {
        if self.state.behavior(&self.host).sftp_fails {
            return Err(Error::ChannelOpen("subsystem request failed".to_string()));
        }
        Ok(FakeFiles {
            host: self.host.clone(),
            state: Arc::clone(&self.state),
        })
    }

    async fn open_shell(&self) -> Result<FakeShell> {
        Ok(FakeShell {
            host: self.host.clone(),
            state: Arc::clone(&self.state),
            input: Vec::new(),
        })
    }

    async fn close(&self) -> Result<()> {
        NetworkState::bump(&self.state.transport_closes, &self.host);
        self.state.record(format!("close {}", self.host));
        close_result(self.state.behavior(&self.host).transport_close, "transport")
    }
}

pub struct FakeFiles {
    host: String,
    state: Arc<NetworkState>,
}

#[async_trait]
impl FileChannel for FakeFiles {
    type Reader = io::Cursor<Vec<u8>>;
    type Writer = FakeWriter;

    async fn open(&self, path: &str) -> Result<Self::Reader> {
        let key = (self.host.clone(), resolve(path));
        match self.state.files.lock().get(&key) {
            Some(content) => Ok(io::Cursor::new(content.clone())),
            None => Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path),
            ))),
        }
    }

    async fn create(&self, path: &str) -> Result<FakeWriter> {
        if self.state.behavior(&self.host).read_only {
            return Err(Error::Io(io::Error::from(io::ErrorKind::PermissionDenied)));
        }
        let path = resolve(path);
        if !self.state.has_dir(&self.host, parent(&path)) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("missing directory: {}", parent(&path)),
            )));
        }
        Ok(FakeWriter {
            host: self.host.clone(),
            path,
            buf: Vec::new(),
            state: Arc::clone(&self.state),
        })
    }

    async fn mkdir_all(&self, path: &str) -> Result<()> {
        let path = resolve(path);
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            if self
                .state
                .files
                .lock()
                .contains_key(&(self.host.clone(), current.clone()))
            {
                return Err(Error::NotADirectory(current));
            }
            self.state
                .dirs
                .lock()
                .entry(self.host.clone())
                .or_default()
                .insert(current.clone());
        }
        Ok(())
    }

    async fn working_dir(&self) -> Result<String> {
        Ok(HOME.to_string())
    }

    async fn close(&self) -> Result<()> {
        NetworkState::bump(&self.state.files_closes, &self.host);
        close_result(self.state.behavior(&self.host).files_close, "sftp")
    }
}

/// Buffers writes and stores them on shutdown.
pub struct FakeWriter {
    host: String,
    path: String,
    buf: Vec<u8>,
    state: Arc<NetworkState>,
}

impl AsyncWrite for FakeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().buf.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let content = std::mem::take(&mut this.buf);
        this.state
            .files
            .lock()
            .insert((this.host.clone(), this.path.clone()), content);
        Poll::Ready(Ok(()))
    }
}

/// Interprets a tiny script language, one command per line:
/// `echo TEXT`, `exit N`, `sleep SECS`, `kill`, `hangup` and `panic`.
pub struct FakeShell {
    host: String,
    state: Arc<NetworkState>,
    input: Vec<u8>,
}

#[async_trait]
impl ShellChannel for FakeShell {
    async fn start(&mut self, input: &[u8]) -> Result<()> {
        self.state.record(format!("shell {}", self.host));
        self.input = input.to_vec();
        Ok(())
    }

    async fn wait(&mut self, stdout: &mut (dyn AsyncWrite + Send + Unpin)) -> Result<()> {
        let script = String::from_utf8_lossy(&self.input).into_owned();
        for line in script.lines().map(str::trim) {
            let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
            match command {
                "echo" => stdout.write_all(format!("{}\n", arg).as_bytes()).await?,
                "exit" => {
                    let code: u32 = arg.parse().unwrap_or(1);
                    return if code == 0 {
                        Ok(())
                    } else {
                        Err(Error::ExitStatus(code))
                    };
                }
                "sleep" => {
                    let secs: u64 = arg.parse().unwrap_or(1);
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                }
                "kill" => return Err(Error::ExitSignal("KILL".to_string())),
                "hangup" => return Err(Error::ChannelClosed),
                "panic" => panic!("fake shell crashed on {}", self.host),
                _ => {}
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Shell output captured per host.
#[derive(Clone, Default)]
pub struct CapturedOutput {
    buffers: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

#[allow(dead_code)]
impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shell_output(&self) -> ShellOutput {
        let buffers = Arc::clone(&self.buffers);
        Arc::new(move |target: &Target| {
            Box::new(CaptureWriter {
                host: target.host().to_string(),
                buffers: Arc::clone(&buffers),
            }) as Box<dyn AsyncWrite + Send + Unpin>
        })
    }

    pub fn for_host(&self, host: &str) -> Vec<u8> {
        self.buffers.lock().get(host).cloned().unwrap_or_default()
    }
}

struct CaptureWriter {
    host: String,
    buffers: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl AsyncWrite for CaptureWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buffers
            .lock()
            .entry(self.host.clone())
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
