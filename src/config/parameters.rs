// ABOUTME: Invocation parameters and their validation into a typed Config.
// ABOUTME: Validation runs before any connection attempt is made.

use super::{HostEntry, MalformedHost, Target};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_USERNAME: &str = "root";
pub const DEFAULT_PORT: u32 = 22;

/// How sessions are opened and operations dispatched across hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One task per host, all launched together.
    #[default]
    Parallel,
    /// One host at a time, in target-list order.
    Sequential,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Parallel => f.write_str("parallel"),
            Mode::Sequential => f.write_str("sequential"),
        }
    }
}

/// Username and password shared by every target of one invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Precondition violations. No connection is attempted when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParameters {
    #[error("invalid parameters: username is blank")]
    BlankUsername,

    #[error("invalid parameters: password is blank")]
    BlankPassword,

    #[error("invalid parameters: no hosts given")]
    NoHosts,

    #[error("invalid parameters: port {0} is outside 1-65535")]
    PortOutOfRange(u32),
}

/// Raw invocation parameters, as collected from flags and inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub username: String,
    pub password: String,
    pub hosts: Vec<String>,
    pub port: u32,
    /// Connect and shell timeout in seconds; 0 means unbounded.
    pub timeout_secs: u64,
    pub mode: Mode,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password: String::new(),
            hosts: Vec::new(),
            port: DEFAULT_PORT,
            timeout_secs: 0,
            mode: Mode::default(),
        }
    }
}

impl Parameters {
    /// Check every precondition and build the typed configuration.
    ///
    /// Host entries are not preconditions. One that does not parse is kept as
    /// [`HostEntry::Malformed`] and fails only its own connection attempt.
    pub fn validate(&self) -> Result<Config, InvalidParameters> {
        if self.username.trim().is_empty() {
            return Err(InvalidParameters::BlankUsername);
        }
        if self.password.trim().is_empty() {
            return Err(InvalidParameters::BlankPassword);
        }
        if self.hosts.is_empty() {
            return Err(InvalidParameters::NoHosts);
        }

        let port = u16::try_from(self.port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(InvalidParameters::PortOutOfRange(self.port))?;

        let hosts = self
            .hosts
            .iter()
            .map(|host| HostEntry::parse(host, port))
            .collect();
        let hosts = NonEmpty::from_vec(hosts).ok_or(InvalidParameters::NoHosts)?;

        Ok(Config {
            hosts,
            credentials: Credentials::new(self.username.clone(), self.password.clone()),
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
            mode: self.mode,
        })
    }
}

/// Validated configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host list in the order given, malformed entries included.
    pub hosts: NonEmpty<HostEntry>,
    pub credentials: Credentials,
    /// Bound applied to each connection attempt and each shell execution.
    pub timeout: Option<Duration>,
    pub mode: Mode,
}

impl Config {
    /// Targets that parsed, in host-list order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.hosts.iter().filter_map(|entry| match entry {
            HostEntry::Target(target) => Some(target),
            HostEntry::Malformed(_) => None,
        })
    }

    /// Entries that did not parse, in host-list order.
    pub fn malformed(&self) -> impl Iterator<Item = &MalformedHost> {
        self.hosts.iter().filter_map(|entry| match entry {
            HostEntry::Malformed(malformed) => Some(malformed),
            HostEntry::Target(_) => None,
        })
    }
}
