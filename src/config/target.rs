// ABOUTME: Target host addressing for SSH connections.
// ABOUTME: Parses formats like "host", "host:port", "[v6addr]" and "[v6addr]:port".

use serde::Serialize;
use std::fmt;

/// One (host, port) pair an operation runs against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    host: String,
    port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parse a host entry, falling back to `default_port` when none is given.
    pub fn parse(s: &str, default_port: u16) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("host cannot be empty".to_string());
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| format!("unterminated IPv6 address: {}", s))?;
            if after.is_empty() {
                (host, None)
            } else {
                let port = after
                    .strip_prefix(':')
                    .ok_or_else(|| format!("unexpected characters after address: {}", after))?;
                (host, Some(port))
            }
        } else if s.matches(':').count() > 1 {
            // Bare IPv6 address without brackets cannot carry a port.
            (s, None)
        } else if let Some((host, port)) = s.split_once(':') {
            (host, Some(port))
        } else {
            (s, None)
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        let port = match port {
            Some(p) => p
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| format!("invalid port: {}", p))?,
            None => default_port,
        };

        Ok(Self::new(host, port))
    }
}

/// A host entry that does not parse as a target.
///
/// It keeps a best-effort target built from the raw entry so the failure can
/// be reported against that host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedHost {
    target: Target,
    reason: String,
}

impl MalformedHost {
    pub fn new(entry: &str, default_port: u16, reason: impl Into<String>) -> Self {
        Self {
            target: Target::new(entry.trim(), default_port),
            reason: reason.into(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// One element of the host list: a usable target or an entry that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEntry {
    Target(Target),
    Malformed(MalformedHost),
}

impl HostEntry {
    pub fn parse(s: &str, default_port: u16) -> Self {
        match Target::parse(s, default_port) {
            Ok(target) => HostEntry::Target(target),
            Err(reason) => HostEntry::Malformed(MalformedHost::new(s, default_port, reason)),
        }
    }

    /// The target errors and sessions for this entry are reported against.
    pub fn target(&self) -> &Target {
        match self {
            HostEntry::Target(target) => target,
            HostEntry::Malformed(malformed) => malformed.target(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
