// ABOUTME: Configuration types and inventory parsing for sshctl.
// ABOUTME: Handles YAML inventories, env var references and parameter validation.

mod env_value;
mod parameters;
mod target;

pub use env_value::EnvValue;
pub use parameters::{
    Config, Credentials, DEFAULT_PORT, DEFAULT_USERNAME, InvalidParameters, Mode, Parameters,
};
pub use target::{HostEntry, MalformedHost, Target};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Host inventory read from a YAML file.
///
/// Every field except `hosts` is optional; flags given on the command line take
/// precedence over the values found here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inventory {
    #[serde(default)]
    pub hosts: Vec<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<EnvValue>,

    #[serde(default)]
    pub port: Option<u32>,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub mode: Option<Mode>,
}

impl Inventory {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::InventoryNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Resolve env references and fill unset fields with defaults.
    pub fn into_parameters(self) -> Result<Parameters> {
        let defaults = Parameters::default();
        let password = match self.password {
            Some(value) => value.resolve()?,
            None => defaults.password,
        };

        Ok(Parameters {
            username: self.username.unwrap_or(defaults.username),
            password,
            hosts: self.hosts,
            port: self.port.unwrap_or(defaults.port),
            timeout_secs: self.timeout.map(whole_seconds).unwrap_or(defaults.timeout_secs),
            mode: self.mode.unwrap_or(defaults.mode),
        })
    }
}

/// Round up so that a sub-second timeout never turns into "unbounded".
fn whole_seconds(timeout: Duration) -> u64 {
    timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
}
