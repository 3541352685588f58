// ABOUTME: Application-wide error types for sshctl.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::aggregate::AggregateError;
use crate::config::InvalidParameters;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidParameters(#[from] InvalidParameters),

    #[error(transparent)]
    FanOut(#[from] AggregateError),

    #[error("inventory file not found: {0}")]
    InventoryNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid script input: {0}")]
    Script(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
