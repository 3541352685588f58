// ABOUTME: Resolves the input fed to remote shells.
// ABOUTME: An inline command, a script file, or standard input when the file is "-".

use crate::error::{Error, Result};
use bytes::Bytes;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Where the shell input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    Inline(String),
    File(PathBuf),
    Stdin,
}

impl ScriptSource {
    /// Pick the source from the `-c` and `-f` flags. Exactly one must be set,
    /// and `-` given to either means standard input.
    pub fn from_flags(command: Option<String>, file: Option<PathBuf>) -> Result<Self> {
        match (command, file) {
            (Some(_), Some(_)) => Err(Error::Script(
                "--command and --file are mutually exclusive".to_string(),
            )),
            (None, None) => Err(Error::Script(
                "one of --command or --file is required".to_string(),
            )),
            (Some(command), None) if command == "-" => Ok(ScriptSource::Stdin),
            (Some(command), None) => Ok(ScriptSource::Inline(command)),
            (None, Some(file)) if file.as_os_str() == "-" => Ok(ScriptSource::Stdin),
            (None, Some(file)) => Ok(ScriptSource::File(file)),
        }
    }

    /// Read the whole script.
    ///
    /// Inline commands get a trailing newline so the remote shell runs them
    /// before it sees end-of-input.
    pub async fn read(&self) -> Result<Bytes> {
        match self {
            ScriptSource::Inline(command) => {
                let mut script = command.clone();
                if !script.ends_with('\n') {
                    script.push('\n');
                }
                Ok(Bytes::from(script))
            }
            ScriptSource::File(path) => {
                let content = tokio::fs::read(path).await.map_err(|e| {
                    Error::Script(format!("cannot read {}: {}", path.display(), e))
                })?;
                Ok(Bytes::from(content))
            }
            ScriptSource::Stdin => {
                let mut content = Vec::new();
                tokio::io::stdin().read_to_end(&mut content).await?;
                Ok(Bytes::from(content))
            }
        }
    }
}
