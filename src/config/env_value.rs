// ABOUTME: Inventory values that may be read from the environment.
// ABOUTME: Keeps secrets such as the SSH password out of inventory files.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

// Literal values are usually passwords.
impl fmt::Debug for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Literal(_) => f.write_str("Literal(<redacted>)"),
            EnvValue::FromEnv { var, default } => f
                .debug_struct("FromEnv")
                .field("var", var)
                .field("default", &default.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value = EnvValue::Literal("s3cret".to_string());
        assert_eq!(value.resolve().unwrap(), "s3cret");
    }

    #[test]
    fn debug_hides_literal() {
        let value = EnvValue::Literal("s3cret".to_string());
        assert!(!format!("{:?}", value).contains("s3cret"));
    }

    #[test]
    fn missing_var_without_default_is_an_error() {
        temp_env::with_var_unset("SSHCTL_UNIT_MISSING", || {
            let value = EnvValue::FromEnv {
                var: "SSHCTL_UNIT_MISSING".to_string(),
                default: None,
            };
            assert!(matches!(value.resolve(), Err(Error::MissingEnvVar(v)) if v == "SSHCTL_UNIT_MISSING"));
        });
    }
}
