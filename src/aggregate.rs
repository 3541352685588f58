// ABOUTME: Ordered collection of per-host failures from one invocation.
// ABOUTME: An empty aggregator means every host succeeded.

use crate::config::Target;
use crate::session::{ErrorKind, SessionError};
use std::fmt;
use thiserror::Error;

/// A session failure attributed to the host it happened on.
#[derive(Debug, Error)]
#[error("{target}: {source}")]
pub struct HostError {
    pub target: Target,
    #[source]
    pub source: SessionError,
}

impl HostError {
    pub fn new(target: Target, source: SessionError) -> Self {
        Self { target, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Accumulates host errors in the order they are appended.
#[derive(Debug, Default)]
pub struct ErrorAggregator {
    errors: Vec<HostError>,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an optional error. `None` leaves the aggregator untouched.
    pub fn append(&mut self, error: Option<HostError>) {
        if let Some(error) = error {
            self.errors.push(error);
        }
    }

    pub fn push(&mut self, error: HostError) {
        self.errors.push(error);
    }

    /// Move every entry of `other` to the end of this aggregator.
    pub fn merge(&mut self, other: ErrorAggregator) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HostError> {
        self.errors.iter()
    }

    /// `Ok` when nothing was recorded, otherwise the combined error.
    pub fn resolve(self) -> Result<(), AggregateError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateError {
                errors: self.errors,
            })
        }
    }
}

impl Extend<HostError> for ErrorAggregator {
    fn extend<I: IntoIterator<Item = HostError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

impl fmt::Display for ErrorAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            f.write_str("no error")
        } else {
            write_list(f, &self.errors)
        }
    }
}

/// One or more host failures. Never empty.
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<HostError>,
}

impl AggregateError {
    pub fn errors(&self) -> &[HostError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<HostError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HostError> {
        self.errors.iter()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, &self.errors)
    }
}

impl std::error::Error for AggregateError {}

impl IntoIterator for AggregateError {
    type Item = HostError;
    type IntoIter = std::vec::IntoIter<HostError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a AggregateError {
    type Item = &'a HostError;
    type IntoIter = std::slice::Iter<'a, HostError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, errors: &[HostError]) -> fmt::Result {
    if errors.len() == 1 {
        writeln!(f, "1 error occurred:")?;
    } else {
        writeln!(f, "{} errors occurred:", errors.len())?;
    }
    for error in errors {
        writeln!(f, "\t* {}", error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AbortedSnafu;

    fn host_error(host: &str) -> HostError {
        HostError::new(
            Target::new(host, 22),
            AbortedSnafu { message: "boom" }.build(),
        )
    }

    #[test]
    fn empty_aggregator_resolves_ok() {
        let agg = ErrorAggregator::new();
        assert_eq!(agg.to_string(), "no error");
        assert!(agg.resolve().is_ok());
    }

    #[test]
    fn append_none_is_a_no_op() {
        let mut agg = ErrorAggregator::new();
        agg.append(None);
        assert!(agg.is_empty());
        agg.append(Some(host_error("web1")));
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn merge_preserves_order() {
        let mut first = ErrorAggregator::new();
        first.push(host_error("web1"));
        let mut second = ErrorAggregator::new();
        second.push(host_error("web2"));
        second.push(host_error("web3"));
        first.merge(second);

        let err = first.resolve().unwrap_err();
        let hosts: Vec<_> = err.iter().map(|e| e.target.host().to_string()).collect();
        assert_eq!(hosts, vec!["web1", "web2", "web3"]);
    }

    #[test]
    fn display_lists_every_entry() {
        let mut agg = ErrorAggregator::new();
        agg.push(host_error("web1"));
        agg.push(host_error("web2"));
        let rendered = agg.resolve().unwrap_err().to_string();
        assert_eq!(
            rendered,
            "2 errors occurred:\n\
             \t* web1:22: operation aborted: boom\n\
             \t* web2:22: operation aborted: boom\n"
        );
    }

    #[test]
    fn single_entry_uses_singular() {
        let mut agg = ErrorAggregator::new();
        agg.push(host_error("web1"));
        let err = agg.resolve().unwrap_err();
        assert!(err.to_string().starts_with("1 error occurred:\n"));
        assert_eq!(err.into_errors().len(), 1);
    }
}
