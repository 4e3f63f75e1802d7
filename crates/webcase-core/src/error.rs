//! Error taxonomy for step execution and suite loading

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browser::BrowserError;

/// Everything that can make a single step fail
///
/// None of these escape the step executor: they are folded into a failed
/// [`crate::StepResult`] carrying the rendered message and the kind tag.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    /// Malformed step shape, ambiguous action key, or missing selector
    #[error("format error: {0}")]
    Format(String),

    /// A selector path does not exist in the locator catalog
    #[error("resolution error: cannot resolve '{path}': {reason}")]
    Resolution { path: String, reason: String },

    /// Unknown action, assertion, or expected-token name
    #[error("dispatch error: unsupported {kind} '{name}'")]
    Dispatch { kind: &'static str, name: String },

    /// The browser operation failed or timed out
    #[error("execution error: {0}")]
    Execution(String),

    /// The expectation was not met
    #[error("assertion failed: {0}")]
    Assertion(String),
}

/// Tag recorded on failed step results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    Format,
    Resolution,
    Dispatch,
    Execution,
    Assertion,
    Panic,
}

impl StepError {
    pub fn format(message: impl Into<String>) -> Self {
        StepError::Format(message.into())
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        StepError::Assertion(message.into())
    }

    pub fn kind(&self) -> StepErrorKind {
        match self {
            StepError::Format(_) => StepErrorKind::Format,
            StepError::Resolution { .. } => StepErrorKind::Resolution,
            StepError::Dispatch { .. } => StepErrorKind::Dispatch,
            StepError::Execution(_) => StepErrorKind::Execution,
            StepError::Assertion(_) => StepErrorKind::Assertion,
        }
    }
}

impl From<BrowserError> for StepError {
    fn from(err: BrowserError) -> Self {
        StepError::Execution(err.to_string())
    }
}

/// Errors raised while loading suites and catalogs
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("test case '{0}' not found")]
    CaseNotFound(String),

    #[error("invalid suite: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_message_mentions_unsupported() {
        let err = StepError::Dispatch {
            kind: "action",
            name: "fly".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("unsupported"));
        assert!(message.contains("dispatch"));
        assert!(message.contains("fly"));
        assert_eq!(err.kind(), StepErrorKind::Dispatch);
    }

    #[test]
    fn test_browser_error_becomes_execution() {
        let err: StepError = BrowserError::NotFound("#missing".to_string()).into();
        assert_eq!(err.kind(), StepErrorKind::Execution);
        assert!(err.to_string().contains("#missing"));
    }
}
