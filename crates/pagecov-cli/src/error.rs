//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Some tests of the run failed
    #[error("{failed} of {total} tests failed")]
    TestsFailed {
        /// Number of failed tests
        failed: usize,
        /// Number of tests run
        total: usize,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed or printed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// pagecov library error
    #[error("pagecov error: {0}")]
    Pagecov(#[from] pagecov::PagecovError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("no urls");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("no urls"));
    }

    #[test]
    fn test_tests_failed_error() {
        let err = CliError::TestsFailed { failed: 2, total: 5 };
        assert_eq!(err.to_string(), "2 of 5 tests failed");
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }

    #[test]
    fn test_pagecov_error_from() {
        let err: CliError = pagecov::PagecovError::Timeout { ms: 10 }.into();
        assert!(err.to_string().contains("timed out after 10ms"));
    }
}
