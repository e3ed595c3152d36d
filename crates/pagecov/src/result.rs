//! Result and error types for pagecov.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pagecov operations
pub type PagecovResult<T> = Result<T, PagecovError>;

/// Errors that can occur while driving pages and capturing coverage
#[derive(Debug, Error)]
pub enum PagecovError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The page cannot record JS coverage (browser or mode lacks the capability)
    #[error("JS coverage is not supported: {message}")]
    CoverageUnsupported {
        /// Error message
        message: String,
    },

    /// Coverage capture failed after recording had started
    #[error("JS coverage capture failed: {message}")]
    CoverageError {
        /// Error message
        message: String,
    },

    /// Writing a coverage artifact failed
    #[error("Failed to write coverage artifact {}: {source}", path.display())]
    ArtifactWrite {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Output path segment would escape the test output directory
    #[error("Output path {segment:?} must stay inside {}", output_dir.display())]
    InvalidOutputPath {
        /// Requested segment
        segment: String,
        /// Test output directory
        output_dir: PathBuf,
    },

    /// Test body reported a failure
    #[error("Test failed: {message}")]
    TestFailed {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PagecovError {
    /// Create a test failure
    #[must_use]
    pub fn test_failed(message: impl Into<String>) -> Self {
        Self::TestFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
