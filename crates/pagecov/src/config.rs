//! Harness Configuration
//!
//! Settings for running a suite: where per-test outputs go, how long a test
//! may take, how many run at once and how often a failing test is retried.

use crate::result::{PagecovError, PagecovResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default root for per-test output directories
pub const DEFAULT_OUTPUT_DIR: &str = "test-results";

/// Default per-test timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Configuration for the test harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root directory for per-test output directories
    pub output_dir: PathBuf,
    /// Per-test timeout covering hooks and body, in milliseconds
    pub timeout_ms: u64,
    /// Number of tests run concurrently
    pub workers: usize,
    /// Extra attempts for a failing test
    pub retries: u32,
    /// Project name, part of every output directory name
    pub project: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            workers: 1,
            retries: 0,
            project: "default".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Create a new builder
    #[must_use]
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::default()
    }

    /// Per-test timeout as a duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Check the values are usable
    ///
    /// # Errors
    ///
    /// Returns error for zero workers, zero timeout or an empty project name
    pub fn validate(&self) -> PagecovResult<()> {
        if self.workers == 0 {
            return Err(PagecovError::config("workers must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(PagecovError::config("timeout_ms must be greater than 0"));
        }
        if self.project.trim().is_empty() {
            return Err(PagecovError::config("project must not be empty"));
        }
        Ok(())
    }
}

/// Builder for `HarnessConfig`
#[derive(Debug, Clone, Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    /// Set output root
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set per-test timeout
    #[must_use]
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set concurrency
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set retry count
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set project name
    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.config.project = project.into();
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configuration does not validate
    pub fn build(self) -> PagecovResult<HarnessConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
