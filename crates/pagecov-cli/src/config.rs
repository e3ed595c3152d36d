//! Run configuration
//!
//! A YAML file provides the base values; command-line flags override them.
//!
//! ```yaml
//! harness:
//!   output_dir: test-results
//!   timeout_ms: 60000
//!   workers: 2
//!   project: dev
//! browser:
//!   headless: true
//!   sandbox: false
//! urls:
//!   - http://127.0.0.1:3000/index.html
//! ```

use crate::commands::SettingsArgs;
use crate::error::{CliError, CliResult};
use pagecov::{BrowserConfig, HarnessConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a `run` needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Harness settings
    pub harness: HarnessConfig,
    /// Browser settings
    pub browser: BrowserConfig,
    /// Pages to visit, one test each
    pub urls: Vec<String>,
}

impl RunConfig {
    /// Read a YAML config file
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(serde_yaml_ng::from_str(&text)?)
    }

    /// Load the file named by `settings` (if any) and apply flag overrides
    pub fn resolve(settings: &SettingsArgs) -> CliResult<Self> {
        let mut config = match &settings.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(settings);
        config.harness.validate()?;
        Ok(config)
    }

    /// Overwrite values with the ones given on the command line
    pub fn apply(&mut self, settings: &SettingsArgs) {
        if !settings.urls.is_empty() {
            self.urls.clone_from(&settings.urls);
        }
        if let Some(dir) = &settings.output_dir {
            self.harness.output_dir.clone_from(dir);
        }
        if let Some(ms) = settings.timeout_ms {
            self.harness.timeout_ms = ms;
        }
        if let Some(workers) = settings.workers {
            self.harness.workers = workers;
        }
        if let Some(retries) = settings.retries {
            self.harness.retries = retries;
        }
        if let Some(project) = &settings.project {
            self.harness.project.clone_from(project);
        }
        if settings.headed {
            self.browser.headless = false;
        }
        if let Some(path) = &settings.chromium_path {
            self.browser.chromium_path = Some(path.clone());
        }
        if settings.no_sandbox {
            self.browser.sandbox = false;
        }
    }

    /// Serialize as YAML
    pub fn to_yaml(&self) -> CliResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
