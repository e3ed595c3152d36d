//! Per-test JS coverage lifecycle.
//!
//! [`CoverageController::install`] registers two hooks on a suite: before
//! each test it starts precise JS coverage on the test's page, after each
//! test it stops recording and writes the result to
//! `<test output dir>/v8-coverage.json`.
//!
//! ```text
//!   Recording ──(start fails)──► Unsupported
//!       │                            │
//!   start / stop+write           both hooks no-op
//! ```
//!
//! The transition is one-way and only a failed start triggers it. Stop and
//! write failures are not swallowed; they fail the test they belong to and
//! leave the controller in `Recording`.

use crate::artifact::ARTIFACT_FILE_NAME;
use crate::fixture::{TestContext, TestInfo};
use crate::harness::{SuiteHooks, TestHook};
use crate::result::{PagecovError, PagecovResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Whether the controller still attempts to record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageState {
    /// Start/stop are attempted around every test
    Recording,
    /// A start failed; no further coverage calls are made
    Unsupported,
}

/// Brackets every test of a suite with coverage start/stop.
///
/// One controller belongs to one suite run. The unsupported flag is shared
/// by all concurrently running tests and only ever goes from `false` to
/// `true`.
#[derive(Debug, Default)]
pub struct CoverageController {
    unsupported: AtomicBool,
    reason: OnceLock<String>,
}

impl CoverageController {
    /// Create a controller in the `Recording` state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the before-each and after-each hooks on `suite`.
    ///
    /// Installing twice registers the hooks twice.
    pub fn install<S: SuiteHooks + ?Sized>(self: &Arc<Self>, suite: &mut S) {
        suite.before_each(Arc::new(StartCoverage(Arc::clone(self))));
        suite.after_each(Arc::new(SaveCoverage(Arc::clone(self))));
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> CoverageState {
        if self.is_unsupported() {
            CoverageState::Unsupported
        } else {
            CoverageState::Recording
        }
    }

    /// Whether coverage was found to be unavailable
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.unsupported.load(Ordering::Acquire)
    }

    /// Error text of the start failure that disabled coverage
    #[must_use]
    pub fn unsupported_reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    /// Start recording on the test's page.
    ///
    /// Never fails: a start error switches the controller to
    /// [`CoverageState::Unsupported`] and is otherwise dropped.
    pub async fn before_test(&self, ctx: &TestContext) {
        if self.is_unsupported() {
            return;
        }
        if let Err(e) = ctx.page().start_js_coverage().await {
            self.mark_unsupported(&e);
        }
    }

    /// Stop recording and write `v8-coverage.json` for this test.
    ///
    /// # Errors
    ///
    /// Propagates stop failures, output path errors and write failures.
    pub async fn after_test(&self, ctx: &TestContext, info: &TestInfo) -> PagecovResult<()> {
        if self.is_unsupported() {
            return Ok(());
        }
        let artifact = ctx.page().stop_js_coverage().await?;
        let path = info.output_path_async(ARTIFACT_FILE_NAME).await?;
        let json = artifact.to_json()?;
        tokio::fs::write(&path, json.as_bytes())
            .await
            .map_err(|source| PagecovError::ArtifactWrite {
                path: path.clone(),
                source,
            })?;
        debug!(
            test = %info.title,
            path = %path.display(),
            bytes = json.len(),
            "coverage written"
        );
        Ok(())
    }

    fn mark_unsupported(&self, error: &PagecovError) {
        if self.reason.set(error.to_string()).is_ok() {
            debug!(error = %error, "JS coverage unavailable, skipping it for the rest of the run");
        }
        self.unsupported.store(true, Ordering::Release);
    }
}

/// Create a controller and install it on `suite`
pub fn install<S: SuiteHooks + ?Sized>(suite: &mut S) -> Arc<CoverageController> {
    let controller = Arc::new(CoverageController::new());
    controller.install(suite);
    controller
}

struct StartCoverage(Arc<CoverageController>);

#[async_trait]
impl TestHook for StartCoverage {
    async fn run(&self, ctx: &TestContext, _info: &TestInfo) -> PagecovResult<()> {
        self.0.before_test(ctx).await;
        Ok(())
    }
}

struct SaveCoverage(Arc<CoverageController>);

#[async_trait]
impl TestHook for SaveCoverage {
    async fn run(&self, ctx: &TestContext, info: &TestInfo) -> PagecovResult<()> {
        self.0.after_test(ctx, info).await
    }
}
