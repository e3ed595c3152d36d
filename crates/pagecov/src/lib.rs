//! pagecov: per-test V8 JS coverage capture for browser test suites
//!
//! Installs a coverage controller on a suite so that every test records
//! precise JS coverage on its page and leaves a raw `v8-coverage.json` in
//! its own output directory. Browsers or modes that cannot record coverage
//! are detected on the first failed start; the rest of the run proceeds
//! without coverage and without failures attributable to it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TestHarness ──► TestSuite ──► before_each ──► body ──► after_each │
//! │       │                            │                      │       │
//! │  PageFactory                CoverageController ───────────┘       │
//! │  (Browser/CDP)                     │                              │
//! │       └──► PageDriver ◄── start_js_coverage / stop_js_coverage    │
//! │                                    │                              │
//! │                     TestInfo::output_path("v8-coverage.json")     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pagecov::{coverage, Browser, BrowserConfig, HarnessConfig, TestCase, TestHarness, TestSuite};
//!
//! let mut suite = TestSuite::new("home");
//! coverage::install(&mut suite);
//! suite.add_test(TestCase::new("opens page", |ctx| async move {
//!     ctx.page().goto("http://127.0.0.1:3000/index.html").await
//! }));
//!
//! let browser = Browser::launch(BrowserConfig::default()).await?;
//! let results = TestHarness::new(HarnessConfig::default()).run(&suite, &browser).await;
//! ```

#![warn(missing_docs)]

mod artifact;
mod browser;
mod config;
mod driver;
mod fixture;
mod harness;
mod result;

/// Coverage lifecycle controller
pub mod coverage;

pub use artifact::{
    CoverageArtifact, CoverageRange, FunctionCoverage, ScriptCoverage, ARTIFACT_FILE_NAME,
};
pub use browser::{Browser, BrowserConfig, Page};
pub use config::{HarnessConfig, HarnessConfigBuilder, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_MS};
pub use coverage::{CoverageController, CoverageState};
pub use driver::{MockBrowser, MockPage, PageDriver, PageFactory};
pub use fixture::{sanitize_for_file_path, test_output_dir_name, TestContext, TestInfo};
pub use harness::{
    SuiteHooks, SuiteResults, TestCase, TestHarness, TestHook, TestResult, TestSuite,
};
pub use result::{PagecovError, PagecovResult};
