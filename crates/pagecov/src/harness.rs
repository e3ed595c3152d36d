//! Test harness for running suites against browser pages.
//!
//! A [`TestSuite`] holds test cases plus the hooks registered through
//! [`SuiteHooks`]. [`TestHarness::run`] executes every test with a fresh
//! page: before-each hooks and the body under the per-test timeout, then
//! the after-each hooks, each under the same limit of its own. After-each
//! hooks run even when an earlier phase failed or timed out; the first error
//! becomes the test's failure.

use crate::config::HarnessConfig;
use crate::driver::PageFactory;
use crate::fixture::{TestContext, TestInfo};
use crate::result::{PagecovError, PagecovResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Callback run around every test
#[async_trait]
pub trait TestHook: Send + Sync {
    /// Run the hook for one test attempt
    async fn run(&self, ctx: &TestContext, info: &TestInfo) -> PagecovResult<()>;
}

/// Registration points a suite exposes to plug-ins
pub trait SuiteHooks {
    /// Register a hook to run before every test
    fn before_each(&mut self, hook: Arc<dyn TestHook>);

    /// Register a hook to run after every test
    fn after_each(&mut self, hook: Arc<dyn TestHook>);
}

type TestBody = Arc<dyn Fn(TestContext) -> BoxFuture<'static, PagecovResult<()>> + Send + Sync>;

/// A single test case
#[derive(Clone)]
pub struct TestCase {
    /// Test name
    pub name: String,
    /// Timeout override in milliseconds
    pub timeout_ms: Option<u64>,
    body: TestBody,
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

impl TestCase {
    /// Create a new test case
    #[must_use]
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PagecovResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            timeout_ms: None,
            body: Arc::new(move |ctx| body(ctx).boxed()),
        }
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

/// A test suite containing multiple tests and their hooks
#[derive(Default)]
pub struct TestSuite {
    /// Suite name
    pub name: String,
    tests: Vec<TestCase>,
    before_each: Vec<Arc<dyn TestHook>>,
    after_each: Vec<Arc<dyn TestHook>>,
}

impl std::fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("tests", &self.tests)
            .field("before_each", &self.before_each.len())
            .field("after_each", &self.after_each.len())
            .finish()
    }
}

impl TestSuite {
    /// Create a new test suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a test case
    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
    }

    /// Get the number of tests
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Tests in registration order
    #[must_use]
    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    /// Number of registered before-each hooks
    #[must_use]
    pub fn before_each_count(&self) -> usize {
        self.before_each.len()
    }

    /// Number of registered after-each hooks
    #[must_use]
    pub fn after_each_count(&self) -> usize {
        self.after_each.len()
    }

    fn full_title(&self, test: &TestCase) -> String {
        if self.name.is_empty() {
            test.name.clone()
        } else {
            format!("{} {}", self.name, test.name)
        }
    }
}

impl SuiteHooks for TestSuite {
    fn before_each(&mut self, hook: Arc<dyn TestHook>) {
        self.before_each.push(hook);
    }

    fn after_each(&mut self, hook: Arc<dyn TestHook>) {
        self.after_each.push(hook);
    }
}

/// Result of running a single test
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Whether test passed
    pub passed: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Test duration (last attempt)
    pub duration: Duration,
    /// Index of the attempt that produced this result
    pub retry: u32,
    /// Output directory of that attempt
    pub output_dir: PathBuf,
}

impl TestResult {
    /// Create a passing test result
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
            duration: Duration::ZERO,
            retry: 0,
            output_dir: PathBuf::new(),
        }
    }

    /// Create a failing test result
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
            duration: Duration::ZERO,
            retry: 0,
            output_dir: PathBuf::new(),
        }
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record which attempt produced the result
    #[must_use]
    pub fn with_attempt(mut self, info: &TestInfo) -> Self {
        self.retry = info.retry;
        self.output_dir = info.output_dir().to_path_buf();
        self
    }

    /// Whether it passed only after a retry
    #[must_use]
    pub const fn is_flaky(&self) -> bool {
        self.passed && self.retry > 0
    }
}

/// Results from running a test suite
#[derive(Debug, Clone)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Individual test results, in registration order
    pub results: Vec<TestResult>,
    /// Total duration
    pub duration: Duration,
}

impl SuiteResults {
    /// Check if all tests passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Count passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Count failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Count tests that needed a retry to pass
    #[must_use]
    pub fn flaky_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_flaky()).count()
    }

    /// Get total test count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

/// Test harness for running suites
#[derive(Debug, Clone, Default)]
pub struct TestHarness {
    config: HarnessConfig,
}

impl TestHarness {
    /// Create a new test harness
    #[must_use]
    pub const fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Harness configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run a test suite, opening one page per test attempt
    pub async fn run(&self, suite: &TestSuite, pages: &dyn PageFactory) -> SuiteResults {
        let start = Instant::now();
        let workers = self.config.workers.max(1);
        info!(
            suite = %suite.name,
            tests = suite.test_count(),
            workers,
            "running suite"
        );

        let results: Vec<TestResult> = futures::stream::iter(suite.tests())
            .map(|test| self.run_test(suite, test, pages))
            .buffered(workers)
            .collect()
            .await;

        let results = SuiteResults {
            suite_name: suite.name.clone(),
            results,
            duration: start.elapsed(),
        };
        info!(
            suite = %results.suite_name,
            passed = results.passed_count(),
            failed = results.failed_count(),
            flaky = results.flaky_count(),
            elapsed_ms = results.duration.as_millis() as u64,
            "suite finished"
        );
        results
    }

    async fn run_test(
        &self,
        suite: &TestSuite,
        test: &TestCase,
        pages: &dyn PageFactory,
    ) -> TestResult {
        let mut retry = 0;
        loop {
            let result = self.run_attempt(suite, test, pages, retry).await;
            if result.passed || retry >= self.config.retries {
                return result;
            }
            debug!(test = %test.name, retry, "retrying failed test");
            retry += 1;
        }
    }

    async fn run_attempt(
        &self,
        suite: &TestSuite,
        test: &TestCase,
        pages: &dyn PageFactory,
        retry: u32,
    ) -> TestResult {
        let info = TestInfo::new(
            &self.config.output_dir,
            &self.config.project,
            suite.full_title(test),
            retry,
        );
        let started = Instant::now();

        let page = match pages.new_page().await {
            Ok(page) => page,
            Err(e) => {
                return TestResult::fail(&test.name, e.to_string())
                    .with_duration(started.elapsed())
                    .with_attempt(&info);
            }
        };
        let ctx = TestContext::new(Arc::clone(&page));

        let timeout_ms = test.timeout_ms.unwrap_or(self.config.timeout_ms);
        let limit = Duration::from_millis(timeout_ms);
        let mut first_error =
            match tokio::time::timeout(limit, run_setup_and_body(suite, test, &ctx, &info)).await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(_) => Some(PagecovError::Timeout { ms: timeout_ms }),
            };
        if let Err(e) = run_after_each(suite, &ctx, &info, timeout_ms).await {
            first_error.get_or_insert(e);
        }
        let outcome = first_error.map_or(Ok(()), Err);

        if let Err(e) = page.close().await {
            warn!(test = %test.name, error = %e, "failed to close page");
        }

        let duration = started.elapsed();
        let result = match outcome {
            Ok(()) => TestResult::pass(&test.name),
            Err(e) => TestResult::fail(&test.name, e.to_string()),
        };
        debug!(
            test = %test.name,
            retry,
            passed = result.passed,
            elapsed_ms = duration.as_millis() as u64,
            "test finished"
        );
        result.with_duration(duration).with_attempt(&info)
    }
}

async fn run_setup_and_body(
    suite: &TestSuite,
    test: &TestCase,
    ctx: &TestContext,
    info: &TestInfo,
) -> PagecovResult<()> {
    for hook in &suite.before_each {
        hook.run(ctx, info).await?;
    }
    (test.body)(ctx.clone()).await
}

/// Every after-each hook runs, each with its own time limit
async fn run_after_each(
    suite: &TestSuite,
    ctx: &TestContext,
    info: &TestInfo,
    timeout_ms: u64,
) -> PagecovResult<()> {
    let limit = Duration::from_millis(timeout_ms);
    let mut first_error = None;
    for hook in &suite.after_each {
        let outcome = match tokio::time::timeout(limit, hook.run(ctx, info)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(PagecovError::Timeout { ms: timeout_ms }),
        };
        if let Err(e) = outcome {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
