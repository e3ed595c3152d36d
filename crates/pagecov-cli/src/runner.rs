//! Page-visit runner
//!
//! Turns the configured URLs into a suite with one test per URL, installs
//! the coverage controller on it and runs it against a browser.

use crate::config::RunConfig;
use crate::error::{CliError, CliResult};
use pagecov::{
    coverage, Browser, CoverageState, PageFactory, SuiteResults, TestCase, TestHarness, TestSuite,
};
use tracing::{info, warn};

/// Suite name for page visits
pub const SUITE_NAME: &str = "visit";

/// Outcome of a page-visit run
#[derive(Debug)]
pub struct RunOutcome {
    /// Per-test results
    pub results: SuiteResults,
    /// Coverage state at the end of the run
    pub coverage: CoverageState,
    /// Why coverage was disabled, if it was
    pub unsupported_reason: Option<String>,
}

/// Build a suite that navigates to each URL in its own test
#[must_use]
pub fn page_visit_suite(urls: &[String]) -> TestSuite {
    let mut suite = TestSuite::new(SUITE_NAME);
    for url in urls {
        let target = url.clone();
        suite.add_test(TestCase::new(url.clone(), move |ctx| {
            let target = target.clone();
            async move { ctx.page().goto(&target).await }
        }));
    }
    suite
}

/// Launch a browser, run the page visits and close the browser
pub async fn run(config: &RunConfig) -> CliResult<RunOutcome> {
    if config.urls.is_empty() {
        return Err(CliError::config("no URLs to visit (use --url or `urls:`)"));
    }
    let browser = Browser::launch(config.browser.clone()).await?;
    let outcome = run_with(config, &browser).await;
    if let Err(e) = browser.close().await {
        warn!(error = %e, "failed to close browser");
    }
    Ok(outcome)
}

/// Run the page visits against any page source
pub async fn run_with(config: &RunConfig, pages: &dyn PageFactory) -> RunOutcome {
    let mut suite = page_visit_suite(&config.urls);
    let controller = coverage::install(&mut suite);

    let harness = TestHarness::new(config.harness.clone());
    let results = harness.run(&suite, pages).await;

    let state = controller.state();
    if state == CoverageState::Unsupported {
        info!("JS coverage was not recorded in this run");
    }
    RunOutcome {
        results,
        coverage: state,
        unsupported_reason: controller.unsupported_reason().map(str::to_string),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pagecov::{HarnessConfig, MockBrowser, MockPage};
    use tempfile::TempDir;

    fn config(root: &std::path::Path, urls: &[&str]) -> RunConfig {
        RunConfig {
            harness: HarnessConfig::builder().output_dir(root).build().unwrap(),
            urls: urls.iter().map(|u| (*u).to_string()).collect(),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_one_test_per_url() {
        let suite = page_visit_suite(&["http://a/".to_string(), "http://b/".to_string()]);
        assert_eq!(suite.test_count(), 2);
        assert_eq!(suite.tests()[1].name, "http://b/");
    }

    #[tokio::test]
    async fn test_run_with_visits_and_writes_coverage() {
        let tmp = TempDir::new().unwrap();
        let browser = MockBrowser::new();
        let outcome = run_with(&config(tmp.path(), &["http://a/", "http://b/"]), &browser).await;

        assert!(outcome.results.all_passed());
        assert_eq!(outcome.coverage, CoverageState::Recording);
        let pages = browser.pages();
        assert!(pages[0].was_called("goto:http://a/"));
        assert!(pages[1].was_called("goto:http://b/"));
        for result in &outcome.results.results {
            assert!(result.output_dir.join("v8-coverage.json").is_file());
        }
    }

    #[tokio::test]
    async fn test_run_with_unsupported_coverage_still_passes() {
        let tmp = TempDir::new().unwrap();
        let browser = MockBrowser::new().with_page(MockPage::new().with_start_error("firefox"));
        let outcome = run_with(&config(tmp.path(), &["http://a/", "http://b/"]), &browser).await;

        assert!(outcome.results.all_passed());
        assert_eq!(outcome.coverage, CoverageState::Unsupported);
        assert!(outcome.unsupported_reason.unwrap().contains("firefox"));
    }

    #[tokio::test]
    async fn test_run_without_urls_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let err = run(&config(tmp.path(), &[])).await.unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }
}
