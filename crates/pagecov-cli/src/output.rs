//! Line reporter: one line per test, then a summary

use console::{style, Style, Term};
use pagecov::{SuiteResults, TestResult};

/// Writes run results to stderr
#[derive(Debug)]
pub struct LineReporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for LineReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl LineReporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").for_stderr().blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print every test result followed by the summary
    pub fn report(&self, results: &SuiteResults) {
        for result in &results.results {
            // Failures are printed even in quiet mode
            if self.quiet && result.passed {
                continue;
            }
            let _ = self.term.write_line(&self.format_result(result));
        }
        if self.quiet && results.all_passed() {
            return;
        }
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&self.format_summary(results));
    }

    /// One line for one test
    #[must_use]
    pub fn format_result(&self, result: &TestResult) -> String {
        let ms = result.duration.as_millis();
        let retry = if result.retry > 0 {
            format!(" (retry #{})", result.retry)
        } else {
            String::new()
        };
        let prefix = match (result.passed, self.use_color) {
            (true, true) => style("✓").for_stderr().green().bold().to_string(),
            (false, true) => style("✗").for_stderr().red().bold().to_string(),
            (true, false) => "PASS".to_string(),
            (false, false) => "FAIL".to_string(),
        };
        let mut line = format!("{prefix} {}{retry} ({ms}ms)", result.name);
        if let Some(error) = &result.error {
            let error = if self.use_color {
                style(error).for_stderr().red().to_string()
            } else {
                error.clone()
            };
            line.push_str(&format!("\n    {error}"));
        }
        line
    }

    /// Totals line
    #[must_use]
    pub fn format_summary(&self, results: &SuiteResults) -> String {
        let passed = results.passed_count();
        let failed = results.failed_count();
        let flaky = results.flaky_count();
        let secs = results.duration.as_secs_f64();
        let total = results.total();

        if self.use_color {
            let passed_style = Style::new().for_stderr().green().bold();
            let failed_style = Style::new().for_stderr().red().bold();
            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            format!(
                "{status} {total} tests in {secs:.2}s ({} passed, {} failed, {} flaky)",
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                style(flaky).for_stderr().yellow()
            )
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            format!(
                "{status} {total} tests in {secs:.2}s ({passed} passed, {failed} failed, {flaky} flaky)"
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn results() -> SuiteResults {
        SuiteResults {
            suite_name: "visit".to_string(),
            results: vec![
                TestResult::pass("http://a/").with_duration(Duration::from_millis(12)),
                TestResult::fail("http://b/", "JS coverage capture failed: boom"),
            ],
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_plain_result_lines() {
        let reporter = LineReporter::new(false, false);
        let results = results();
        assert_eq!(
            reporter.format_result(&results.results[0]),
            "PASS http://a/ (12ms)"
        );
        let failed = reporter.format_result(&results.results[1]);
        assert!(failed.starts_with("FAIL http://b/"));
        assert!(failed.contains("\n    JS coverage capture failed: boom"));
    }

    #[test]
    fn test_plain_summary() {
        let reporter = LineReporter::new(false, false);
        assert_eq!(
            reporter.format_summary(&results()),
            "FAILED 2 tests in 1.50s (1 passed, 1 failed, 0 flaky)"
        );
    }

    #[test]
    fn test_retry_is_shown() {
        let reporter = LineReporter::new(false, false);
        let mut result = TestResult::pass("t");
        result.retry = 2;
        assert!(reporter.format_result(&result).contains("(retry #2)"));
    }
}
