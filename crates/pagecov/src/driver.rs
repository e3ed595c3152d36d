//! Abstract page automation traits.
//!
//! The harness and the coverage controller only talk to pages through
//! [`PageDriver`], and only obtain pages through [`PageFactory`]. The CDP
//! browser in [`crate::browser`] implements both; [`MockPage`] and
//! [`MockBrowser`] are in-process doubles that record every call so hook
//! behavior can be verified without launching Chromium.

use crate::artifact::CoverageArtifact;
use crate::result::{PagecovError, PagecovResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A single browser page owned by one test
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL
    async fn goto(&self, url: &str) -> PagecovResult<()>;

    /// Get current URL
    async fn current_url(&self) -> PagecovResult<String>;

    /// Begin recording JS coverage.
    ///
    /// Fails with [`PagecovError::CoverageUnsupported`] (or any other error)
    /// when the browser or mode cannot record coverage.
    async fn start_js_coverage(&self) -> PagecovResult<()>;

    /// Stop recording and return everything collected since the start
    async fn stop_js_coverage(&self) -> PagecovResult<CoverageArtifact>;

    /// Close the page
    async fn close(&self) -> PagecovResult<()>;
}

/// Source of fresh pages, one per test attempt
#[async_trait]
pub trait PageFactory: Send + Sync {
    /// Open a new page
    async fn new_page(&self) -> PagecovResult<Arc<dyn PageDriver>>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct MockPageState {
    url: Mutex<String>,
    start_error: Mutex<Option<String>>,
    stop_result: Mutex<Result<CoverageArtifact, String>>,
    recording: AtomicBool,
    closed: AtomicBool,
    call_history: Mutex<Vec<String>>,
}

/// Mock page for unit testing.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the harness drives another.
#[derive(Debug, Clone)]
pub struct MockPage {
    state: Arc<MockPageState>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPage {
    /// Create a page whose coverage calls succeed with an empty artifact
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockPageState {
                url: Mutex::new(String::from("about:blank")),
                start_error: Mutex::new(None),
                stop_result: Mutex::new(Ok(CoverageArtifact::empty())),
                recording: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                call_history: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Make `start_js_coverage` fail with the given message
    #[must_use]
    pub fn with_start_error(self, message: impl Into<String>) -> Self {
        *lock(&self.state.start_error) = Some(message.into());
        self
    }

    /// Make `stop_js_coverage` return the given value
    #[must_use]
    pub fn with_artifact(self, value: serde_json::Value) -> Self {
        *lock(&self.state.stop_result) = Ok(CoverageArtifact::new(value));
        self
    }

    /// Make `stop_js_coverage` fail with the given message
    #[must_use]
    pub fn with_stop_error(self, message: impl Into<String>) -> Self {
        *lock(&self.state.stop_result) = Err(message.into());
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        lock(&self.state.call_history).clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        lock(&self.state.call_history)
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Whether coverage is currently being recorded
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state.recording.load(Ordering::SeqCst)
    }

    /// Whether the page was closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        lock(&self.state.call_history).push(call);
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn goto(&self, url: &str) -> PagecovResult<()> {
        self.record(format!("goto:{url}"));
        *lock(&self.state.url) = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> PagecovResult<String> {
        Ok(lock(&self.state.url).clone())
    }

    async fn start_js_coverage(&self) -> PagecovResult<()> {
        self.record("start_js_coverage".to_string());
        if let Some(message) = lock(&self.state.start_error).clone() {
            return Err(PagecovError::CoverageUnsupported { message });
        }
        self.state.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_js_coverage(&self) -> PagecovResult<CoverageArtifact> {
        self.record("stop_js_coverage".to_string());
        if !self.state.recording.swap(false, Ordering::SeqCst) {
            return Err(PagecovError::CoverageError {
                message: "Precise coverage has not been started".to_string(),
            });
        }
        lock(&self.state.stop_result)
            .clone()
            .map_err(|message| PagecovError::CoverageError { message })
    }

    async fn close(&self) -> PagecovResult<()> {
        self.record("close".to_string());
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock page factory.
///
/// Hands out queued pages in order, then default [`MockPage`]s. Every page
/// handed out is remembered for later inspection.
#[derive(Debug, Default)]
pub struct MockBrowser {
    queued: Mutex<VecDeque<MockPage>>,
    created: Mutex<Vec<MockPage>>,
}

impl MockBrowser {
    /// Create a new mock browser
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page to be returned by the next `new_page` call
    #[must_use]
    pub fn with_page(self, page: MockPage) -> Self {
        lock(&self.queued).push_back(page);
        self
    }

    /// Pages handed out so far, in order
    #[must_use]
    pub fn pages(&self) -> Vec<MockPage> {
        lock(&self.created).clone()
    }
}

#[async_trait]
impl PageFactory for MockBrowser {
    async fn new_page(&self) -> PagecovResult<Arc<dyn PageDriver>> {
        let page = lock(&self.queued).pop_front().unwrap_or_default();
        lock(&self.created).push(page.clone());
        Ok(Arc::new(page))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_page_navigate() {
        let page = MockPage::new();
        page.goto("http://127.0.0.1:3000/index.html").await.unwrap();
        assert_eq!(
            page.current_url().await.unwrap(),
            "http://127.0.0.1:3000/index.html"
        );
        assert!(page.was_called("goto"));
    }

    #[tokio::test]
    async fn test_mock_page_coverage_cycle() {
        let page = MockPage::new().with_artifact(json!([{ "url": "a.js" }]));
        page.start_js_coverage().await.unwrap();
        assert!(page.is_recording());
        let artifact = page.stop_js_coverage().await.unwrap();
        assert_eq!(artifact.into_value(), json!([{ "url": "a.js" }]));
        assert!(!page.is_recording());
        assert_eq!(page.history(), vec!["start_js_coverage", "stop_js_coverage"]);
    }

    #[tokio::test]
    async fn test_mock_page_start_error_is_unsupported() {
        let page = MockPage::new().with_start_error("not supported");
        let err = page.start_js_coverage().await.unwrap_err();
        assert!(matches!(err, PagecovError::CoverageUnsupported { .. }));
        assert!(!page.is_recording());
    }

    #[tokio::test]
    async fn test_mock_page_stop_without_start_fails() {
        let page = MockPage::new();
        let err = page.stop_js_coverage().await.unwrap_err();
        assert!(matches!(err, PagecovError::CoverageError { .. }));
    }

    #[tokio::test]
    async fn test_mock_page_stop_error() {
        let page = MockPage::new().with_stop_error("target closed");
        page.start_js_coverage().await.unwrap();
        let err = page.stop_js_coverage().await.unwrap_err();
        assert!(err.to_string().contains("target closed"));
    }

    #[tokio::test]
    async fn test_mock_browser_hands_out_queued_pages_first() {
        let first = MockPage::new().with_start_error("nope");
        let browser = MockBrowser::new().with_page(first.clone());

        let a = browser.new_page().await.unwrap();
        let b = browser.new_page().await.unwrap();
        assert!(a.start_js_coverage().await.is_err());
        assert!(b.start_js_coverage().await.is_ok());

        let pages = browser.pages();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].was_called("start_js_coverage"));
        assert!(first.was_called("start_js_coverage"));
    }

    #[tokio::test]
    async fn test_mock_page_close() {
        let page = MockPage::new();
        page.close().await.unwrap();
        assert!(page.is_closed());
    }
}
