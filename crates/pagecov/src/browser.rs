//! Browser control for headless coverage runs.
//!
//! With the `browser` feature this drives Chromium over the Chrome
//! `DevTools` Protocol via chromiumoxide and records precise JS coverage
//! through the `Profiler` domain. Without the feature, pages still navigate
//! (as no-ops) but report coverage as unsupported, which is exactly the
//! environment the coverage controller is built to tolerate.

use crate::driver::{PageDriver, PageFactory};
use crate::result::{PagecovError, PagecovResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            user_agent: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::*;
    use crate::artifact::{CoverageArtifact, ParsedScripts};
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::js_protocol::debugger::{
        DisableParams as DebuggerDisableParams, EnableParams as DebuggerEnableParams,
        EventScriptParsed, GetScriptSourceParams,
    };
    use chromiumoxide::cdp::js_protocol::profiler::{
        DisableParams as ProfilerDisableParams, EnableParams as ProfilerEnableParams,
        StartPreciseCoverageParams, StopPreciseCoverageParams, TakePreciseCoverageParams,
    };
    use chromiumoxide::cdp::js_protocol::runtime::ScriptId;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::sync::{Mutex as StdMutex, PoisonError};
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;

    fn coverage_unsupported(e: impl std::fmt::Display) -> PagecovError {
        PagecovError::CoverageUnsupported {
            message: e.to_string(),
        }
    }

    fn coverage_error(e: impl std::fmt::Display) -> PagecovError {
        PagecovError::CoverageError {
            message: e.to_string(),
        }
    }

    /// Stop the CDP handler task whatever the outcome of closing the browser
    pub(super) fn stop_handler<T, E: std::fmt::Display>(
        closed: Result<T, E>,
        handle: &JoinHandle<()>,
    ) -> PagecovResult<()> {
        handle.abort();
        closed
            .map(|_| ())
            .map_err(|e| PagecovError::BrowserLaunchError {
                message: e.to_string(),
            })
    }

    /// Browser instance with real CDP connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch a new browser instance with real CDP
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> PagecovResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            if let Some(ref ua) = config.user_agent {
                builder = builder.arg(format!("--user-agent={ua}"));
            }

            let cdp_config = builder
                .build()
                .map_err(|message| PagecovError::BrowserLaunchError { message })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                PagecovError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            tracing::debug!(headless = config.headless, "browser launched");

            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Create a new page
        ///
        /// # Errors
        ///
        /// Returns error if page cannot be created
        pub async fn open_page(&self) -> PagecovResult<Page> {
            let browser = self.inner.lock().await;
            let cdp_page =
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| PagecovError::PageError {
                        message: e.to_string(),
                    })?;

            Ok(Page {
                inner: Arc::new(Mutex::new(cdp_page)),
                recorder: Arc::new(Mutex::new(None)),
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        ///
        /// # Errors
        ///
        /// Returns error if the browser does not shut down cleanly
        pub async fn close(self) -> PagecovResult<()> {
            let closed = self.inner.lock().await.close().await;
            stop_handler(closed, &self.handle)
        }
    }

    #[async_trait]
    impl PageFactory for Browser {
        async fn new_page(&self) -> PagecovResult<Arc<dyn PageDriver>> {
            Ok(Arc::new(self.open_page().await?))
        }
    }

    /// A browser page with real CDP connection
    #[derive(Debug, Clone)]
    pub struct Page {
        inner: Arc<Mutex<CdpPage>>,
        recorder: Arc<Mutex<Option<ScriptRecorder>>>,
    }

    /// Collects `Debugger.scriptParsed` events while coverage is recorded
    #[derive(Debug)]
    struct ScriptRecorder {
        parsed: Arc<StdMutex<ParsedScripts>>,
        task: JoinHandle<()>,
    }

    fn parsed_lock(parsed: &StdMutex<ParsedScripts>) -> std::sync::MutexGuard<'_, ParsedScripts> {
        parsed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    impl Page {
        async fn script_source(page: &CdpPage, script_id: ScriptId) -> Option<String> {
            match page.execute(GetScriptSourceParams::new(script_id.clone())).await {
                Ok(resp) => Some(resp.result.script_source),
                Err(e) => {
                    tracing::trace!(?script_id, error = %e, "script source unavailable");
                    None
                }
            }
        }

        async fn record_scripts(page: &CdpPage) -> PagecovResult<ScriptRecorder> {
            let mut events = page
                .event_listener::<EventScriptParsed>()
                .await
                .map_err(coverage_unsupported)?;
            let parsed = Arc::new(StdMutex::new(ParsedScripts::default()));
            let listener_page = page.clone();
            let sink = Arc::clone(&parsed);
            let task = tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    let id = event.script_id.inner().clone();
                    if !parsed_lock(&sink).record(&id, &event.url) {
                        continue;
                    }
                    if let Some(source) =
                        Self::script_source(&listener_page, event.script_id.clone()).await
                    {
                        parsed_lock(&sink).set_source(&id, source);
                    }
                }
            });
            Ok(ScriptRecorder { parsed, task })
        }
    }

    #[async_trait]
    impl PageDriver for Page {
        async fn goto(&self, url: &str) -> PagecovResult<()> {
            let page = self.inner.lock().await;
            page.goto(url)
                .await
                .map_err(|e| PagecovError::NavigationError {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn current_url(&self) -> PagecovResult<String> {
            let page = self.inner.lock().await;
            let url = page.url().await.map_err(|e| PagecovError::PageError {
                message: e.to_string(),
            })?;
            Ok(url.unwrap_or_else(|| String::from("about:blank")))
        }

        async fn start_js_coverage(&self) -> PagecovResult<()> {
            let page = self.inner.lock().await;
            let recorder = Self::record_scripts(&page).await?;
            if let Some(stale) = self.recorder.lock().await.replace(recorder) {
                stale.task.abort();
            }
            let started = async {
                page.execute(ProfilerEnableParams::default()).await?;
                page.execute(DebuggerEnableParams::default()).await?;
                let params = StartPreciseCoverageParams::builder()
                    .call_count(true)
                    .detailed(true)
                    .build();
                page.execute(params).await?;
                Ok::<_, chromiumoxide::error::CdpError>(())
            }
            .await;
            if let Err(e) = started {
                if let Some(recorder) = self.recorder.lock().await.take() {
                    recorder.task.abort();
                }
                return Err(coverage_unsupported(e));
            }
            Ok(())
        }

        async fn stop_js_coverage(&self) -> PagecovResult<CoverageArtifact> {
            let page = self.inner.lock().await;
            let taken = page
                .execute(TakePreciseCoverageParams::default())
                .await
                .map_err(coverage_error)?;
            page.execute(StopPreciseCoverageParams::default())
                .await
                .map_err(coverage_error)?;
            page.execute(ProfilerDisableParams::default())
                .await
                .map_err(coverage_error)?;

            let recorder = self
                .recorder
                .lock()
                .await
                .take()
                .ok_or_else(|| coverage_error("Precise coverage has not been started"))?;
            recorder.task.abort();

            let entries = taken
                .result
                .result
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            let missing = parsed_lock(&recorder.parsed).missing_sources();
            for id in missing {
                if let Some(source) = Self::script_source(&page, ScriptId::new(id.clone())).await {
                    parsed_lock(&recorder.parsed).set_source(&id, source);
                }
            }
            let scripts = parsed_lock(&recorder.parsed).report(entries);

            page.execute(DebuggerDisableParams::default())
                .await
                .map_err(coverage_error)?;

            Ok(CoverageArtifact::new(serde_json::Value::Array(scripts)))
        }

        async fn close(&self) -> PagecovResult<()> {
            let page = self.inner.lock().await.clone();
            page.close().await.map_err(|e| PagecovError::PageError {
                message: e.to_string(),
            })
        }
    }
}

// ============================================================================
// Fallback Implementation (when `browser` feature is NOT enabled)
// ============================================================================

#[cfg(not(feature = "browser"))]
mod fallback {
    use super::*;
    use crate::artifact::CoverageArtifact;
    use tokio::sync::Mutex;

    const NO_BROWSER: &str =
        "Browser feature not enabled. Enable 'browser' feature for real CDP support.";

    /// Browser instance without a real connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
    }

    impl Browser {
        /// Launch a new browser instance (no-op)
        ///
        /// # Errors
        ///
        /// Never fails in fallback mode
        pub async fn launch(config: BrowserConfig) -> PagecovResult<Self> {
            tracing::debug!("browser feature disabled, using fallback pages");
            Ok(Self { config })
        }

        /// Create a new page
        ///
        /// # Errors
        ///
        /// Never fails in fallback mode
        pub async fn open_page(&self) -> PagecovResult<Page> {
            Ok(Page::default())
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        ///
        /// # Errors
        ///
        /// Never fails in fallback mode
        pub async fn close(self) -> PagecovResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl PageFactory for Browser {
        async fn new_page(&self) -> PagecovResult<Arc<dyn PageDriver>> {
            Ok(Arc::new(self.open_page().await?))
        }
    }

    /// A page without a browser behind it
    #[derive(Debug)]
    pub struct Page {
        url: Mutex<String>,
    }

    impl Default for Page {
        fn default() -> Self {
            Self {
                url: Mutex::new(String::from("about:blank")),
            }
        }
    }

    #[async_trait]
    impl PageDriver for Page {
        async fn goto(&self, url: &str) -> PagecovResult<()> {
            *self.url.lock().await = url.to_string();
            Ok(())
        }

        async fn current_url(&self) -> PagecovResult<String> {
            Ok(self.url.lock().await.clone())
        }

        async fn start_js_coverage(&self) -> PagecovResult<()> {
            Err(PagecovError::CoverageUnsupported {
                message: NO_BROWSER.to_string(),
            })
        }

        async fn stop_js_coverage(&self) -> PagecovResult<CoverageArtifact> {
            Err(PagecovError::CoverageError {
                message: NO_BROWSER.to_string(),
            })
        }

        async fn close(&self) -> PagecovResult<()> {
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, Page};

#[cfg(not(feature = "browser"))]
pub use fallback::{Browser, Page};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_config_default() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert!(config.sandbox);
        assert!(config.chromium_path.is_none());
    }

    #[test]
    fn test_browser_config_builder() {
        let config = BrowserConfig::default()
            .with_viewport(800, 600)
            .with_headless(false)
            .with_chromium_path("/usr/bin/chromium")
            .with_user_agent("pagecov")
            .with_no_sandbox();
        assert_eq!(config.viewport_width, 800);
        assert_eq!(config.viewport_height, 600);
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(config.user_agent.as_deref(), Some("pagecov"));
    }

    #[test]
    fn test_browser_config_partial_yaml_uses_defaults() {
        let config: BrowserConfig = serde_yaml_ng::from_str("headless: false\n").unwrap();
        assert!(!config.headless);
        assert_eq!(config.viewport_width, 1280);
    }

    #[cfg(not(feature = "browser"))]
    #[tokio::test]
    async fn test_fallback_page_reports_coverage_unsupported() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        let page = browser.new_page().await.unwrap();
        page.goto("http://127.0.0.1:3000/").await.unwrap();
        assert_eq!(page.current_url().await.unwrap(), "http://127.0.0.1:3000/");
        let err = page.start_js_coverage().await.unwrap_err();
        assert!(matches!(err, PagecovError::CoverageUnsupported { .. }));
    }

    #[cfg(feature = "browser")]
    #[tokio::test]
    async fn test_handler_stopped_when_close_fails() {
        let handle = tokio::spawn(futures::future::pending::<()>());
        let err = cdp::stop_handler::<(), _>(Err("connection reset"), &handle).unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        let joined = handle.await;
        assert!(joined.unwrap_err().is_cancelled());
    }
}
