//! Per-test fixtures handed to hooks and test bodies.
//!
//! Every test attempt gets a [`TestContext`] (the page it owns) and a
//! [`TestInfo`] (who it is and where it may write files). Output
//! directories are derived from the project and test title so that
//! artifacts with a fixed file name never collide between tests or between
//! retries of the same test.

use crate::driver::PageDriver;
use crate::result::{PagecovError, PagecovResult};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Longest sanitized title kept in a directory name, in characters
const MAX_DIR_TITLE_CHARS: usize = 60;

fn unsafe_path_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\x00-\x2C\x2E-\x2F\x3A-\x40\x5B-\x60\x7B-\x7F]+")
            .expect("static path pattern compiles")
    })
}

/// Replace runs of characters that are unsafe in file names with `-`
#[must_use]
pub fn sanitize_for_file_path(s: &str) -> String {
    unsafe_path_chars().replace_all(s, "-").into_owned()
}

/// Directory name for one attempt of one test.
///
/// `<sanitized project-title>-<hash>` with `-retryN` appended for retries.
/// The hash covers the unsanitized project and title so titles that
/// sanitize to the same text still get separate directories.
#[must_use]
pub fn test_output_dir_name(project: &str, title: &str, retry: u32) -> String {
    let readable = sanitize_for_file_path(&format!("{project}-{title}"));
    let readable: String = readable.chars().take(MAX_DIR_TITLE_CHARS).collect();
    let digest = format!("{:x}", Sha256::digest(format!("{project}\u{0}{title}")));
    let mut name = format!("{}-{}", readable.trim_end_matches('-'), &digest[..5]);
    if retry > 0 {
        name.push_str(&format!("-retry{retry}"));
    }
    name
}

/// Page access for one test attempt
#[derive(Clone)]
pub struct TestContext {
    page: Arc<dyn PageDriver>,
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext").finish_non_exhaustive()
    }
}

impl TestContext {
    /// Create a context around a page
    #[must_use]
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self { page }
    }

    /// The page owned by this test
    #[must_use]
    pub fn page(&self) -> &dyn PageDriver {
        self.page.as_ref()
    }

    /// Shared handle to the page
    #[must_use]
    pub fn page_handle(&self) -> Arc<dyn PageDriver> {
        Arc::clone(&self.page)
    }
}

/// Identity and output location of one test attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestInfo {
    /// Test title
    pub title: String,
    /// Project (suite) name
    pub project: String,
    /// Attempt index, 0 for the first run
    pub retry: u32,
    output_dir: PathBuf,
}

impl TestInfo {
    /// Describe an attempt whose outputs live under `output_root`
    #[must_use]
    pub fn new(
        output_root: impl AsRef<Path>,
        project: impl Into<String>,
        title: impl Into<String>,
        retry: u32,
    ) -> Self {
        let project = project.into();
        let title = title.into();
        let output_dir = output_root
            .as_ref()
            .join(test_output_dir_name(&project, &title, retry));
        Self {
            title,
            project,
            retry,
            output_dir,
        }
    }

    /// Directory reserved for this attempt
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolve a file inside this attempt's output directory.
    ///
    /// Creates the directory if needed, blocking the calling thread; async
    /// callers use [`TestInfo::output_path_async`]. The segment must be
    /// relative and must not climb out of the directory.
    ///
    /// # Errors
    ///
    /// Returns [`PagecovError::InvalidOutputPath`] for escaping segments and
    /// an I/O error if the directory cannot be created.
    pub fn output_path(&self, segment: impl AsRef<Path>) -> PagecovResult<PathBuf> {
        let path = self.checked_path(segment.as_ref())?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(path)
    }

    /// [`TestInfo::output_path`] creating the directory with `tokio::fs`
    ///
    /// # Errors
    ///
    /// Same as [`TestInfo::output_path`].
    pub async fn output_path_async(&self, segment: impl AsRef<Path>) -> PagecovResult<PathBuf> {
        let path = self.checked_path(segment.as_ref())?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(path)
    }

    fn checked_path(&self, segment: &Path) -> PagecovResult<PathBuf> {
        let escapes = segment.as_os_str().is_empty()
            || segment
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(PagecovError::InvalidOutputPath {
                segment: segment.display().to_string(),
                output_dir: self.output_dir.clone(),
            });
        }
        Ok(self.output_dir.join(segment))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::MockPage;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_replaces_unsafe_runs() {
        assert_eq!(sanitize_for_file_path("opens page: /index.html"), "opens-page-index-html");
        assert_eq!(sanitize_for_file_path("a-b-c1"), "a-b-c1");
        assert_eq!(sanitize_for_file_path("snake_case"), "snake-case");
    }

    #[test]
    fn test_sanitize_keeps_non_ascii() {
        assert_eq!(sanitize_for_file_path("打开页面"), "打开页面");
    }

    #[test]
    fn test_dir_name_is_stable() {
        let a = test_output_dir_name("dev", "loads home", 0);
        let b = test_output_dir_name("dev", "loads home", 0);
        assert_eq!(a, b);
        assert!(a.starts_with("dev-loads-home-"));
    }

    #[test]
    fn test_dir_name_distinguishes_titles_that_sanitize_alike() {
        let a = test_output_dir_name("dev", "a/b", 0);
        let b = test_output_dir_name("dev", "a:b", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_dir_name_retry_suffix() {
        let first = test_output_dir_name("dev", "flaky", 0);
        let retry = test_output_dir_name("dev", "flaky", 2);
        assert!(retry.ends_with("-retry2"));
        assert!(retry.starts_with(&first));
    }

    #[test]
    fn test_dir_name_truncates_long_titles() {
        let title = "x".repeat(500);
        let name = test_output_dir_name("dev", &title, 0);
        assert!(name.chars().count() <= MAX_DIR_TITLE_CHARS + 6);
    }

    #[test]
    fn test_output_path_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let info = TestInfo::new(tmp.path(), "dev", "creates dir", 0);
        assert!(!info.output_dir().exists());
        let path = info.output_path("v8-coverage.json").unwrap();
        assert!(info.output_dir().is_dir());
        assert_eq!(path.parent().unwrap(), info.output_dir());
    }

    #[test]
    fn test_output_path_rejects_escapes() {
        let tmp = TempDir::new().unwrap();
        let info = TestInfo::new(tmp.path(), "dev", "escape", 0);
        for bad in ["../x.json", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(
                    info.output_path(bad),
                    Err(PagecovError::InvalidOutputPath { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(info.output_path("nested/ok.json").is_ok());
    }

    #[tokio::test]
    async fn test_output_path_async_creates_directory_and_rejects_escapes() {
        let tmp = TempDir::new().unwrap();
        let info = TestInfo::new(tmp.path(), "dev", "async", 0);
        assert!(matches!(
            info.output_path_async("../x.json").await,
            Err(PagecovError::InvalidOutputPath { .. })
        ));
        assert!(!info.output_dir().exists());

        let path = info.output_path_async("v8-coverage.json").await.unwrap();
        assert!(info.output_dir().is_dir());
        assert_eq!(path, info.output_dir().join("v8-coverage.json"));
    }

    #[tokio::test]
    async fn test_context_exposes_page() {
        let page = MockPage::new();
        let ctx = TestContext::new(Arc::new(page.clone()));
        ctx.page().goto("http://localhost/").await.unwrap();
        assert!(page.was_called("goto"));
        let other = ctx.clone();
        assert!(Arc::ptr_eq(&ctx.page_handle(), &other.page_handle()));
    }

    proptest! {
        #[test]
        fn prop_artifact_file_name_is_fixed(title in ".{0,80}", retry in 0u32..4) {
            let tmp = TempDir::new().unwrap();
            let info = TestInfo::new(tmp.path(), "dev", title, retry);
            let path = info.output_path(crate::artifact::ARTIFACT_FILE_NAME).unwrap();
            prop_assert_eq!(
                path.file_name().and_then(|n| n.to_str()),
                Some("v8-coverage.json")
            );
            prop_assert_eq!(path.parent().unwrap(), info.output_dir());
            prop_assert!(path.starts_with(tmp.path()));
        }

        #[test]
        fn prop_dir_name_is_single_component(project in ".{0,20}", title in ".{0,80}") {
            let name = test_output_dir_name(&project, &title, 0);
            prop_assert!(!name.contains('/'));
            prop_assert!(!name.contains('\\'));
            prop_assert!(name != "." && name != "..");
        }
    }
}
