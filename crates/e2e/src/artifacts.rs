//! Failure artifacts: screenshots and page state captured before an error
//! is raised, since a browser failure cannot be inspected after the fact.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::locator::Locator;
use crate::page::Page;

/// Where failure screenshots are written
#[derive(Debug, Clone)]
pub struct Artifacts {
    dir: PathBuf,
}

impl Default for Artifacts {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Artifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `failure-<context>-<epochms>.png` inside the artifact directory
    pub fn failure_path(&self, context: &str) -> PathBuf {
        let context: String = context
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        let stamp = chrono::Utc::now().timestamp_millis();
        self.dir.join(format!("failure-{}-{}.png", context, stamp))
    }

    /// Best-effort screenshot. Never fails; the caller is already failing.
    pub async fn capture<P: Page + ?Sized>(&self, page: &P, context: &str) -> Option<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("Cannot create artifact dir {}: {}", self.dir.display(), e);
            return None;
        }

        let path = self.failure_path(context);
        match page.screenshot(&path).await {
            Ok(()) => {
                info!("Failure screenshot saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Failure screenshot for {} not captured: {}", context, e);
                None
            }
        }
    }

    /// Screenshot plus URL and application root markup
    pub async fn diagnose<P: Page + ?Sized>(&self, page: &P, context: &str) -> Diagnostics {
        let screenshot = self.capture(page, context).await;
        let url = page.url().await.unwrap_or_else(|_| "<unknown>".to_string());
        let root_html = page
            .inner_html(&Locator::css("#root"))
            .await
            .ok()
            .flatten();

        let diagnostics = Diagnostics {
            url,
            screenshot,
            root_html,
        };
        diagnostics.log(context);
        diagnostics
    }
}

/// Page state captured at the moment of a failure
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub url: String,
    pub screenshot: Option<PathBuf>,
    pub root_html: Option<String>,
}

impl Diagnostics {
    fn log(&self, context: &str) {
        warn!("[{}] Current URL: {}", context, self.url);
        match &self.root_html {
            Some(html) => warn!("[{}] Root HTML: {}", context, truncate(html, 2000)),
            None => warn!("[{}] Root HTML: EMPTY", context),
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
