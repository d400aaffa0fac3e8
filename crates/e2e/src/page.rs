//! The browser page capability.
//!
//! Everything above this module drives the browser only through `Page`.
//! `PlaywrightPage` is the production implementation; tests substitute a
//! scripted page.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;
use crate::locator::Locator;

/// Element states a wait can target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

/// A cookie added to the page's browser context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

impl Cookie {
    pub fn new(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
        }
    }
}

/// One live browser page inside its own browser context.
///
/// Methods take `&self` so independent waits can run concurrently against
/// the same page.
#[async_trait]
pub trait Page: Send + Sync {
    /// Register a script that runs before any page script on every navigation
    async fn add_init_script(&self, script: &str) -> E2eResult<()>;

    async fn add_cookies(&self, cookies: &[Cookie]) -> E2eResult<()>;

    /// Navigate to `path`, resolved against the base URL
    async fn goto(&self, path: &str) -> E2eResult<()>;

    /// Current absolute URL
    async fn url(&self) -> E2eResult<String>;

    /// Replace the value of an input
    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    async fn focus(&self, locator: &Locator) -> E2eResult<()>;

    /// Type `text` one key at a time with `delay` between keys
    async fn type_text(&self, locator: &Locator, text: &str, delay: Duration) -> E2eResult<()>;

    /// Choose an option of a `<select>` by value
    async fn select_option(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    /// Wait for `locator` to reach `state`. Fails with `E2eError::Timeout`.
    async fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration) -> E2eResult<()>;

    /// Instantaneous visibility check
    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    /// Text content, `None` when nothing matches
    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>>;

    /// Inner HTML, `None` when nothing matches
    async fn inner_html(&self, locator: &Locator) -> E2eResult<Option<String>>;

    /// Raw `localStorage` value for `key`
    async fn local_storage_item(&self, key: &str) -> E2eResult<Option<String>>;

    /// Click and accept the native dialog the click opens.
    ///
    /// Returns the dialog message, or `None` if no dialog opened in `timeout`.
    async fn click_expecting_dialog(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> E2eResult<Option<String>>;

    /// Full-page screenshot written to `path`
    async fn screenshot(&self, path: &Path) -> E2eResult<()>;
}
