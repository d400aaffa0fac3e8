//! Session bootstrap: from a blank browser context to an authenticated,
//! interactive application.
//!
//! ```text
//! Init ──▶ FormSubmitted ──┬──▶ Navigated ──▶ bootstrap wait ──▶ ready
//!   ▲                      ├──▶ ErrorShown ──▶ fail (never retried)
//!   └──── (attempts left) ─┴──▶ TimedOut ────▶ fail (attempts exhausted)
//! ```
//!
//! The outcome of a submit is a race between the URL leaving the login path
//! and the login error banner becoming visible. Whichever is observed first
//! wins; neither within the deadline means `TimedOut`.

use std::time::Duration;

use pos_e2e_common::client_state::{UiPreferences, APP_STORAGE_KEY, UI_STORAGE_KEY};
use pos_e2e_common::timeouts::{LOADER_PROBE, UI_TIMEOUT};
use pos_e2e_common::Settings;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifacts::Artifacts;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{Cookie, Page, WaitState};
use crate::wait::{first_some, poll_until, probe_visible};

/// Result of one credential submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Navigated,
    ErrorShown(String),
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Init,
    FormSubmitted,
    Navigated,
    ErrorShown,
    TimedOut,
}

impl From<&SessionOutcome> for LoginState {
    fn from(outcome: &SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::Navigated => LoginState::Navigated,
            SessionOutcome::ErrorShown(_) => LoginState::ErrorShown,
            SessionOutcome::TimedOut => LoginState::TimedOut,
        }
    }
}

/// Elements of the login page and application shell
#[derive(Debug, Clone)]
pub struct LoginSelectors {
    pub username: Locator,
    pub password: Locator,
    pub submit: Locator,
    pub error: Locator,
    pub loader: Locator,
    pub root_ready: Locator,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            username: Locator::css("input[name=\"username\"]"),
            password: Locator::css("input[name=\"password\"]"),
            submit: Locator::css("button[type=\"submit\"]"),
            error: Locator::css("#login-error"),
            loader: Locator::css(".cold-start-loader"),
            root_ready: Locator::css("#root:not(:empty)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Language the UI is pinned to
    pub locale: String,
    pub login_path: String,

    /// Submissions allowed when the outcome times out
    pub max_attempts: u32,

    pub ui_timeout: Duration,
    pub loader_probe: Duration,
    pub selectors: LoginSelectors,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            locale: "es".to_string(),
            login_path: "/login".to_string(),
            max_attempts: 2,
            ui_timeout: UI_TIMEOUT,
            loader_probe: LOADER_PROBE,
            selectors: LoginSelectors::default(),
        }
    }
}

/// Client state written before the application's own scripts run.
///
/// - `language`: forced into `navigator.language(s)`, `i18nextLng` and
///   `<uiStorageKey>.state.language`
/// - `uiDefaults`: stored under `uiStorageKey` when no usable store exists
/// - `tenantId`: made active in `<appStorageKey>` if the store lists it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedPayload {
    pub language: String,
    pub ui_storage_key: String,
    pub app_storage_key: String,
    pub ui_defaults: UiPreferences,
    pub tenant_id: Option<String>,
}

impl SeedPayload {
    pub fn new(locale: &str, tenant_id: Option<&str>) -> Self {
        Self {
            language: locale.to_string(),
            ui_storage_key: UI_STORAGE_KEY.to_string(),
            app_storage_key: APP_STORAGE_KEY.to_string(),
            ui_defaults: UiPreferences::with_language(locale),
            tenant_id: tenant_id.map(String::from),
        }
    }

    /// Init script applying this payload
    pub fn to_script(&self) -> E2eResult<String> {
        Ok(format!("({})({});", SEED_FN, serde_json::to_string(self)?))
    }
}

const SEED_FN: &str = r#"(seed) => {
  try {
    Object.defineProperty(navigator, 'languages', { get: () => [seed.language] });
    Object.defineProperty(navigator, 'language', { get: () => seed.language });
  } catch (e) {}
  try {
    const storage = window.localStorage;
    storage.setItem('i18nextLng', seed.language);

    let prefs = null;
    try { prefs = JSON.parse(storage.getItem(seed.uiStorageKey) || 'null'); } catch (e) {}
    if (prefs && typeof prefs === 'object' && prefs.state && typeof prefs.state === 'object') {
      prefs.state.language = seed.language;
    } else {
      prefs = seed.uiDefaults;
    }
    storage.setItem(seed.uiStorageKey, JSON.stringify(prefs));

    if (seed.tenantId) {
      let app = null;
      try { app = JSON.parse(storage.getItem(seed.appStorageKey) || 'null'); } catch (e) {}
      const tenants = app && app.state && Array.isArray(app.state.tenants) ? app.state.tenants : [];
      const match = tenants.find((t) => t && String(t.id) === seed.tenantId);
      if (match) {
        app.state.activeTenantId = match.id;
        storage.setItem(seed.appStorageKey, JSON.stringify(app));
      }
    }
  } catch (e) {}
}"#;

/// Whether `url` is on the login page
pub fn is_login_url(url: &str) -> bool {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    path.to_ascii_lowercase().contains("/login")
}

/// Append the `lng` locale hint to a path
pub fn with_locale(path: &str, locale: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}lng={}", path, separator, locale)
}

/// Host the locale cookies are scoped to
pub fn cookie_domain(base_url: &str) -> String {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(String::from))
        .unwrap_or_else(|| "localhost".to_string())
}

/// Drives the login page until the application is authenticated and ready
pub struct SessionBootstrapper<'a, P: Page + ?Sized> {
    page: &'a P,
    config: &'a BootstrapConfig,
    artifacts: &'a Artifacts,
}

impl<'a, P: Page + ?Sized> SessionBootstrapper<'a, P> {
    pub fn new(page: &'a P, config: &'a BootstrapConfig, artifacts: &'a Artifacts) -> Self {
        Self {
            page,
            config,
            artifacts,
        }
    }

    /// Log in with `settings` and return once the app is interactive.
    ///
    /// Never returns while the page is still on the login path or the
    /// application root is empty.
    pub async fn login(&self, settings: &Settings) -> E2eResult<()> {
        self.seed_client_state(settings).await?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.transition(LoginState::Init, attempt);
            self.page
                .goto(&with_locale(&self.config.login_path, &self.config.locale))
                .await?;

            self.submit_credentials(&settings.username, &settings.password)
                .await?;
            self.transition(LoginState::FormSubmitted, attempt);

            let outcome = self.await_outcome().await?;
            self.transition(LoginState::from(&outcome), attempt);

            match outcome {
                SessionOutcome::Navigated => break,
                SessionOutcome::ErrorShown(message) => {
                    let url = self.current_url().await;
                    let screenshot = self.artifacts.capture(self.page, "login-rejected").await;
                    return Err(E2eError::CredentialRejected {
                        message,
                        url,
                        screenshot,
                    });
                }
                SessionOutcome::TimedOut if attempt < self.config.max_attempts => {
                    warn!(
                        "Login outcome not observed (attempt {}/{}), retrying",
                        attempt, self.config.max_attempts
                    );
                }
                SessionOutcome::TimedOut => {
                    let url = self.current_url().await;
                    warn!("Login failed. Current URL: {}", url);
                    let screenshot = self.artifacts.capture(self.page, "login-timeout").await;
                    return Err(E2eError::LoginTimedOut {
                        attempts: attempt,
                        url,
                        screenshot,
                    });
                }
            }
        }

        self.wait_for_bootstrap().await?;
        self.verify_left_login().await?;
        self.check_language().await;

        info!("Logged in as {}", settings.username);
        Ok(())
    }

    /// Register the seed script and locale cookies ahead of navigation
    pub async fn seed_client_state(&self, settings: &Settings) -> E2eResult<()> {
        let payload = SeedPayload::new(&self.config.locale, settings.tenant_id.as_deref());
        self.page.add_init_script(&payload.to_script()?).await?;

        let domain = cookie_domain(&settings.base_url);
        self.page
            .add_cookies(&[
                Cookie::new("i18next", &self.config.locale, &domain),
                Cookie::new("i18nextLng", &self.config.locale, &domain),
            ])
            .await?;

        debug!("Seeded client state (locale {}, domain {})", self.config.locale, domain);
        Ok(())
    }

    /// Fill and submit the login form without waiting for the result
    pub async fn submit_credentials(&self, username: &str, password: &str) -> E2eResult<()> {
        let selectors = &self.config.selectors;
        self.page.fill(&selectors.username, username).await?;
        self.page.fill(&selectors.password, password).await?;
        self.page.click(&selectors.submit).await
    }

    /// Race navigation away from login against the error banner.
    ///
    /// Losing the browser ends the race with that error instead of waiting
    /// out the full timeout.
    pub async fn await_outcome(&self) -> E2eResult<SessionOutcome> {
        let page = self.page;
        let timeout = self.config.ui_timeout;
        let error = &self.config.selectors.error;

        let navigated = poll_until(timeout, move || async move {
            match page.url().await {
                Ok(url) => Ok((!is_login_url(&url)).then_some(Ok(SessionOutcome::Navigated))),
                Err(e) if e.is_timeout() => Ok(None),
                Err(e) => Ok(Some(Err(e))),
            }
        });

        let rejected = async move {
            page.wait_for(error, WaitState::Visible, timeout).await.ok()?;
            let text = page
                .text_content(error)
                .await
                .ok()
                .flatten()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "no detail".to_string());
            Some(Ok(SessionOutcome::ErrorShown(text)))
        };

        let outcome = first_some(navigated, rejected, timeout).await.transpose()?;
        Ok(outcome.unwrap_or(SessionOutcome::TimedOut))
    }

    /// Wait out the cold-start loader, then for a rendered application root.
    ///
    /// A loader that never shows up within the probe window is taken to mean
    /// the application was already warm.
    pub async fn wait_for_bootstrap(&self) -> E2eResult<()> {
        let selectors = &self.config.selectors;

        if probe_visible(self.page, &selectors.loader, self.config.loader_probe).await {
            info!("[Bootstrap] Cold start loader detected, waiting for it to finish...");
            self.page
                .wait_for(&selectors.loader, WaitState::Hidden, self.config.ui_timeout)
                .await
                .map_err(|_| E2eError::Timeout("cold-start loader to finish".to_string()))?;
            info!("[Bootstrap] Cold start finished.");
        } else {
            debug!("[Bootstrap] No loader detected or already finished.");
        }

        self.page
            .wait_for(&selectors.root_ready, WaitState::Attached, self.config.ui_timeout)
            .await
    }

    async fn verify_left_login(&self) -> E2eResult<()> {
        let url = self.page.url().await?;
        if is_login_url(&url) {
            return Err(E2eError::AssertionFailed(format!(
                "still on the login page after bootstrap: {}",
                url
            )));
        }
        Ok(())
    }

    async fn check_language(&self) {
        let raw = self.page.local_storage_item(UI_STORAGE_KEY).await.ok().flatten();
        let prefs = UiPreferences::parse(raw.as_deref());
        match prefs.state.language.as_deref() {
            Some(language) if language == self.config.locale => {}
            other => warn!(
                "UI language is {:?}, expected {:?}; labels may not match",
                other, self.config.locale
            ),
        }
    }

    async fn current_url(&self) -> String {
        self.page
            .url()
            .await
            .unwrap_or_else(|_| "<unknown>".to_string())
    }

    fn transition(&self, state: LoginState, attempt: u32) {
        debug!("login attempt {}: {:?}", attempt, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_login_url() {
        assert!(is_login_url("http://localhost:5173/login"));
        assert!(is_login_url("http://localhost:5173/login?lng=es"));
        assert!(is_login_url("http://localhost:5173/LOGIN#top"));
        assert!(is_login_url("/login"));
        assert!(!is_login_url("http://localhost:5173/"));
        assert!(!is_login_url("http://localhost:5173/dashboard?next=/login"));
    }

    #[test]
    fn test_with_locale() {
        assert_eq!(with_locale("/login", "es"), "/login?lng=es");
        assert_eq!(with_locale("/pos?tab=1", "es"), "/pos?tab=1&lng=es");
    }

    #[test]
    fn test_cookie_domain() {
        assert_eq!(cookie_domain("http://localhost:5173"), "localhost");
        assert_eq!(cookie_domain("https://pos.example.com/app"), "pos.example.com");
        assert_eq!(cookie_domain("not a url"), "localhost");
    }

    #[test]
    fn test_seed_script_embeds_payload() {
        let script = SeedPayload::new("es", Some("t-2")).to_script().unwrap();
        assert!(script.starts_with("((seed) => {"));
        assert!(script.contains(r#""language":"es""#));
        assert!(script.contains(r#""uiStorageKey":"pos_ui_storage""#));
        assert!(script.contains(r#""appStorageKey":"pos_app_storage""#));
        assert!(script.contains(r#""uiDefaults":{"state":{"language":"es"},"version":0}"#));
        assert!(script.contains(r#""tenantId":"t-2""#));
        assert!(script.trim_end().ends_with(");"));
    }
}
