//! Error types for E2E testing

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(#[from] pos_e2e_common::Error),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Playwright bridge exited")]
    BridgeClosed,

    #[error("Login rejected by the UI at {url}: {message}{}", shot(screenshot))]
    CredentialRejected {
        message: String,
        url: String,
        screenshot: Option<PathBuf>,
    },

    #[error(
        "Login did not complete after {attempts} attempt(s) (still at {url}). \
         Check that the backend is healthy and that TEST_USERNAME/TEST_PASSWORD \
         in the local or root .env match a real user.{}",
        shot(screenshot)
    )]
    LoginTimedOut {
        attempts: u32,
        url: String,
        screenshot: Option<PathBuf>,
    },

    #[error("Tenant {requested} is not assigned to the test user (available: [{}])", available.join(", "))]
    TenantNotAssigned {
        requested: String,
        available: Vec<String>,
    },

    #[error(
        "Could not switch to tenant {requested} (active tenant: {}){}",
        active.as_deref().unwrap_or("none"),
        shot(screenshot)
    )]
    TenantSwitchFailed {
        requested: String,
        active: Option<String>,
        screenshot: Option<PathBuf>,
    },

    #[error(
        "No option for {query:?} after {attempts} attempt(s){}; list markup: {markup}",
        shot(screenshot)
    )]
    OptionNotFound {
        query: String,
        attempts: u32,
        screenshot: Option<PathBuf>,
        markup: String,
    },

    #[error("Page check failed: {what} at {url}{}", shot(screenshot))]
    PageNotReady {
        what: String,
        url: String,
        screenshot: Option<PathBuf>,
    },

    #[error("API login failed with status {status}: {body}")]
    ApiLogin { status: u16, body: String },

    #[error("Backend health check failed after {0} attempts")]
    HealthCheck(usize),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    /// A flow's success signal never showed up after a submit
    #[error("Timeout waiting for: {what} at {url}{}", shot(screenshot))]
    StepTimedOut {
        what: String,
        url: String,
        screenshot: Option<PathBuf>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether this is a bounded wait running out
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            E2eError::Timeout(_) | E2eError::StepTimedOut { .. } | E2eError::LoginTimedOut { .. }
        )
    }

    /// Screenshot captured for this failure, if any
    pub fn screenshot(&self) -> Option<&PathBuf> {
        match self {
            E2eError::OptionNotFound { screenshot, .. }
            | E2eError::PageNotReady { screenshot, .. }
            | E2eError::StepTimedOut { screenshot, .. }
            | E2eError::CredentialRejected { screenshot, .. }
            | E2eError::LoginTimedOut { screenshot, .. }
            | E2eError::TenantSwitchFailed { screenshot, .. } => screenshot.as_ref(),
            _ => None,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

fn shot(screenshot: &Option<PathBuf>) -> String {
    screenshot
        .as_ref()
        .map(|p| format!(" (screenshot: {})", p.display()))
        .unwrap_or_default()
}
