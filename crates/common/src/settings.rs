//! Harness settings resolved from the layered environment

use std::fmt;
use std::path::PathBuf;

use crate::envfile::EnvSnapshot;
use crate::error::Result;

pub const BASE_URL: &str = "BASE_URL";
pub const API_URL: &str = "API_URL";
pub const TEST_USERNAME: &str = "TEST_USERNAME";
pub const TEST_PASSWORD: &str = "TEST_PASSWORD";
pub const TEST_TENANT_ID: &str = "TEST_TENANT_ID";
pub const TRANSLATIONS_FILE: &str = "TRANSLATIONS_FILE";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5173";
pub const DEFAULT_API_URL: &str = "http://localhost:8081";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";

/// Immutable settings for one harness process
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root URL of the web UI
    pub base_url: String,

    /// Root URL of the REST API
    pub api_url: String,

    pub username: String,
    pub password: String,

    /// Tenant the run must execute in. `None` for single-tenant runs.
    pub tenant_id: Option<String>,

    /// Frontend translation file overriding the embedded labels
    pub translations_file: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from the process environment and the env files.
    ///
    /// Missing values fall back to defaults, so this only fails when an env
    /// file exists but cannot be read.
    pub fn load() -> Result<Self> {
        Ok(Self::from_env(&EnvSnapshot::load()?))
    }

    /// Resolve settings from an existing snapshot
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let or_default = |key: &str, default: &str| {
            env.get(key).unwrap_or(default).to_string()
        };

        Self {
            base_url: or_default(BASE_URL, DEFAULT_BASE_URL),
            api_url: or_default(API_URL, DEFAULT_API_URL),
            username: or_default(TEST_USERNAME, DEFAULT_USERNAME),
            password: or_default(TEST_PASSWORD, DEFAULT_PASSWORD),
            tenant_id: env
                .get(TEST_TENANT_ID)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from),
            translations_file: env.get(TRANSLATIONS_FILE).map(PathBuf::from),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env(&EnvSnapshot::default())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("translations_file", &self.translations_file)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(items: &[(&str, &str)]) -> EnvSnapshot {
        EnvSnapshot::from_layers(
            items.iter().map(|(k, v)| (k.to_string(), v.to_string())),
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let settings = Settings::from_env(&snapshot(&[]));
        assert_eq!(settings.base_url, "http://localhost:5173");
        assert_eq!(settings.api_url, "http://localhost:8081");
        assert_eq!(settings.username, "admin");
        assert_eq!(settings.password, "admin");
        assert_eq!(settings.tenant_id, None);
        assert_eq!(settings.translations_file, None);
    }

    #[test]
    fn test_blank_tenant_is_none_not_empty() {
        let settings = Settings::from_env(&snapshot(&[(TEST_TENANT_ID, "   ")]));
        assert_eq!(settings.tenant_id, None);

        let settings = Settings::from_env(&snapshot(&[(TEST_TENANT_ID, " tenant-7 ")]));
        assert_eq!(settings.tenant_id.as_deref(), Some("tenant-7"));
    }

    #[test]
    fn test_explicit_values_win() {
        let settings = Settings::from_env(&snapshot(&[
            (BASE_URL, "http://ui.test"),
            (API_URL, "http://api.test"),
            (TEST_USERNAME, "cashier"),
            (TEST_PASSWORD, "pw"),
        ]));
        assert_eq!(settings.base_url, "http://ui.test");
        assert_eq!(settings.api_url, "http://api.test");
        assert_eq!(settings.username, "cashier");
        assert_eq!(settings.password, "pw");
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = Settings::from_env(&snapshot(&[(TEST_PASSWORD, "hunter2")]));
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_is_idempotent() {
        let first = Settings::load().unwrap();
        let second = Settings::load().unwrap();
        assert_eq!(first, second);
    }
}
