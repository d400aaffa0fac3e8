//! API authentication for tests that bypass the browser.
//!
//! The backend answers a login with HTTP-only session cookies, so an
//! `ApiContext` is a cookie-keeping client: every request after the login is
//! authenticated.

use std::time::Duration;

use pos_e2e_common::settings::{API_URL, TEST_PASSWORD, TEST_USERNAME};
use pos_e2e_common::EnvSnapshot;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::health::HealthStatus;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const PLATFORM_USERS_PATH: &str = "/api/platform/users";
pub const HEALTH_PATH: &str = "/actuator/health";
pub const SYSTEM_VERSION_PATH: &str = "/api/system/version";

/// Variables API tests refuse to default
pub const REQUIRED_KEYS: [&str; 3] = [API_URL, TEST_USERNAME, TEST_PASSWORD];

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Entry of `GET /api/platform/users`
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformUser {
    pub username: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Body of `GET /api/system/version`
#[derive(Debug, Clone, Deserialize)]
pub struct SystemVersion {
    pub version: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

pub struct ApiAuth;

impl ApiAuth {
    /// Log in with `TEST_USERNAME`/`TEST_PASSWORD` against `API_URL`.
    ///
    /// All three must be set explicitly; UI defaults do not apply. Every
    /// missing key is named in the error.
    pub async fn login_as_admin(env: &EnvSnapshot) -> E2eResult<ApiContext> {
        env.require(&REQUIRED_KEYS)?;

        let base_url = env.get(API_URL).unwrap_or_default();
        let username = env.get(TEST_USERNAME).unwrap_or_default();
        let password = env.get(TEST_PASSWORD).unwrap_or_default();

        let mut context = ApiContext::new(base_url)?;
        context.login(username, password).await?;
        Ok(context)
    }
}

/// HTTP client bound to the API base URL, keeping session cookies
pub struct ApiContext {
    client: reqwest::Client,
    base_url: String,
    session: Option<Value>,
}

impl ApiContext {
    /// Unauthenticated context
    pub fn new(base_url: &str) -> E2eResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Login response body, once logged in
    pub fn session(&self) -> Option<&Value> {
        self.session.as_ref()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /api/auth/login`. The session cookies land in this context.
    pub async fn login(&mut self, username: &str, password: &str) -> E2eResult<()> {
        let resp = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(E2eError::ApiLogin {
                status: status.as_u16(),
                body,
            });
        }

        let session = serde_json::from_str(&body).unwrap_or(Value::String(body));
        info!("API login as {} succeeded", username);
        debug!("Login response: {}", session);
        self.session = Some(session);
        Ok(())
    }

    pub async fn get(&self, path: &str) -> E2eResult<reqwest::Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// Users visible to a global administrator
    pub async fn platform_users(&self) -> E2eResult<Vec<PlatformUser>> {
        let resp = self.get(PLATFORM_USERS_PATH).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(E2eError::AssertionFailed(format!(
                "GET {} returned {}: {}",
                PLATFORM_USERS_PATH, status, body
            )));
        }
        let users: Vec<PlatformUser> = resp.json().await?;
        info!("Platform users visible: {}", users.len());
        Ok(users)
    }

    pub async fn health(&self) -> E2eResult<HealthStatus> {
        Ok(self.get(HEALTH_PATH).await?.json().await?)
    }

    /// Backend build version; needs no session
    pub async fn version(&self) -> E2eResult<SystemVersion> {
        let resp = self.get(SYSTEM_VERSION_PATH).await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status != reqwest::StatusCode::OK {
            return Err(E2eError::AssertionFailed(format!(
                "GET {} returned {}: {}",
                SYSTEM_VERSION_PATH, status, body
            )));
        }
        let version: SystemVersion = serde_json::from_str(&body)?;
        debug!("Backend version {}", version.version);
        Ok(version)
    }
}
