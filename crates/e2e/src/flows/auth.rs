use tracing::info;

use super::Flows;
use crate::error::{E2eError, E2eResult};
use crate::page::Page;
use crate::session::{is_login_url, with_locale, SessionBootstrapper, SessionOutcome};
use crate::tenant::TenantResolver;

impl<'a, P: Page + ?Sized> Flows<'a, P> {
    /// Log in with the configured credentials and activate the configured
    /// tenant. Every UI scenario starts here.
    pub async fn login_or_fail(&self) -> E2eResult<()> {
        SessionBootstrapper::new(self.page, &self.config.bootstrap, self.artifacts)
            .login(self.settings)
            .await?;

        TenantResolver::new(self.page, &self.config.tenant, self.artifacts)
            .ensure_tenant(self.settings.tenant_id.as_deref())
            .await
    }

    /// Submit `username`/`password` and expect the login error banner.
    ///
    /// Returns the banner text. Navigating away counts as a failure.
    pub async fn login_expect_error(&self, username: &str, password: &str) -> E2eResult<String> {
        let session = SessionBootstrapper::new(self.page, &self.config.bootstrap, self.artifacts);
        session.seed_client_state(self.settings).await?;
        self.page
            .goto(&with_locale(
                &self.config.bootstrap.login_path,
                &self.config.bootstrap.locale,
            ))
            .await?;
        session.submit_credentials(username, password).await?;

        match session.await_outcome().await? {
            SessionOutcome::ErrorShown(message) => {
                self.assert_on_login().await?;
                info!("Login rejected as expected: {}", message);
                Ok(message)
            }
            SessionOutcome::Navigated => Err(E2eError::AssertionFailed(format!(
                "login as {} was accepted but should have been rejected",
                username
            ))),
            SessionOutcome::TimedOut => {
                Err(E2eError::Timeout("login error banner".to_string()))
            }
        }
    }

    /// Fail if the page is on the login path
    pub async fn assert_not_login(&self) -> E2eResult<()> {
        let url = self.page.url().await?;
        if is_login_url(&url) {
            return Err(E2eError::AssertionFailed(format!("on the login page: {}", url)));
        }
        Ok(())
    }

    async fn assert_on_login(&self) -> E2eResult<()> {
        let url = self.page.url().await?;
        if !is_login_url(&url) {
            return Err(E2eError::AssertionFailed(format!(
                "expected to stay on the login page, now at {}",
                url
            )));
        }
        Ok(())
    }
}
