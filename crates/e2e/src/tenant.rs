//! Tenant resolution for multi-tenant test users.
//!
//! The application store is the source of truth: it is re-read after every
//! change instead of trusting what the UI appears to show.

use std::time::Duration;

use pos_e2e_common::client_state::APP_STORAGE_KEY;
use pos_e2e_common::timeouts::TENANT_SWITCH_PROBE;
use pos_e2e_common::TenantSnapshot;
use tracing::{debug, info, warn};

use crate::artifacts::Artifacts;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;
use crate::wait::poll_until;

#[derive(Debug, Clone)]
pub struct TenantConfig {
    /// `<select>` switching the active tenant
    pub selector: Locator,

    /// How long the store gets to reflect a switch
    pub confirm_window: Duration,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            selector: Locator::css("[data-testid=\"tenant-selector\"]"),
            confirm_window: TENANT_SWITCH_PROBE,
        }
    }
}

pub struct TenantResolver<'a, P: Page + ?Sized> {
    page: &'a P,
    config: &'a TenantConfig,
    artifacts: &'a Artifacts,
}

impl<'a, P: Page + ?Sized> TenantResolver<'a, P> {
    pub fn new(page: &'a P, config: &'a TenantConfig, artifacts: &'a Artifacts) -> Self {
        Self {
            page,
            config,
            artifacts,
        }
    }

    /// Current tenant assignment from the application store
    pub async fn read_snapshot(&self) -> E2eResult<TenantSnapshot> {
        let raw = self.page.local_storage_item(APP_STORAGE_KEY).await?;
        Ok(TenantSnapshot::parse(raw.as_deref()))
    }

    /// Make `requested` the active tenant. No-op for `None`.
    ///
    /// A tenant the user is not assigned to fails before anything on the page
    /// is touched.
    pub async fn ensure_tenant(&self, requested: Option<&str>) -> E2eResult<()> {
        let Some(requested) = requested.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(());
        };

        let snapshot = self.read_snapshot().await?;
        debug!("Tenant snapshot: {:?}", snapshot);

        if !snapshot.contains(requested) {
            return Err(E2eError::TenantNotAssigned {
                requested: requested.to_string(),
                available: snapshot.tenant_ids,
            });
        }

        if snapshot.is_active(requested) {
            debug!("Tenant {} already active", requested);
            return Ok(());
        }

        if self.page.is_visible(&self.config.selector).await.unwrap_or(false) {
            info!("Switching tenant to {}", requested);
            self.page
                .select_option(&self.config.selector, requested)
                .await?;
        } else {
            warn!(
                "Tenant selector {} not visible; waiting for tenant {} to become active",
                self.config.selector, requested
            );
        }

        let confirmed = poll_until(self.config.confirm_window, move || async move {
            let snapshot = self.read_snapshot().await?;
            Ok(snapshot.is_active(requested).then_some(()))
        })
        .await;

        match confirmed {
            Some(()) => {
                info!("Tenant {} active", requested);
                Ok(())
            }
            None => {
                let observed = self.read_snapshot().await.unwrap_or_default();
                let screenshot = self.artifacts.capture(self.page, "tenant-switch").await;
                Err(E2eError::TenantSwitchFailed {
                    requested: requested.to_string(),
                    active: observed.active_tenant_id,
                    screenshot,
                })
            }
        }
    }
}
