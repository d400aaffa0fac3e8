//! Reusable multi-step UI procedures.
//!
//! Every procedure runs the same shape: navigate, wait for the application
//! root and the page heading, fill the form, submit, then wait for a terminal
//! signal that the operation succeeded. A procedure either completes or
//! fails; there is no partial success.

mod auth;
mod customer;
mod inventory;
mod sales;
mod shift;
mod supplier;

pub use inventory::PurchaseConfirmation;
pub use sales::product_query;

use std::time::Duration;

use pos_e2e_common::timeouts::{SHIFT_PROBE, UI_TIMEOUT};
use pos_e2e_common::Settings;
use rand::Rng;
use tracing::debug;

use crate::artifacts::Artifacts;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{Page, WaitState};
use crate::session::{with_locale, BootstrapConfig};
use crate::tenant::TenantConfig;
use crate::translations::Translations;
use crate::typeahead::{Typeahead, TypeaheadConfig};

/// Tunables for every flow procedure
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub ui_timeout: Duration,
    pub shift_probe: Duration,
    pub purchase_confirmation: PurchaseConfirmation,

    /// Typeahead queries tried in order when any SKU will do
    pub sku_queries: Vec<String>,

    pub invoice_ref: String,
    pub initial_cash: String,

    /// Text a native purchase dialog must contain
    pub dialog_success_text: String,

    pub bootstrap: BootstrapConfig,
    pub tenant: TenantConfig,
    pub typeahead: TypeaheadConfig,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            ui_timeout: UI_TIMEOUT,
            shift_probe: SHIFT_PROBE,
            purchase_confirmation: PurchaseConfirmation::default(),
            sku_queries: ["a", "e", "i", "o", "u", "1"]
                .iter()
                .map(|q| q.to_string())
                .collect(),
            invoice_ref: "REF-123".to_string(),
            initial_cash: "100".to_string(),
            dialog_success_text: "successfully".to_string(),
            bootstrap: BootstrapConfig::default(),
            tenant: TenantConfig::default(),
            typeahead: TypeaheadConfig::default(),
        }
    }
}

/// Flow procedures bound to one page
pub struct Flows<'a, P: Page + ?Sized> {
    page: &'a P,
    settings: &'a Settings,
    translations: &'a Translations,
    config: &'a FlowConfig,
    artifacts: &'a Artifacts,
}

impl<'a, P: Page + ?Sized> Flows<'a, P> {
    pub fn new(
        page: &'a P,
        settings: &'a Settings,
        translations: &'a Translations,
        config: &'a FlowConfig,
        artifacts: &'a Artifacts,
    ) -> Self {
        Self {
            page,
            settings,
            translations,
            config,
            artifacts,
        }
    }

    pub fn page(&self) -> &'a P {
        self.page
    }

    fn typeahead(&self) -> Typeahead<'a, P> {
        Typeahead::new(self.page, &self.config.typeahead, self.artifacts)
    }

    /// Navigate to `path` and wait until `heading` is shown.
    ///
    /// A missing heading is reported with a screenshot, the URL and the
    /// application root markup.
    async fn open(&self, path: &str, heading: Locator, context: &str) -> E2eResult<()> {
        debug!("Opening {}", path);
        self.page
            .goto(&with_locale(path, &self.config.bootstrap.locale))
            .await?;
        self.page
            .wait_for(
                &self.config.bootstrap.selectors.root_ready,
                WaitState::Attached,
                self.config.ui_timeout,
            )
            .await?;

        if let Err(e) = self
            .page
            .wait_for(&heading, WaitState::Visible, self.config.ui_timeout)
            .await
        {
            debug!("Heading wait failed: {}", e);
            let diagnostics = self.artifacts.diagnose(self.page, context).await;
            return Err(E2eError::PageNotReady {
                what: heading.describe(),
                url: diagnostics.url,
                screenshot: diagnostics.screenshot,
            });
        }
        Ok(())
    }

    async fn expect_visible(&self, locator: &Locator, context: &str) -> E2eResult<()> {
        self.expect(locator, WaitState::Visible, context).await
    }

    async fn expect_hidden(&self, locator: &Locator, context: &str) -> E2eResult<()> {
        self.expect(locator, WaitState::Hidden, context).await
    }

    async fn expect(&self, locator: &Locator, state: WaitState, context: &str) -> E2eResult<()> {
        match self.page.wait_for(locator, state, self.config.ui_timeout).await {
            Err(e) if e.is_timeout() => Err(self
                .timed_out(format!("{} to be {:?}", locator.describe(), state), context)
                .await),
            other => other,
        }
    }

    /// Timeout error carrying the URL and a screenshot taken right now
    async fn timed_out(&self, what: String, context: &str) -> E2eError {
        let diagnostics = self.artifacts.diagnose(self.page, context).await;
        E2eError::StepTimedOut {
            what,
            url: diagnostics.url,
            screenshot: diagnostics.screenshot,
        }
    }
}

/// `"<prefix> <epochms>"`, unique enough across runs against one database
pub fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, epoch_millis())
}

fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Random phone-like digit string
fn random_digits(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
