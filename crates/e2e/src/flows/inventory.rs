use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Flows;
use crate::error::{E2eError, E2eResult};
use crate::locator::{Locator, TextMatch};
use crate::page::{Page, WaitState};
use crate::wait::first_some;

/// How a submitted purchase reports success.
///
/// Older builds show a native `alert()`, newer ones an in-page modal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseConfirmation {
    Dialog,
    Modal,
    /// Whichever shows up first
    #[default]
    Either,
}

impl FromStr for PurchaseConfirmation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dialog" => Ok(PurchaseConfirmation::Dialog),
            "modal" => Ok(PurchaseConfirmation::Modal),
            "either" => Ok(PurchaseConfirmation::Either),
            other => Err(format!("unknown purchase confirmation: {}", other)),
        }
    }
}

enum Confirmed {
    Dialog(String),
    Modal,
}

impl<'a, P: Page + ?Sized> Flows<'a, P> {
    /// Register a purchase from `supplier` for whichever SKU the catalogue
    /// offers first. Returns the chosen SKU option text.
    pub async fn create_purchase(&self, supplier: &str) -> E2eResult<String> {
        let t = self.translations;

        let title = t
            .string("inventory.purchase_receipt.title")
            .replace(" (AIO)", "");
        self.open(
            "/inventory/purchases/new",
            Locator::heading(TextMatch::text(title)),
            "purchases",
        )
        .await?;

        let typeahead = self.typeahead();
        typeahead
            .select(
                &Locator::placeholder(t.text("inventory.purchase_history.supplier")),
                supplier,
            )
            .await?;

        let queries: Vec<&str> = self.config.sku_queries.iter().map(String::as_str).collect();
        let sku = typeahead
            .select_any(
                &Locator::placeholder(t.text("inventory.search_placeholder")),
                &queries,
            )
            .await?;

        let fields = [
            ("inventory.purchase_receipt.quantity", "1"),
            ("inventory.purchase_receipt.unit_cost", "10"),
            ("inventory.purchase_receipt.invoice_ref", self.config.invoice_ref.as_str()),
        ];
        for (key, value) in fields {
            self.page.fill(&Locator::label(t.text(key)), value).await?;
        }

        self.page
            .click(&Locator::button(t.text("inventory.purchase_receipt.add_line")))
            .await?;
        self.expect_visible(&Locator::css("table").first(), "purchase-line")
            .await?;

        self.confirm_purchase(&Locator::button(t.text("inventory.purchase_receipt.save")))
            .await?;

        info!("Purchase from {:?} registered ({})", supplier, sku);
        Ok(sku)
    }

    async fn confirm_purchase(&self, submit: &Locator) -> E2eResult<()> {
        let timeout = self.config.ui_timeout;
        let page = self.page;
        let modal = Locator::text(self.translations.text("inventory.purchase_receipt.success")).first();

        let confirmed = match self.config.purchase_confirmation {
            PurchaseConfirmation::Dialog => page
                .click_expecting_dialog(submit, timeout)
                .await?
                .map(Confirmed::Dialog),
            PurchaseConfirmation::Modal => {
                page.click(submit).await?;
                page.wait_for(&modal, WaitState::Visible, timeout)
                    .await
                    .ok()
                    .map(|_| Confirmed::Modal)
            }
            PurchaseConfirmation::Either => {
                let dialog = async {
                    match page.click_expecting_dialog(submit, timeout).await {
                        Ok(Some(message)) => Some(Ok(Confirmed::Dialog(message))),
                        Ok(None) => None,
                        Err(e) => Some(Err(e)),
                    }
                };
                let in_page = async {
                    page.wait_for(&modal, WaitState::Visible, timeout)
                        .await
                        .ok()
                        .map(|_| Ok(Confirmed::Modal))
                };
                first_some(dialog, in_page, timeout).await.transpose()?
            }
        };

        match confirmed {
            Some(Confirmed::Dialog(message)) => {
                debug!("Purchase dialog: {}", message);
                if message.contains(&self.config.dialog_success_text) {
                    Ok(())
                } else {
                    Err(E2eError::AssertionFailed(format!(
                        "purchase dialog did not report success: {:?}",
                        message
                    )))
                }
            }
            Some(Confirmed::Modal) => Ok(()),
            None => Err(self
                .timed_out(
                    format!("purchase confirmation ({:?})", self.config.purchase_confirmation),
                    "purchase-confirmation",
                )
                .await),
        }
    }
}
