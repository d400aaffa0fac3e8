use tracing::info;

use super::Flows;
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;

/// Search text for a SKU option label such as `"Café 250g Stock: 12"`
pub fn product_query(sku_text: &str) -> &str {
    sku_text.split("Stock:").next().unwrap_or(sku_text).trim()
}

impl<'a, P: Page + ?Sized> Flows<'a, P> {
    /// Sell one unit of the product behind `sku_text` and pay it in full
    pub async fn register_sale(&self, sku_text: &str) -> E2eResult<()> {
        let t = self.translations;

        self.open("/pos", Locator::heading(t.text("pos.title")), "pos")
            .await?;
        self.ensure_shift_open().await?;

        self.page
            .click(&Locator::button(t.or_literal("pos.search_product", "Search product")).first())
            .await?;
        self.page
            .fill(
                &Locator::placeholder(t.text("pos.product_search_placeholder")),
                product_query(sku_text),
            )
            .await?;

        let card = Locator::css(".product-search-modal [data-nav-item=\"true\"]").first();
        self.expect_visible(&card, "sale-product").await?;
        self.page.click(&card).await?;

        self.page
            .click(&Locator::button(t.or_literal("pos.confirm_sale", "Confirm Sale")).first())
            .await?;
        self.page
            .click(&Locator::button(t.or_literal("pos.pay_remaining", "Remaining")))
            .await?;
        self.page
            .click(&Locator::button(t.or_literal("pos.finalize_sale", "Finalize Sale")))
            .await?;

        self.expect_visible(
            &Locator::text(t.or_literal("pos.receipt_title", "Sale Receipt")).first(),
            "sale-receipt",
        )
        .await?;

        info!("Sale of {:?} completed", product_query(sku_text));
        Ok(())
    }
}
