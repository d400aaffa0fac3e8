use tracing::info;

use super::{epoch_millis, random_digits, Flows};
use crate::error::E2eResult;
use crate::locator::{Locator, TextMatch};
use crate::page::Page;

impl<'a, P: Page + ?Sized> Flows<'a, P> {
    /// Create a customer named `name`, then find it through the search box
    pub async fn create_customer(&self, name: &str) -> E2eResult<()> {
        let t = self.translations;
        let stamp = epoch_millis();

        self.open(
            "/customers",
            Locator::heading(t.text("customers.title")),
            "customers",
        )
        .await?;

        self.page
            .click(&Locator::button(t.text("customers.actions.new")))
            .await?;

        let fields = [
            ("customers.form.full_name", name.to_string()),
            ("customers.form.email", format!("customer.{}@e2e.test", stamp)),
            ("customers.form.phone", random_digits(8)),
            ("customers.form.street", "Calle E2E 123".to_string()),
            ("customers.form.city", "Managua".to_string()),
        ];
        for (key, value) in &fields {
            self.page.fill(&Locator::label(t.text(key)), value).await?;
        }

        self.page
            .click(&Locator::button(t.exact("customers.form.save")))
            .await?;
        self.expect_hidden(
            &Locator::heading(t.text("customers.form.title_new")),
            "customer-save",
        )
        .await?;

        let search = Locator::placeholder(t.text("pos.customer_search_placeholder"));
        self.expect_visible(&search, "customer-search").await?;
        self.page.fill(&search, name).await?;
        self.expect_visible(&Locator::text(TextMatch::text(name)).first(), "customer-search")
            .await?;

        info!("Customer {:?} created", name);
        Ok(())
    }
}
