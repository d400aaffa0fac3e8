use tracing::info;

use super::{epoch_millis, random_digits, Flows};
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;

impl<'a, P: Page + ?Sized> Flows<'a, P> {
    /// Create a supplier named `name` through the suppliers page
    pub async fn create_supplier(&self, name: &str) -> E2eResult<()> {
        let t = self.translations;
        let stamp = epoch_millis();

        self.open(
            "/suppliers",
            Locator::heading(t.text("suppliers.title")),
            "suppliers",
        )
        .await?;

        self.page
            .click(&Locator::button(t.text("suppliers.form.title_new")))
            .await?;

        let fields = [
            ("suppliers.form.name", name.to_string()),
            ("suppliers.form.contact_name", format!("Contacto {}", stamp)),
            ("suppliers.form.email", format!("supplier.{}@e2e.test", stamp)),
            ("suppliers.form.phone", random_digits(8)),
            ("suppliers.form.address", "Direccion E2E".to_string()),
        ];
        for (key, value) in &fields {
            self.page.fill(&Locator::label(t.text(key)), value).await?;
        }

        self.page
            .click(&Locator::button(t.exact("suppliers.form.save")))
            .await?;

        // The form closes once the supplier is saved
        let form_title =
            Locator::heading(t.any(&["suppliers.form.title_new", "suppliers.form.title_edit"]));
        self.expect_hidden(&form_title, "supplier-save").await?;

        info!("Supplier {:?} created", name);
        Ok(())
    }
}
