use tracing::{debug, info};

use super::Flows;
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;
use crate::wait::probe_visible;

impl<'a, P: Page + ?Sized> Flows<'a, P> {
    /// Open a cash shift if none is open.
    ///
    /// Returns whether a shift was opened. An already open shift shows no
    /// open button, which is a no-op.
    pub async fn ensure_shift_open(&self) -> E2eResult<bool> {
        let t = self.translations;
        let open_button = t.or_literal("shifts.open_shift_button", "Open Shift");

        let trigger = Locator::button(open_button.clone()).first();
        if !probe_visible(self.page, &trigger, self.config.shift_probe).await {
            debug!("No open-shift button, shift already open");
            return Ok(false);
        }

        self.page.click(&trigger).await?;
        self.page
            .fill(
                &Locator::label(t.or_literal("shifts.initial_cash", "Initial Cash")),
                &self.config.initial_cash,
            )
            .await?;
        // The dialog's confirm button carries the same label as the trigger
        self.page.click(&Locator::button(open_button).last()).await?;

        info!("Shift opened with {}", self.config.initial_cash);
        Ok(true)
    }
}
