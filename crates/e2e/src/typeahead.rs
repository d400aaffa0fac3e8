//! Typeahead (incremental search) option selection

use std::time::Duration;

use pos_e2e_common::timeouts::OPTION_PROBE;
use tracing::{debug, info};

use crate::artifacts::Artifacts;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{Page, WaitState};
use crate::wait::{first_some, probe_visible};

#[derive(Debug, Clone)]
pub struct TypeaheadConfig {
    /// First selectable option
    pub option: Locator,

    /// Marker rendered when the search has no results
    pub empty_marker: Locator,

    /// Option list container, dumped on failure
    pub list: Locator,

    pub attempts: u32,
    pub key_delay: Duration,
    pub retry_pause: Duration,

    /// How long one attempt waits for options or the empty marker
    pub attempt_timeout: Duration,

    /// Visibility probe per query in `select_any`
    pub option_probe: Duration,
}

impl Default for TypeaheadConfig {
    fn default() -> Self {
        Self {
            option: Locator::css(".typeahead__list .typeahead__item:not(.typeahead__item--empty)")
                .first(),
            empty_marker: Locator::css(".typeahead__item--empty").first(),
            list: Locator::css(".typeahead__list").first(),
            attempts: 3,
            key_delay: Duration::from_millis(50),
            retry_pause: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10),
            option_probe: OPTION_PROBE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListState {
    Populated,
    Empty,
    Unresolved,
}

pub struct Typeahead<'a, P: Page + ?Sized> {
    page: &'a P,
    config: &'a TypeaheadConfig,
    artifacts: &'a Artifacts,
}

impl<'a, P: Page + ?Sized> Typeahead<'a, P> {
    pub fn new(page: &'a P, config: &'a TypeaheadConfig, artifacts: &'a Artifacts) -> Self {
        Self {
            page,
            config,
            artifacts,
        }
    }

    /// Type `query` into `input` and pick the first option.
    ///
    /// Returns the option's text. Search results may arrive after typing
    /// ends, so an empty list is retried up to `attempts` times.
    pub async fn select(&self, input: &Locator, query: &str) -> E2eResult<String> {
        let attempts = self.config.attempts.max(1);

        for attempt in 1..=attempts {
            // Focus first: some inputs load their data on focus
            self.page.focus(input).await?;
            self.page.fill(input, "").await?;
            self.page
                .type_text(input, query, self.config.key_delay)
                .await?;

            match self.await_options().await {
                ListState::Populated => return self.pick().await,
                state => debug!(
                    "Typeahead {} for {:?}: {:?} (attempt {}/{})",
                    input, query, state, attempt, attempts
                ),
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.retry_pause).await;
            }
        }

        Err(self.not_found(query, attempts).await)
    }

    /// Try each query in turn and pick the first option any of them yields
    pub async fn select_any(&self, input: &Locator, queries: &[&str]) -> E2eResult<String> {
        for query in queries {
            self.page.fill(input, query).await?;
            if probe_visible(self.page, &self.config.option, self.config.option_probe).await {
                return self.pick().await;
            }
            debug!("No option for {:?}", query);
        }

        Err(self.not_found(&queries.join(", "), queries.len() as u32).await)
    }

    async fn await_options(&self) -> ListState {
        let page = self.page;
        let timeout = self.config.attempt_timeout;

        let populated = async {
            page.wait_for(&self.config.option, WaitState::Visible, timeout)
                .await
                .ok()
                .map(|_| ListState::Populated)
        };
        let empty = async {
            page.wait_for(&self.config.empty_marker, WaitState::Visible, timeout)
                .await
                .ok()
                .map(|_| ListState::Empty)
        };

        first_some(populated, empty, timeout)
            .await
            .unwrap_or(ListState::Unresolved)
    }

    async fn pick(&self) -> E2eResult<String> {
        let text = self
            .page
            .text_content(&self.config.option)
            .await?
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        self.page.click(&self.config.option).await?;
        info!("Selected option {:?}", text);
        Ok(text)
    }

    async fn not_found(&self, query: &str, attempts: u32) -> E2eError {
        let screenshot = self.artifacts.capture(self.page, "typeahead").await;
        let markup = self
            .page
            .inner_html(&self.config.list)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "<no option list rendered>".to_string());

        E2eError::OptionNotFound {
            query: query.to_string(),
            attempts,
            screenshot,
            markup,
        }
    }
}
