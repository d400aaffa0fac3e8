//! Scenario runner: health preflight, one browser for the suite, one fresh
//! browser context per scenario

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pos_e2e_common::Settings;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::artifacts::Artifacts;
use crate::error::{E2eError, E2eResult};
use crate::flows::{unique_name, FlowConfig, Flows};
use crate::health;
use crate::page::Page;
use crate::playwright::{PlaywrightBridge, PlaywrightConfig};
use crate::scenario::{Scenario, ScenarioStep};
use crate::translations::Translations;

/// Result of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub action: String,
    pub success: bool,
    pub duration_ms: u64,

    /// Value the step produced, such as a created name or SKU
    #[serde(default)]
    pub output: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    pub screenshot: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub flows: FlowConfig,
    pub scenarios_dir: PathBuf,
    pub output_dir: PathBuf,

    /// Where failure screenshots go
    pub artifacts_dir: PathBuf,

    /// Check backend health before launching the browser
    pub health_check: bool,
    pub health_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            flows: FlowConfig::default(),
            scenarios_dir: PathBuf::from("scenarios"),
            output_dir: PathBuf::from("test-results"),
            artifacts_dir: PathBuf::from("."),
            health_check: true,
            health_timeout: Duration::from_secs(60),
        }
    }
}

/// Values earlier steps hand to later ones
#[derive(Debug, Default)]
struct ScenarioState {
    supplier: Option<String>,
    sku: Option<String>,
}

/// Main E2E scenario runner
pub struct TestRunner {
    config: RunnerConfig,
    settings: Settings,
    translations: Translations,
    artifacts: Artifacts,
    bridge: Option<Arc<PlaywrightBridge>>,
}

impl TestRunner {
    /// Create a runner. Loads translation overrides named by the settings.
    pub fn new(settings: Settings, mut config: RunnerConfig) -> E2eResult<Self> {
        let translations = Translations::load(settings.translations_file.as_deref())?;
        config.playwright.base_url = settings.base_url.clone();
        let artifacts = Artifacts::new(&config.artifacts_dir);

        Ok(Self {
            config,
            settings,
            translations,
            artifacts,
            bridge: None,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Launch the browser, after the health preflight if enabled
    pub async fn start_browser(&mut self) -> E2eResult<Arc<PlaywrightBridge>> {
        if let Some(bridge) = &self.bridge {
            return Ok(Arc::clone(bridge));
        }

        if self.config.health_check {
            health::wait_for_backend(&self.settings.api_url, self.config.health_timeout).await?;
        }

        let bridge = PlaywrightBridge::launch(self.config.playwright.clone()).await?;
        self.bridge = Some(Arc::clone(&bridge));
        Ok(bridge)
    }

    /// Close the browser
    pub async fn shutdown(&mut self) -> E2eResult<()> {
        if let Some(bridge) = self.bridge.take() {
            bridge.shutdown().await?;
        }
        Ok(())
    }

    /// Run all scenarios in the scenarios directory
    pub async fn run_all(&mut self) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        self.run_scenarios(&scenarios).await
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        let filtered: Vec<Scenario> = Scenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_scenarios(&filtered).await
    }

    /// Run a specific scenario by name
    pub async fn run_named(&mut self, name: &str) -> E2eResult<ScenarioResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        let scenario = scenarios
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioParse(format!("Scenario not found: {}", name)))?;

        self.run_scenario(&scenario).await
    }

    /// Run a list of scenarios, one after another
    pub async fn run_scenarios(&mut self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        if scenarios.is_empty() {
            warn!("No scenarios selected");
        } else {
            self.start_browser().await?;
        }

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = match self.run_scenario(scenario).await {
                Ok(result) => result,
                Err(e) => ScenarioResult {
                    name: scenario.name.clone(),
                    success: false,
                    duration_ms: 0,
                    steps: vec![],
                    error: Some(e.to_string()),
                    screenshot: None,
                },
            };

            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(SuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            skipped: 0,
            duration_ms,
            results,
        })
    }

    /// Run one scenario in a fresh browser context
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> E2eResult<ScenarioResult> {
        let bridge = self.start_browser().await?;
        let page = bridge.new_page().await?;

        let result = self.execute_scenario(&page, scenario).await;

        if let Err(e) = page.close().await {
            warn!("Closing page for {} failed: {}", scenario.name, e);
        }
        Ok(result)
    }

    /// Execute `scenario` against an already open page. Stops at the first
    /// failing step.
    pub async fn execute_scenario<P: Page + ?Sized>(
        &self,
        page: &P,
        scenario: &Scenario,
    ) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let mut settings = self.settings.clone();
        if let Some(tenant_id) = &scenario.tenant_id {
            settings.tenant_id = Some(tenant_id.clone());
        }
        let mut flow_config = self.config.flows.clone();
        if let Some(confirmation) = scenario.purchase_confirmation {
            flow_config.purchase_confirmation = confirmation;
        }

        let flows = Flows::new(
            page,
            &settings,
            &self.translations,
            &flow_config,
            &self.artifacts,
        );

        let mut state = ScenarioState::default();
        let mut steps = Vec::new();
        let mut failure: Option<E2eError> = None;

        for step in &scenario.steps {
            let step_start = Instant::now();
            let outcome = execute_step(&flows, step, &mut state).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(output) => steps.push(StepResult {
                    action: step.action().to_string(),
                    success: true,
                    duration_ms,
                    output,
                    error: None,
                }),
                Err(e) => {
                    steps.push(StepResult {
                        action: step.action().to_string(),
                        success: false,
                        duration_ms,
                        output: None,
                        error: Some(e.to_string()),
                    });
                    failure = Some(e);
                    break;
                }
            }
        }

        let (error, screenshot) = match failure {
            None => (None, None),
            Some(e) => {
                let screenshot = match e.screenshot() {
                    Some(path) => Some(path.clone()),
                    None => self.artifacts.capture(page, &scenario.name).await,
                };
                (Some(e.to_string()), screenshot)
            }
        };

        ScenarioResult {
            name: scenario.name.clone(),
            success: error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error,
            screenshot: screenshot.map(|p| p.to_string_lossy().to_string()),
        }
    }

    /// Write suite results to `<output_dir>/e2e-results.json`
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("e2e-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

async fn execute_step<P: Page + ?Sized>(
    flows: &Flows<'_, P>,
    step: &ScenarioStep,
    state: &mut ScenarioState,
) -> E2eResult<Option<String>> {
    let missing = |what: &str| E2eError::StepFailed {
        step: step.action().to_string(),
        reason: format!("no {} given and none created earlier in the scenario", what),
    };

    match step {
        ScenarioStep::Login => {
            flows.login_or_fail().await?;
            Ok(None)
        }
        ScenarioStep::LoginExpectError { username, password } => {
            let message = flows.login_expect_error(username, password).await?;
            Ok(Some(message))
        }
        ScenarioStep::CreateSupplier { prefix } => {
            let name = unique_name(prefix);
            flows.create_supplier(&name).await?;
            state.supplier = Some(name.clone());
            Ok(Some(name))
        }
        ScenarioStep::CreateCustomer { prefix } => {
            let name = unique_name(prefix);
            flows.create_customer(&name).await?;
            Ok(Some(name))
        }
        ScenarioStep::CreatePurchase { supplier } => {
            let supplier = supplier
                .clone()
                .or_else(|| state.supplier.clone())
                .ok_or_else(|| missing("supplier"))?;
            let sku = flows.create_purchase(&supplier).await?;
            state.sku = Some(sku.clone());
            Ok(Some(sku))
        }
        ScenarioStep::EnsureShiftOpen => {
            let opened = flows.ensure_shift_open().await?;
            Ok(Some(if opened { "opened" } else { "already open" }.to_string()))
        }
        ScenarioStep::RegisterSale { sku } => {
            let sku = sku
                .clone()
                .or_else(|| state.sku.clone())
                .ok_or_else(|| missing("sku"))?;
            flows.register_sale(&sku).await?;
            Ok(None)
        }
        ScenarioStep::AssertNotLogin => {
            flows.assert_not_login().await?;
            Ok(None)
        }
    }
}
