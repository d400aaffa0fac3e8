//! Declarative YAML scenarios composed from the flow procedures

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::flows::PurchaseConfirmation;

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Tenant to run in, overriding `TEST_TENANT_ID`
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// How purchases in this scenario confirm success
    #[serde(default)]
    pub purchase_confirmation: Option<PurchaseConfirmation>,

    /// Steps to execute in order
    pub steps: Vec<ScenarioStep>,
}

/// A single step in a scenario.
///
/// Names created by earlier steps flow into later ones: `create_purchase`
/// defaults to the last supplier created, `register_sale` to the last SKU
/// purchased.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Log in with the configured credentials and tenant
    Login,

    /// Submit bad credentials and expect the login error
    LoginExpectError { username: String, password: String },

    /// Create a supplier named `<prefix> <epochms>`
    CreateSupplier {
        #[serde(default = "default_supplier_prefix")]
        prefix: String,
    },

    /// Create a customer named `<prefix> <epochms>`
    CreateCustomer {
        #[serde(default = "default_customer_prefix")]
        prefix: String,
    },

    CreatePurchase {
        #[serde(default)]
        supplier: Option<String>,
    },

    EnsureShiftOpen,

    RegisterSale {
        #[serde(default)]
        sku: Option<String>,
    },

    /// Fail if the page is on the login path
    AssertNotLogin,
}

fn default_supplier_prefix() -> String {
    "E2E Supplier".to_string()
}

fn default_customer_prefix() -> String {
    "E2E Customer".to_string()
}

impl ScenarioStep {
    pub fn action(&self) -> &'static str {
        match self {
            ScenarioStep::Login => "login",
            ScenarioStep::LoginExpectError { .. } => "login_expect_error",
            ScenarioStep::CreateSupplier { .. } => "create_supplier",
            ScenarioStep::CreateCustomer { .. } => "create_customer",
            ScenarioStep::CreatePurchase { .. } => "create_purchase",
            ScenarioStep::EnsureShiftOpen => "ensure_shift_open",
            ScenarioStep::RegisterSale { .. } => "register_sale",
            ScenarioStep::AssertNotLogin => "assert_not_login",
        }
    }

    fn is_login(&self) -> bool {
        matches!(
            self,
            ScenarioStep::Login | ScenarioStep::LoginExpectError { .. }
        )
    }
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, ordered by file name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Every scenario starts from a login
    fn validate(&self) -> E2eResult<()> {
        match self.steps.first() {
            None => Err(E2eError::ScenarioParse(format!(
                "scenario {} has no steps",
                self.name
            ))),
            Some(step) if !step.is_login() => Err(E2eError::ScenarioParse(format!(
                "scenario {} must start with login, not {}",
                self.name,
                step.action()
            ))),
            Some(_) => Ok(()),
        }
    }
}
