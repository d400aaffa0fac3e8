//! POS E2E Test Framework
//!
//! This crate drives the point-of-sale web application end to end:
//! - Controls Playwright through a long-lived Node bridge (JSON lines)
//! - Bootstraps an authenticated, tenant-scoped, Spanish-locale session
//! - Runs reusable business procedures (suppliers, customers, purchases, sales)
//! - Authenticates against the REST API for browserless checks
//! - Parses declarative YAML scenarios and writes JSON results
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  E2E Scenario Runner (Rust)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── health::wait_for_backend(api_url)                    │
//! │    ├── PlaywrightBridge::launch() -> new_page() per scenario│
//! │    └── execute_scenario(page, scenario) -> ScenarioResult   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Flows (over any `Page`)                                    │
//! │    ├── login_or_fail                                        │
//! │    │     ├── SessionBootstrapper  seed → submit → race      │
//! │    │     └── TenantResolver       snapshot → switch → check │
//! │    ├── create_supplier / create_customer                    │
//! │    ├── create_purchase ── Typeahead (select, select_any)    │
//! │    └── ensure_shift_open / register_sale                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ApiAuth::login_as_admin(env) -> ApiContext (cookies)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod artifacts;
pub mod error;
pub mod flows;
pub mod health;
pub mod locator;
pub mod page;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod tenant;
pub mod translations;
pub mod typeahead;
pub mod wait;

pub use api::{ApiAuth, ApiContext, SystemVersion};
pub use error::{E2eError, E2eResult};
pub use flows::{unique_name, FlowConfig, Flows, PurchaseConfirmation};
pub use locator::{Locator, TextMatch};
pub use page::{Cookie, Page, WaitState};
pub use runner::{RunnerConfig, TestRunner};
pub use scenario::{Scenario, ScenarioStep};
pub use session::{BootstrapConfig, SessionBootstrapper, SessionOutcome};
pub use tenant::{TenantConfig, TenantResolver};
pub use translations::Translations;
pub use typeahead::{Typeahead, TypeaheadConfig};
