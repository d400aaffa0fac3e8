//! POS E2E Common Library
//!
//! Settings, environment layering and client-state schemas shared by the
//! POS end-to-end harness.

pub mod client_state;
pub mod envfile;
pub mod error;
pub mod settings;
pub mod timeouts;

// Re-export commonly used types
pub use client_state::{TenantSnapshot, UiPreferences, APP_STORAGE_KEY, UI_STORAGE_KEY};
pub use envfile::{EnvLocations, EnvSnapshot, ValueSource};
pub use error::{Error, Result};
pub use settings::Settings;

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
