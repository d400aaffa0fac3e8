//! Shared wait bounds

use std::time::Duration;

/// Bound for primary waits: navigation, headings, terminal signals
pub const UI_TIMEOUT: Duration = Duration::from_secs(60);

/// Window for noticing the cold-start loader after login
pub const LOADER_PROBE: Duration = Duration::from_secs(2);

/// Window for the optional "open shift" control
pub const SHIFT_PROBE: Duration = Duration::from_secs(2);

/// Window for a typeahead option to show up for one SKU query
pub const OPTION_PROBE: Duration = Duration::from_secs(1);

/// Window for a tenant switch to land in client storage
pub const TENANT_SWITCH_PROBE: Duration = Duration::from_secs(5);

/// Interval between polls of page state
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
