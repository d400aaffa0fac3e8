//! Schemas for state the web client persists in local storage.
//!
//! Both stores are written by the application, not by us, so parsing is
//! lenient: a missing, malformed or mistyped field degrades to its empty
//! value instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Local storage key of the UI preferences store
pub const UI_STORAGE_KEY: &str = "pos_ui_storage";

/// Local storage key of the application store
pub const APP_STORAGE_KEY: &str = "pos_app_storage";

/// `{ state: { language }, version }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPreferences {
    #[serde(default)]
    pub state: UiPreferencesState,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPreferencesState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl UiPreferences {
    /// Fresh store pinned to `language`
    pub fn with_language(language: &str) -> Self {
        Self {
            state: UiPreferencesState {
                language: Some(language.to_string()),
            },
            version: 0,
        }
    }

    /// Parse the raw stored value. Anything unreadable yields the default.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.and_then(|r| serde_json::from_str::<Value>(r).ok()) else {
            return Self::default();
        };

        Self {
            state: UiPreferencesState {
                language: value
                    .pointer("/state/language")
                    .and_then(Value::as_str)
                    .map(String::from),
            },
            version: value
                .get("version")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0),
        }
    }
}

/// Tenant assignment as seen by the client.
///
/// Derived from `{ state: { activeTenantId, tenants: [{ id }] } }`. Always
/// recomputed from storage, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TenantSnapshot {
    pub active_tenant_id: Option<String>,
    pub tenant_ids: Vec<String>,
}

impl TenantSnapshot {
    /// Parse the raw application store value
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.and_then(|r| serde_json::from_str::<Value>(r).ok()) else {
            return Self::default();
        };

        let active_tenant_id = value.pointer("/state/activeTenantId").and_then(id_string);

        let tenant_ids = value
            .pointer("/state/tenants")
            .and_then(Value::as_array)
            .map(|tenants| {
                tenants
                    .iter()
                    .filter_map(|tenant| tenant.get("id").and_then(id_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            active_tenant_id,
            tenant_ids,
        }
    }

    /// Whether `tenant_id` is assigned to the user
    pub fn contains(&self, tenant_id: &str) -> bool {
        self.tenant_ids.iter().any(|id| id == tenant_id)
    }

    /// Whether `tenant_id` is the active tenant
    pub fn is_active(&self, tenant_id: &str) -> bool {
        self.active_tenant_id.as_deref() == Some(tenant_id)
    }
}

// Ids are strings in current builds; older builds stored numbers.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
