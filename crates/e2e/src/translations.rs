//! UI string lookup.
//!
//! Flows locate elements by their visible Spanish labels. The defaults are
//! embedded; a frontend `translation.json` given through `TRANSLATIONS_FILE`
//! is merged over them so label changes do not require a rebuild.

use std::path::Path;

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::TextMatch;

const EMBEDDED_ES: &str = include_str!("../resources/es.json");

static SPANISH: Lazy<Translations> = Lazy::new(|| match Translations::from_json(EMBEDDED_ES) {
    Ok(translations) => translations,
    Err(e) => {
        warn!("Embedded translations unreadable: {}", e);
        Translations {
            root: Value::Object(Default::default()),
        }
    }
});

/// Nested key → string table addressed with dotted keys
#[derive(Debug, Clone)]
pub struct Translations {
    root: Value,
}

impl Translations {
    /// Embedded Spanish defaults
    pub fn spanish() -> &'static Translations {
        &SPANISH
    }

    pub fn from_json(content: &str) -> E2eResult<Self> {
        let root: Value = serde_json::from_str(content)?;
        if !root.is_object() {
            return Err(E2eError::Config(pos_e2e_common::Error::InvalidConfig(
                "translation file must contain a JSON object".to_string(),
            )));
        }
        Ok(Self { root })
    }

    /// Embedded defaults, overridden by `path` when given
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let mut translations = Self::spanish().clone();
        if let Some(path) = path {
            let overrides = Self::from_json(&std::fs::read_to_string(path)?)?;
            merge(&mut translations.root, overrides.root);
            info!("Loaded translations from {}", path.display());
        }
        Ok(translations)
    }

    /// Look up `a.b.c`
    pub fn get(&self, key: &str) -> Option<&str> {
        key.split('.')
            .try_fold(&self.root, |node, part| node.get(part))
            .and_then(Value::as_str)
    }

    /// String for `key`, or the key itself when missing
    pub fn string(&self, key: &str) -> String {
        match self.get(key) {
            Some(value) => value.to_string(),
            None => {
                warn!("Missing translation for {}", key);
                key.to_string()
            }
        }
    }

    /// Substring match on the translated string
    pub fn text(&self, key: &str) -> TextMatch {
        TextMatch::text(self.string(key))
    }

    /// Whole-string match on the translated string
    pub fn exact(&self, key: &str) -> TextMatch {
        TextMatch::exactly(&self.string(key))
    }

    /// Match any of the translated strings for `keys`
    pub fn any(&self, keys: &[&str]) -> TextMatch {
        let strings: Vec<String> = keys.iter().map(|key| self.string(key)).collect();
        TextMatch::any_of(&strings)
    }

    /// Translated string or an untranslated fallback, for screens that are
    /// sometimes rendered before the locale switch lands
    pub fn or_literal(&self, key: &str, literal: &str) -> TextMatch {
        TextMatch::any_of(&[self.string(key), literal.to_string()])
    }
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
