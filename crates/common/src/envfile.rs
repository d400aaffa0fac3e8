//! Layered environment loading.
//!
//! Values are resolved from three layers, highest precedence first:
//!
//! 1. the process environment
//! 2. the local override file (`.env` in the working directory)
//! 3. the root file (`.env` at the workspace root)
//!
//! Both files are optional. Loading never mutates the process environment,
//! so a snapshot can be rebuilt any number of times with the same result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Process,
    LocalFile,
    RootFile,
}

/// Locations of the two optional env files
#[derive(Debug, Clone)]
pub struct EnvLocations {
    pub local: PathBuf,
    pub root: PathBuf,
}

impl EnvLocations {
    /// Local file in the working directory, root file at the workspace root
    pub fn discover() -> Result<Self> {
        let local = std::env::current_dir()?.join(".env");
        let root = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(".env");
        Ok(Self { local, root })
    }
}

/// An immutable view over the layered environment
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    values: HashMap<String, (String, ValueSource)>,
}

impl EnvSnapshot {
    /// Load the process environment over the default env file locations
    pub fn load() -> Result<Self> {
        Self::load_from(&EnvLocations::discover()?)
    }

    /// Load the process environment over explicit env file locations
    pub fn load_from(locations: &EnvLocations) -> Result<Self> {
        let local = read_optional(&locations.local)?;
        let root = read_optional(&locations.root)?;
        Ok(Self::from_layers(std::env::vars(), local, root))
    }

    /// Build a snapshot from already-read layers
    pub fn from_layers(
        process: impl IntoIterator<Item = (String, String)>,
        local: Vec<(String, String)>,
        root: Vec<(String, String)>,
    ) -> Self {
        let mut values = HashMap::new();
        for (key, value) in root {
            values.insert(key, (value, ValueSource::RootFile));
        }
        for (key, value) in local {
            values.insert(key, (value, ValueSource::LocalFile));
        }
        for (key, value) in process {
            values.insert(key, (value, ValueSource::Process));
        }
        Self { values }
    }

    /// Resolved value for `key`. Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|(value, _)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Layer that supplied `key`, if any
    pub fn source(&self, key: &str) -> Option<ValueSource> {
        self.get(key)?;
        self.values.get(key).map(|(_, source)| *source)
    }

    /// Fail with every absent key named, in the order given
    pub fn require(&self, keys: &[&str]) -> Result<()> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| self.get(key).is_none())
            .map(|key| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingEnv { keys: missing })
        }
    }
}

fn read_optional(path: &Path) -> Result<Vec<(String, String)>> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!("Loaded env file {}", path.display());
            Ok(parse_env_file(&content))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(Error::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse `.env` content into ordered key/value pairs.
///
/// Supports `#` comments, an optional `export ` prefix and single or double
/// quoted values. Malformed lines are skipped.
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            warn!("Skipping malformed env line {}: missing '='", index + 1);
            continue;
        };

        let key = key.trim();
        if !is_valid_key(key) {
            warn!("Skipping malformed env line {}: invalid key {:?}", index + 1, key);
            continue;
        }

        pairs.push((key.to_string(), parse_value(value.trim())));
    }

    pairs
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_value(value: &str) -> String {
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return inner.replace("\\n", "\n").replace("\\\"", "\"");
        }
        if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            return inner.to_string();
        }
    }

    // Unquoted values end at an inline comment
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_string(),
        None => value.to_string(),
    }
}
