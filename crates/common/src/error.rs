//! Error types for harness configuration

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the configuration Error
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing required environment variables for API tests: {}", keys.join(", "))]
    MissingEnv { keys: Vec<String> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Keys reported by a `MissingEnv` error, empty for every other variant
    pub fn missing_keys(&self) -> &[String] {
        match self {
            Error::MissingEnv { keys } => keys,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_names_every_key() {
        let err = Error::MissingEnv {
            keys: vec!["API_URL".to_string(), "TEST_PASSWORD".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required environment variables for API tests: API_URL, TEST_PASSWORD"
        );
        assert_eq!(err.missing_keys().len(), 2);
    }
}
