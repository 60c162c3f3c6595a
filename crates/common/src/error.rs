//! Error types for the shared harness library

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Rendered UI content disagrees with what the backend reported
    #[error("Mismatch in {region}: {detail}")]
    Mismatch { region: String, detail: String },
}

impl Error {
    pub fn mismatch(region: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Mismatch {
            region: region.into(),
            detail: detail.into(),
        }
    }
}
